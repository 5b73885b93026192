pub mod baseline;
pub mod config;

pub use baseline::*;
pub use config::*;
