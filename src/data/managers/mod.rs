//! 各格式的文件管理器

pub mod json;

pub use json::JsonManager;
