// lib.rs - 暴露服务层给 CLI 使用

pub mod core;
pub mod data;
pub mod models;
pub mod services;
pub mod utils;

pub use models::*;
pub use services::baseline_store::BaselineStore;
pub use services::sysproxy::{
    ExternalProxyTool, ProxyError, ProxyMode, SysproxyCommand, SysproxyRunner,
    SystemProxyController,
};
pub use utils::config::{load_runtime_config, RuntimeConfig};

// 重新导出常用类型
pub use anyhow::{Context, Result};

pub use crate::core::{init_logger, update_log_level};
