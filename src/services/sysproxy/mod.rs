//! 系统代理管理
//!
//! - `command`: sysproxy 命令与参数
//! - `tool`: sysproxy 进程调用
//! - `parser`: 查询结果解析
//! - `bypass`: 绕过列表合并
//! - `controller`: 开启/关闭/重置状态机

pub mod bypass;
pub mod command;
pub mod controller;
pub mod error;
pub mod parser;
pub mod tool;

pub use command::SysproxyCommand;
pub use controller::{ProxyMode, SystemProxyController};
pub use error::ProxyError;
pub use parser::parse_query_output;
pub use tool::{ExternalProxyTool, RunOutput, SysproxyRunner};
