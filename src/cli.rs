//! 命令行参数定义

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use sysproxy_state::{LogLevel, ProxyMode};

/// sysproxy-state - 切换系统代理并恢复用户原有设置
#[derive(Parser, Debug)]
#[command(name = "sysproxy-state")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// sysproxy 辅助程序路径（默认 <state-dir>/sysproxy）
    #[arg(long, global = true, value_name = "PATH")]
    pub helper: Option<PathBuf>,

    /// 状态目录（基线文件、配置文件和日志所在目录）
    #[arg(long, global = true, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// sysproxy 调用超时秒数，0 表示不限制
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// 日志级别 (trace/debug/info/warn/error)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// 开启全局代理
    #[command(after_help = "EXAMPLES:
    sysproxy-state global 127.0.0.1:7890
")]
    Global {
        /// 代理服务器地址 host:port
        server: String,
    },

    /// 开启 PAC 自动代理
    Pac {
        /// PAC 脚本地址
        url: String,
    },

    /// 关闭代理，恢复原有设置
    Off,

    /// 丢弃已记录的设置并强制直连
    Reset,

    /// 输出已保存的基线
    Status,

    /// 查询当前系统代理设置（不写入基线）
    Query,
}

impl Commands {
    /// 切换类子命令对应的代理模式
    pub fn proxy_mode(&self) -> Option<ProxyMode> {
        match self {
            Commands::Global { server } => Some(ProxyMode::Global {
                server: server.clone(),
            }),
            Commands::Pac { url } => Some(ProxyMode::Pac { url: url.clone() }),
            Commands::Off => Some(ProxyMode::Off),
            Commands::Reset | Commands::Status | Commands::Query => None,
        }
    }
}
