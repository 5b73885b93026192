//! sysproxy 命令定义
//!
//! | 命令 | 参数 |
//! |---|---|
//! | 查询 | `query` |
//! | 全局代理 | `global <server> <bypass>` |
//! | PAC | `pac <url>` |
//! | 恢复 | `set <flags> <server\|-> <bypass\|-> <pac\|->` |

use crate::models::ProxyBaseline;
use std::fmt;

/// 恢复命令中表示"无值"的占位符
pub const ABSENT_PLACEHOLDER: &str = "-";

/// 发送给 sysproxy 的一条命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SysproxyCommand {
    Query,
    Global { server: String, bypass_list: String },
    Pac { url: String },
    Set {
        flags: String,
        proxy_server: Option<String>,
        bypass_list: Option<String>,
        pac_url: Option<String>,
    },
}

impl SysproxyCommand {
    /// 由基线构造恢复命令
    pub fn restore(baseline: &ProxyBaseline) -> Self {
        SysproxyCommand::Set {
            flags: baseline.flags.clone(),
            proxy_server: baseline.proxy_server.clone(),
            bypass_list: baseline.bypass_list.clone(),
            pac_url: baseline.pac_url.clone(),
        }
    }

    /// 强制清空系统代理（`set 1 - - -`）
    pub fn direct() -> Self {
        SysproxyCommand::Set {
            flags: "1".to_string(),
            proxy_server: None,
            bypass_list: None,
            pac_url: None,
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self, SysproxyCommand::Query)
    }

    /// 命令名（日志用）
    pub fn name(&self) -> &'static str {
        match self {
            SysproxyCommand::Query => "query",
            SysproxyCommand::Global { .. } => "global",
            SysproxyCommand::Pac { .. } => "pac",
            SysproxyCommand::Set { .. } => "set",
        }
    }

    /// 传给进程的参数列表
    pub fn args(&self) -> Vec<String> {
        match self {
            SysproxyCommand::Query => vec!["query".to_string()],
            SysproxyCommand::Global {
                server,
                bypass_list,
            } => vec!["global".to_string(), server.clone(), bypass_list.clone()],
            SysproxyCommand::Pac { url } => vec!["pac".to_string(), url.clone()],
            SysproxyCommand::Set {
                flags,
                proxy_server,
                bypass_list,
                pac_url,
            } => vec![
                "set".to_string(),
                flags.clone(),
                or_placeholder(proxy_server),
                or_placeholder(bypass_list),
                or_placeholder(pac_url),
            ],
        }
    }
}

fn or_placeholder(value: &Option<String>) -> String {
    value
        .clone()
        .unwrap_or_else(|| ABSENT_PLACEHOLDER.to_string())
}

/// 以空格拼接的参数串，与 sysproxy 命令行一致
impl fmt::Display for SysproxyCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.args().join(" "))
    }
}
