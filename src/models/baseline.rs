//! 系统代理基线数据模型
//!
//! 基线即接管系统代理之前用户原有的代理设置，关闭代理时原样写回。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// sysproxy 默认的 flags 值（PROXY_TYPE_DIRECT）
pub const DEFAULT_FLAGS: &str = "1";

/// 用户原有的系统代理设置
///
/// 字段名与 `user-wininet.json` 保持一致。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProxyBaseline {
    /// sysproxy 查询得到的 flags，恢复时原样回放
    #[serde(default = "default_flags")]
    pub flags: String,
    #[serde(default)]
    pub proxy_server: Option<String>,
    #[serde(default)]
    pub bypass_list: Option<String>,
    #[serde(default)]
    pub pac_url: Option<String>,
    /// 是否来自一次真实的查询；为 false 时绝不能写回系统
    #[serde(default, rename = "UserSettingsRecorded")]
    pub recorded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_flags() -> String {
    DEFAULT_FLAGS.to_string()
}

impl ProxyBaseline {
    /// 由查询结果构造已记录的基线
    pub fn recorded(
        flags: impl Into<String>,
        proxy_server: Option<String>,
        bypass_list: Option<String>,
        pac_url: Option<String>,
    ) -> Self {
        Self {
            flags: flags.into(),
            proxy_server,
            bypass_list,
            pac_url,
            recorded: true,
            updated_at: None,
        }
    }

    /// 用户自定义的绕过列表（按 `;` 拆分，去掉空项）
    pub fn custom_bypass_entries(&self) -> Vec<&str> {
        self.bypass_list
            .as_deref()
            .unwrap_or("")
            .split(';')
            .filter(|entry| !entry.is_empty())
            .collect()
    }

    /// 更新最后持久化时间
    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

impl Default for ProxyBaseline {
    fn default() -> Self {
        Self {
            flags: default_flags(),
            proxy_server: None,
            bypass_list: None,
            pac_url: None,
            recorded: false,
            updated_at: None,
        }
    }
}
