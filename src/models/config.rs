//! 应用配置数据模型

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("无效的日志级别: {other}")),
        }
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// 日志输出目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Console,
    File,
    Both,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// 日志目录（为空时使用状态目录下的 logs）
    pub file_path: Option<String>,
}

/// sysproxy 输出的文本编码
///
/// sysproxy 按 16 位字符输出，但部分环境下会以 8 位文本交付，
/// 此时由查询解析器的回退逻辑兜底。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputEncoding {
    #[default]
    #[serde(rename = "utf-16le", alias = "utf16le")]
    Utf16Le,
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
}

impl FromStr for OutputEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "utf-16le" | "utf16le" | "utf-16" | "unicode" => Ok(OutputEncoding::Utf16Le),
            "utf-8" | "utf8" | "ascii" => Ok(OutputEncoding::Utf8),
            other => Err(format!("无效的输出编码: {other}")),
        }
    }
}

/// 应用配置（`<state_dir>/config.json`）
///
/// 所有字段均可省略；路径为空时由 `utils::config` 按状态目录推导。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub state_dir: Option<PathBuf>,
    /// sysproxy 可执行文件路径
    pub helper_path: Option<PathBuf>,
    /// 基线文件路径
    pub baseline_file: Option<PathBuf>,
    pub output_encoding: OutputEncoding,
    /// sysproxy 超时（秒）；为空表示无限等待
    pub helper_timeout_secs: Option<u64>,
    pub log: LogConfig,
}

impl AppConfig {
    pub fn helper_timeout(&self) -> Option<Duration> {
        self.helper_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
