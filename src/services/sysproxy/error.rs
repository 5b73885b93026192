//! sysproxy 调用错误
//!
//! 四类错误需要区分开：调用方按类型决定日志级别和消息格式。

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    /// 无法启动 sysproxy（文件缺失、无权限等）
    #[error("无法运行 sysproxy: {arguments}: {source}")]
    FailToRun {
        arguments: String,
        #[source]
        source: std::io::Error,
    },

    /// sysproxy 返回非零退出码
    #[error("sysproxy 执行失败 (退出码 {}): {stderr}", describe_exit_code(.exit_code))]
    SysproxyExitError {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// 查询命令没有任何输出
    #[error("sysproxy 查询结果为空")]
    QueryReturnEmpty,

    /// 查询输出无法解析（附原始字节的十六进制）
    #[error("sysproxy 查询结果格式错误: {hex}")]
    QueryReturnMalformed { hex: String },

    /// 超过配置的等待时间，sysproxy 已被终止
    #[error("sysproxy 超时 ({timeout:?}): {arguments}")]
    Timeout {
        arguments: String,
        timeout: Duration,
    },
}

impl ProxyError {
    /// 稳定的错误类型名
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::FailToRun { .. } => "FailToRun",
            ProxyError::SysproxyExitError { .. } => "SysproxyExitError",
            ProxyError::QueryReturnEmpty => "QueryReturnEmpty",
            ProxyError::QueryReturnMalformed { .. } => "QueryReturnMalformed",
            ProxyError::Timeout { .. } => "Timeout",
        }
    }

    /// 按错误类型记录日志
    pub fn log(&self) {
        match self {
            ProxyError::QueryReturnEmpty => {
                tracing::error!(kind = self.kind(), "sysproxy - {}", self.kind());
            }
            _ => {
                tracing::error!(kind = self.kind(), "sysproxy - {}: {}", self.kind(), self);
            }
        }
    }
}

/// sysproxy 已知退出码的含义
pub fn describe_exit_code(code: &Option<i32>) -> String {
    match *code {
        Some(0) => "0 成功".to_string(),
        Some(1) => "1 参数格式错误".to_string(),
        Some(2) => "2 没有权限".to_string(),
        Some(3) => "3 系统调用失败".to_string(),
        Some(4) => "4 内存不足".to_string(),
        Some(5) => "5 参数个数错误".to_string(),
        Some(other) => other.to_string(),
        None => "被信号终止".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct() {
        let errors = [
            ProxyError::FailToRun {
                arguments: "query".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            },
            ProxyError::SysproxyExitError {
                exit_code: Some(2),
                stderr: "denied".into(),
            },
            ProxyError::QueryReturnEmpty,
            ProxyError::QueryReturnMalformed { hex: "31".into() },
            ProxyError::Timeout {
                arguments: "query".into(),
                timeout: Duration::from_secs(1),
            },
        ];
        let kinds: Vec<_> = errors.iter().map(ProxyError::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "FailToRun",
                "SysproxyExitError",
                "QueryReturnEmpty",
                "QueryReturnMalformed",
                "Timeout"
            ]
        );
    }

    #[test]
    fn test_fail_to_run_carries_arguments_and_source() {
        let err = ProxyError::FailToRun {
            arguments: "set 1 - - -".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("set 1 - - -"));
        assert!(msg.contains("denied"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_exit_error_message() {
        let err = ProxyError::SysproxyExitError {
            exit_code: Some(2),
            stderr: "access denied".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("没有权限"));
        assert!(msg.contains("access denied"));
    }

    #[test]
    fn test_describe_unknown_exit_code() {
        assert_eq!(describe_exit_code(&Some(42)), "42");
        assert_eq!(describe_exit_code(&None), "被信号终止");
    }
}
