use crate::data::JsonManager;
use crate::models::config::{AppConfig, LogConfig, OutputEncoding};
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 状态目录覆盖（测试和便携模式使用）
pub const STATE_DIR_ENV: &str = "SYSPROXY_STATE_DIR";
pub const HELPER_ENV: &str = "SYSPROXY_HELPER";
pub const TIMEOUT_ENV: &str = "SYSPROXY_TIMEOUT_SECS";
pub const OUTPUT_ENCODING_ENV: &str = "SYSPROXY_OUTPUT_ENCODING";
pub const LOG_LEVEL_ENV: &str = "SYSPROXY_LOG_LEVEL";

/// 基线文件名
pub const BASELINE_FILE_NAME: &str = "user-wininet.json";
/// 应用配置文件名
pub const CONFIG_FILE_NAME: &str = "config.json";

#[cfg(windows)]
pub const HELPER_FILE_NAME: &str = "sysproxy.exe";
#[cfg(not(windows))]
pub const HELPER_FILE_NAME: &str = "sysproxy";

/// 解析完成、可直接使用的运行配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub state_dir: PathBuf,
    pub helper_path: PathBuf,
    pub baseline_file: PathBuf,
    pub output_encoding: OutputEncoding,
    pub helper_timeout: Option<Duration>,
    pub log: LogConfig,
}

impl RuntimeConfig {
    /// 以状态目录为根推导出所有路径
    pub fn from_app_config(config: &AppConfig, state_dir: PathBuf) -> Self {
        let helper_path = config
            .helper_path
            .clone()
            .unwrap_or_else(|| state_dir.join(HELPER_FILE_NAME));
        let baseline_file = config
            .baseline_file
            .clone()
            .unwrap_or_else(|| state_dir.join(BASELINE_FILE_NAME));

        Self {
            helper_path,
            baseline_file,
            output_encoding: config.output_encoding,
            helper_timeout: config.helper_timeout(),
            log: config.log.clone(),
            state_dir,
        }
    }
}

/// 状态目录 (~/.sysproxy-state)，若不存在则创建
///
/// 优先使用 `SYSPROXY_STATE_DIR` 环境变量。
pub fn state_dir() -> Result<PathBuf> {
    let dir = match env::var_os(STATE_DIR_ENV).filter(|v| !v.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => dirs::home_dir()
            .context("无法获取用户主目录")?
            .join(".sysproxy-state"),
    };
    ensure_dir(&dir)?;
    Ok(dir)
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).with_context(|| format!("无法创建状态目录: {dir:?}"))?;
    }
    Ok(())
}

/// 读取 `<state_dir>/config.json`（若文件不存在返回默认配置）
pub fn read_app_config(state_dir: &Path) -> Result<AppConfig> {
    let path = state_dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    JsonManager::new()
        .read_as(&path)
        .with_context(|| format!("读取配置文件失败: {path:?}"))
}

/// 用环境变量覆盖配置
pub fn apply_env_overrides(config: &mut AppConfig) -> Result<()> {
    if let Some(helper) = env::var_os(HELPER_ENV).filter(|v| !v.is_empty()) {
        config.helper_path = Some(PathBuf::from(helper));
    }

    if let Ok(secs) = env::var(TIMEOUT_ENV) {
        let secs = secs
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{TIMEOUT_ENV} 不是有效的秒数: {secs}"))?;
        config.helper_timeout_secs = Some(secs);
    }

    if let Ok(encoding) = env::var(OUTPUT_ENCODING_ENV) {
        config.output_encoding = encoding.parse().map_err(anyhow::Error::msg)?;
    }

    if let Ok(level) = env::var(LOG_LEVEL_ENV) {
        config.log.level = level.parse().map_err(anyhow::Error::msg)?;
    }

    Ok(())
}

/// 加载运行配置：配置文件 + 环境变量
pub fn load_runtime_config() -> Result<RuntimeConfig> {
    load_runtime_config_in(None)
}

/// 加载运行配置，`state_dir_override` 优先于环境变量和默认目录
pub fn load_runtime_config_in(state_dir_override: Option<&Path>) -> Result<RuntimeConfig> {
    let dir = match state_dir_override {
        Some(dir) => {
            ensure_dir(dir)?;
            dir.to_path_buf()
        }
        None => state_dir()?,
    };
    let mut config = read_app_config(&dir)?;
    apply_env_overrides(&mut config)?;

    let dir = match config.state_dir.clone().filter(|_| state_dir_override.is_none()) {
        Some(custom) => {
            ensure_dir(&custom)?;
            custom
        }
        None => dir,
    };

    let runtime = RuntimeConfig::from_app_config(&config, dir);
    tracing::debug!(
        state_dir = ?runtime.state_dir,
        helper = ?runtime.helper_path,
        baseline = ?runtime.baseline_file,
        "运行配置已加载"
    );
    Ok(runtime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::LogLevel;
    use serial_test::serial;
    use tempfile::TempDir;

    /// 恢复测试期间修改的环境变量
    struct TempEnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl TempEnvGuard {
        fn new(vars: &[&'static str]) -> Self {
            let saved = vars.iter().map(|k| (*k, env::var(k).ok())).collect();
            for k in vars {
                env::remove_var(k);
            }
            Self { saved }
        }
    }

    impl Drop for TempEnvGuard {
        fn drop(&mut self) {
            for (key, value) in &self.saved {
                match value {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }

    const ALL_VARS: [&str; 5] = [
        STATE_DIR_ENV,
        HELPER_ENV,
        TIMEOUT_ENV,
        OUTPUT_ENCODING_ENV,
        LOG_LEVEL_ENV,
    ];

    #[test]
    #[serial]
    fn test_state_dir_from_env() -> Result<()> {
        let _guard = TempEnvGuard::new(&ALL_VARS);
        let temp = TempDir::new()?;
        let dir = temp.path().join("nested").join("state");
        env::set_var(STATE_DIR_ENV, &dir);

        assert_eq!(state_dir()?, dir);
        assert!(dir.is_dir());
        Ok(())
    }

    #[test]
    #[serial]
    fn test_defaults_derive_from_state_dir() -> Result<()> {
        let _guard = TempEnvGuard::new(&ALL_VARS);
        let temp = TempDir::new()?;
        env::set_var(STATE_DIR_ENV, temp.path());

        let config = load_runtime_config()?;
        assert_eq!(config.state_dir, temp.path());
        assert_eq!(config.helper_path, temp.path().join(HELPER_FILE_NAME));
        assert_eq!(config.baseline_file, temp.path().join(BASELINE_FILE_NAME));
        assert_eq!(config.output_encoding, OutputEncoding::Utf16Le);
        assert_eq!(config.helper_timeout, None);
        Ok(())
    }

    #[test]
    #[serial]
    fn test_config_file_and_env_overrides() -> Result<()> {
        let _guard = TempEnvGuard::new(&ALL_VARS);
        let temp = TempDir::new()?;
        env::set_var(STATE_DIR_ENV, temp.path());

        fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            r#"{ "helper_path": "/opt/from-file", "helper_timeout_secs": 5 }"#,
        )?;
        env::set_var(HELPER_ENV, "/opt/from-env");
        env::set_var(OUTPUT_ENCODING_ENV, "utf8");
        env::set_var(LOG_LEVEL_ENV, "debug");

        let config = load_runtime_config()?;
        assert_eq!(config.helper_path, PathBuf::from("/opt/from-env"));
        assert_eq!(config.helper_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.output_encoding, OutputEncoding::Utf8);
        assert_eq!(config.log.level, LogLevel::Debug);
        Ok(())
    }

    #[test]
    #[serial]
    fn test_explicit_state_dir_wins_over_env() -> Result<()> {
        let _guard = TempEnvGuard::new(&ALL_VARS);
        let from_env = TempDir::new()?;
        let explicit = TempDir::new()?;
        env::set_var(STATE_DIR_ENV, from_env.path());

        let config = load_runtime_config_in(Some(explicit.path()))?;
        assert_eq!(config.state_dir, explicit.path());
        assert_eq!(config.baseline_file, explicit.path().join(BASELINE_FILE_NAME));
        Ok(())
    }

    #[test]
    #[serial]
    fn test_invalid_timeout_env_is_rejected() -> Result<()> {
        let _guard = TempEnvGuard::new(&ALL_VARS);
        let temp = TempDir::new()?;
        env::set_var(STATE_DIR_ENV, temp.path());
        env::set_var(TIMEOUT_ENV, "soon");

        assert!(load_runtime_config().is_err());
        Ok(())
    }

    #[test]
    #[serial]
    fn test_corrupt_config_file_is_reported() -> Result<()> {
        let _guard = TempEnvGuard::new(&ALL_VARS);
        let temp = TempDir::new()?;
        fs::write(temp.path().join(CONFIG_FILE_NAME), "{ broken")?;

        let err = read_app_config(temp.path()).unwrap_err();
        assert!(err.to_string().contains("读取配置文件失败"));
        Ok(())
    }
}
