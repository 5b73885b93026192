//! JSON 文件管理器
//!
//! 提供 JSON 文件的整文件读写，支持：
//! - 类型化读写（serde）
//! - 原子覆盖写入（先写同目录临时文件，再 rename）
//! - 自动创建父目录
//! - Unix 权限设置（0o600）
//!
//! # 使用示例
//!
//! ```rust
//! use std::path::Path;
//! use sysproxy_state::data::JsonManager;
//! use sysproxy_state::models::ProxyBaseline;
//!
//! # fn main() -> sysproxy_state::data::Result<()> {
//! let manager = JsonManager::new();
//! let baseline: ProxyBaseline = manager.read_as(Path::new("user-wininet.json"))?;
//! manager.write_as(Path::new("user-wininet.json"), &baseline)?;
//! # Ok(())
//! # }
//! ```

use crate::data::{DataError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// JSON 文件管理器
///
/// 无内部状态，也不做并发控制，由调用方保证单写者。
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonManager;

impl JsonManager {
    pub fn new() -> Self {
        Self
    }

    /// 读取整个 JSON 文件
    ///
    /// # 返回
    ///
    /// - `Ok(Value)`: JSON 值
    /// - `Err(DataError)`: 读取或解析失败
    pub fn read(&self, path: &Path) -> Result<Value> {
        let content = fs::read_to_string(path).map_err(|e| DataError::io(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// 读取并反序列化为指定类型
    pub fn read_as<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let value = self.read(path)?;
        Ok(serde_json::from_value(value)?)
    }

    /// 原子写入整个 JSON 文件
    ///
    /// 自动创建父目录并设置权限（Unix 平台 0o600）。
    /// 写入过程中崩溃时，目标文件要么是旧内容，要么是新内容。
    pub fn write(&self, path: &Path, value: &Value) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DataError::io(parent, e))?;
        }

        let content = serde_json::to_string_pretty(value)?;
        let tmp_path = temp_sibling(path);

        if let Err(e) = fs::write(&tmp_path, content) {
            let _ = fs::remove_file(&tmp_path);
            return Err(DataError::io(tmp_path, e));
        }
        set_permissions(&tmp_path)?;

        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::io(path, e)
        })
    }

    /// 序列化并原子写入
    pub fn write_as<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let value = serde_json::to_value(data)?;
        self.write(path, &value)
    }

    /// 检查文件是否存在
    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// 同目录下的临时文件路径（保证 rename 不跨文件系统）
fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// 设置文件权限（Unix 平台 0o600）
#[cfg(unix)]
fn set_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let metadata = fs::metadata(path).map_err(|e| DataError::io(path, e))?;
    let mut perms = metadata.permissions();
    perms.set_mode(0o600);
    fs::set_permissions(path, perms).map_err(|e| DataError::io(path, e))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
