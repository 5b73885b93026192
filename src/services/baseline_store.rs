//! 系统代理基线存储（user-wininet.json）

use crate::data::{JsonManager, Result};
use crate::models::ProxyBaseline;
use std::path::{Path, PathBuf};

pub struct BaselineStore {
    json: JsonManager,
    path: PathBuf,
}

impl BaselineStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            json: JsonManager::new(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 加载基线；文件不存在时返回未记录的默认基线
    pub fn load(&self) -> Result<ProxyBaseline> {
        if !self.json.exists(&self.path) {
            return Ok(ProxyBaseline::default());
        }
        self.json.read_as(&self.path)
    }

    /// 原子覆盖写入基线
    pub fn save(&self, baseline: &ProxyBaseline) -> Result<()> {
        let mut snapshot = baseline.clone();
        snapshot.touch();
        self.json.write_as(&self.path, &snapshot)
    }

    /// 写入基线，失败只记录日志
    pub fn save_or_log(&self, baseline: &ProxyBaseline) {
        if let Err(e) = self.save(baseline) {
            tracing::warn!(path = ?self.path, error = %e, "保存代理基线失败");
        }
    }
}
