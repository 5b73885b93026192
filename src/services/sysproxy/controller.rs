//! 系统代理开关控制
//!
//! 状态：{未记录基线, 已记录基线} × {关闭, 全局, PAC}
//!
//! - 开启：基线未记录时先 `query` 一次并保存，之后的开启不再查询
//! - 关闭：用基线回放 `set`，并把基线标记为未记录，下次开启重新查询
//! - 重置：丢弃基线，直接 `set 1 - - -`
//!
//! 所有变更路径都先落盘再调用 sysproxy。

use super::bypass::merge_bypass_list;
use super::command::SysproxyCommand;
use super::error::ProxyError;
use super::parser::parse_query_output;
use super::tool::{ExternalProxyTool, SysproxyRunner};
use crate::models::ProxyBaseline;
use crate::services::baseline_store::BaselineStore;
use crate::utils::config::RuntimeConfig;
use anyhow::Context;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// 目标代理模式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyMode {
    Off,
    Global { server: String },
    Pac { url: String },
}

/// 系统代理控制器
///
/// 基线由控制器独占，`enable`/`disable`/`reset` 在整个过程中持有同一把锁，
/// 避免并发调用在查询基线时互相覆盖。
pub struct SystemProxyController<R = ExternalProxyTool> {
    store: BaselineStore,
    runner: R,
    baseline: Mutex<ProxyBaseline>,
}

impl SystemProxyController<ExternalProxyTool> {
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(
            BaselineStore::new(&config.baseline_file),
            ExternalProxyTool::from_config(config),
        )
    }
}

impl<R: SysproxyRunner> SystemProxyController<R> {
    pub fn new(store: BaselineStore, runner: R) -> Self {
        Self {
            store,
            runner,
            baseline: Mutex::new(ProxyBaseline::default()),
        }
    }

    pub fn store(&self) -> &BaselineStore {
        &self.store
    }

    /// 当前内存中的基线快照
    pub fn baseline(&self) -> ProxyBaseline {
        self.lock().clone()
    }

    /// 按目标模式切换系统代理
    pub fn apply(&self, mode: &ProxyMode) -> Result<(), ProxyError> {
        match mode {
            ProxyMode::Off => self.disable(),
            ProxyMode::Global { server } => self.enable(true, server, ""),
            ProxyMode::Pac { url } => self.enable(false, "", url),
        }
    }

    /// 开启系统代理（`global` 为 false 时使用 PAC）
    pub fn enable(&self, global: bool, proxy_server: &str, pac_url: &str) -> Result<(), ProxyError> {
        let mut state = self.lock();
        self.enable_locked(&mut state, global, proxy_server, pac_url)
            .inspect_err(ProxyError::log)
    }

    /// 关闭系统代理，恢复用户原有设置
    pub fn disable(&self) -> Result<(), ProxyError> {
        let mut state = self.lock();
        self.disable_locked(&mut state).inspect_err(ProxyError::log)
    }

    /// 丢弃基线并把系统代理强制设为直连
    ///
    /// 用于基线损坏等无法正常恢复的情况，失败只返回 false。
    pub fn reset(&self) -> bool {
        let mut state = self.lock();
        *state = ProxyBaseline::default();
        self.store.save_or_log(&state);

        match self.runner.run(&SysproxyCommand::direct()) {
            Ok(_) => {
                tracing::info!("系统代理已重置为直连");
                true
            }
            Err(e) => {
                e.log();
                false
            }
        }
    }

    fn enable_locked(
        &self,
        state: &mut ProxyBaseline,
        global: bool,
        proxy_server: &str,
        pac_url: &str,
    ) -> Result<(), ProxyError> {
        self.reload(state);
        self.record_if_needed(state)?;

        let command = if global {
            SysproxyCommand::Global {
                server: proxy_server.to_string(),
                bypass_list: merge_bypass_list(&state.custom_bypass_entries()),
            }
        } else {
            SysproxyCommand::Pac {
                url: pac_url.to_string(),
            }
        };

        self.store.save_or_log(state);
        self.runner.run(&command)?;

        tracing::info!(mode = command.name(), arguments = %command, "系统代理已开启");
        Ok(())
    }

    fn disable_locked(&self, state: &mut ProxyBaseline) -> Result<(), ProxyError> {
        self.reload(state);
        // 未记录的基线不能回放，先查一次当前设置
        self.record_if_needed(state)?;

        let command = SysproxyCommand::restore(state);
        state.recorded = false;

        self.store.save_or_log(state);
        self.runner.run(&command)?;

        tracing::info!(arguments = %command, "系统代理已恢复为用户原有设置");
        Ok(())
    }

    /// 从存储刷新基线；读取失败时保留内存中的基线
    fn reload(&self, state: &mut ProxyBaseline) {
        match self.store.load() {
            Ok(loaded) => *state = loaded,
            Err(e) => {
                tracing::warn!(
                    path = ?self.store.path(),
                    error = %e,
                    recorded = state.recorded,
                    "读取代理基线失败，沿用内存中的基线"
                );
            }
        }
    }

    fn record_if_needed(&self, state: &mut ProxyBaseline) -> Result<(), ProxyError> {
        if state.recorded {
            return Ok(());
        }

        let raw = self.runner.query()?;
        *state = parse_query_output(&raw)?;
        tracing::info!(
            flags = %state.flags,
            proxy_server = ?state.proxy_server,
            bypass_list = ?state.bypass_list,
            pac_url = ?state.pac_url,
            "已记录用户原有代理设置"
        );
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ProxyBaseline> {
        self.baseline.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 异步包装：在阻塞线程池中执行，避免阻塞 tokio 运行时
impl<R: SysproxyRunner + 'static> SystemProxyController<R> {
    pub async fn enable_async(
        self: &Arc<Self>,
        global: bool,
        proxy_server: String,
        pac_url: String,
    ) -> anyhow::Result<()> {
        let controller = Arc::clone(self);
        tokio::task::spawn_blocking(move || controller.enable(global, &proxy_server, &pac_url))
            .await
            .context("系统代理任务执行失败")??;
        Ok(())
    }

    pub async fn disable_async(self: &Arc<Self>) -> anyhow::Result<()> {
        let controller = Arc::clone(self);
        tokio::task::spawn_blocking(move || controller.disable())
            .await
            .context("系统代理任务执行失败")??;
        Ok(())
    }

    pub async fn reset_async(self: &Arc<Self>) -> bool {
        let controller = Arc::clone(self);
        tokio::task::spawn_blocking(move || controller.reset())
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "系统代理重置任务执行失败");
                false
            })
    }
}
