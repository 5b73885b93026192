//! sysproxy-state 命令行入口

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use std::time::Duration;
use sysproxy_state::services::sysproxy::parse_query_output;
use sysproxy_state::utils::config::load_runtime_config_in;
use sysproxy_state::{
    init_logger, Context, ExternalProxyTool, Result, RuntimeConfig, SysproxyRunner,
    SystemProxyController,
};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("sysproxy-state: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    init_logger(&config.log, config.state_dir.join("logs"))?;

    // 日志系统就绪后的失败才写入日志
    dispatch(cli, &config).inspect_err(|e| {
        tracing::error!(error = format!("{e:#}"), "命令执行失败");
    })
}

fn dispatch(cli: Cli, config: &RuntimeConfig) -> Result<()> {
    tracing::debug!(command = ?cli.command, helper = ?config.helper_path, "开始执行命令");

    if let Some(mode) = cli.command.proxy_mode() {
        let controller = SystemProxyController::from_config(config);
        controller.apply(&mode)?;
        tracing::info!(mode = ?mode, "系统代理已切换");
        return Ok(());
    }

    match cli.command {
        Commands::Reset => {
            let controller = SystemProxyController::from_config(config);
            if !controller.reset() {
                anyhow::bail!("重置系统代理失败");
            }
            Ok(())
        }
        Commands::Status => {
            let controller = SystemProxyController::from_config(config);
            let baseline = controller
                .store()
                .load()
                .with_context(|| format!("读取基线失败: {:?}", controller.store().path()))?;
            println!("{}", serde_json::to_string_pretty(&baseline)?);
            Ok(())
        }
        Commands::Query => {
            let tool = ExternalProxyTool::from_config(config);
            let raw = tool.query()?;
            let current = parse_query_output(&raw)?;
            println!("{}", serde_json::to_string_pretty(&current)?);
            Ok(())
        }
        Commands::Global { .. } | Commands::Pac { .. } | Commands::Off => Ok(()),
    }
}

/// 配置文件 + 环境变量 + 命令行参数，命令行优先
fn resolve_config(cli: &Cli) -> Result<RuntimeConfig> {
    let mut config = load_runtime_config_in(cli.state_dir.as_deref())?;

    if let Some(helper) = &cli.helper {
        config.helper_path = helper.clone();
    }
    if let Some(secs) = cli.timeout {
        config.helper_timeout = (secs > 0).then_some(Duration::from_secs(secs));
    }
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }

    Ok(config)
}
