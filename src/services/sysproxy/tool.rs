//! sysproxy 辅助进程调用
//!
//! 同步执行 sysproxy 并收集输出。stdout/stderr 由两个线程与等待退出并发读取，
//! 否则子进程写满管道缓冲区后会与 `wait` 互相阻塞。
//!
//! 读取线程通过 channel 交回结果。配置了超时时，等待退出和等待输出共用同一个截止时间；
//! 超时后不再等读取线程（孙进程可能仍持有管道），线程在管道关闭后自行结束。

use super::command::SysproxyCommand;
use super::error::ProxyError;
use super::parser::decode_utf16le;
use crate::models::config::OutputEncoding;
use crate::utils::config::RuntimeConfig;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// 配置了超时时轮询退出状态的间隔
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// UTF-16LE 字节序标记
const UTF16LE_BOM: [u8; 2] = [0xFF, 0xFE];

/// sysproxy 执行结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl RunOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }
}

/// sysproxy 调用接口
///
/// `execute` 只负责启动进程并收集输出；退出码和空查询的判定统一在 `run` 中完成。
pub trait SysproxyRunner: Send + Sync {
    fn execute(&self, command: &SysproxyCommand) -> Result<RunOutput, ProxyError>;

    fn run(&self, command: &SysproxyCommand) -> Result<RunOutput, ProxyError> {
        let output = self.execute(command)?;
        check_output(command, output)
    }

    /// 执行 `query`，返回待解析的原始输出
    fn query(&self) -> Result<String, ProxyError> {
        Ok(self.run(&SysproxyCommand::Query)?.stdout)
    }
}

/// 将执行结果映射为成功或对应的错误类型
pub fn check_output(
    command: &SysproxyCommand,
    output: RunOutput,
) -> Result<RunOutput, ProxyError> {
    if output.exit_code != Some(0) {
        return Err(ProxyError::SysproxyExitError {
            exit_code: output.exit_code,
            stderr: output.stderr,
        });
    }

    if command.is_query() && output.stdout.trim().is_empty() {
        return Err(ProxyError::QueryReturnEmpty);
    }

    Ok(output)
}

/// 调用外部 sysproxy 可执行文件
#[derive(Debug, Clone)]
pub struct ExternalProxyTool {
    helper_path: PathBuf,
    working_dir: Option<PathBuf>,
    encoding: OutputEncoding,
    timeout: Option<Duration>,
}

impl ExternalProxyTool {
    pub fn new(helper_path: impl Into<PathBuf>) -> Self {
        Self {
            helper_path: helper_path.into(),
            working_dir: None,
            encoding: OutputEncoding::default(),
            timeout: None,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(&config.helper_path)
            .with_working_dir(&config.state_dir)
            .with_encoding(config.output_encoding)
            .with_timeout(config.helper_timeout)
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_encoding(mut self, encoding: OutputEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// 设置等待上限；`None` 表示一直等到 sysproxy 退出
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_command(&self, command: &SysproxyCommand) -> Command {
        let mut cmd = Command::new(&self.helper_path);
        cmd.args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        #[cfg(target_os = "windows")]
        cmd.creation_flags(CREATE_NO_WINDOW);

        cmd
    }

    fn timeout_error(&self, arguments: &str, timeout: Duration) -> ProxyError {
        ProxyError::Timeout {
            arguments: arguments.to_string(),
            timeout,
        }
    }

    fn wait(
        &self,
        child: &mut Child,
        arguments: &str,
        deadline: Option<(Instant, Duration)>,
    ) -> Result<ExitStatus, ProxyError> {
        let fail = |source| ProxyError::FailToRun {
            arguments: arguments.to_string(),
            source,
        };

        let Some((deadline, timeout)) = deadline else {
            return child.wait().map_err(fail);
        };

        loop {
            match child.try_wait().map_err(fail)? {
                Some(status) => return Ok(status),
                None if Instant::now() >= deadline => {
                    tracing::warn!(arguments = %arguments, ?timeout, "sysproxy 超时，强制终止");
                    if let Err(e) = child.kill() {
                        tracing::warn!(error = %e, "终止 sysproxy 失败");
                    }
                    let _ = child.wait();
                    return Err(self.timeout_error(arguments, timeout));
                }
                None => thread::sleep(WAIT_POLL_INTERVAL),
            }
        }
    }

    /// 取回读取线程的结果；超过截止时间直接放弃该线程
    fn collect(
        &self,
        reader: &Receiver<Vec<u8>>,
        arguments: &str,
        deadline: Option<(Instant, Duration)>,
    ) -> Result<Vec<u8>, ProxyError> {
        let Some((deadline, timeout)) = deadline else {
            return Ok(reader.recv().unwrap_or_default());
        };

        match reader.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(buf) => Ok(buf),
            Err(RecvTimeoutError::Disconnected) => Ok(Vec::new()),
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    arguments = %arguments,
                    ?timeout,
                    "sysproxy 已退出但输出管道仍被占用，放弃读取"
                );
                Err(self.timeout_error(arguments, timeout))
            }
        }
    }

    fn decode(&self, bytes: &[u8]) -> String {
        let bytes = bytes.strip_prefix(&UTF16LE_BOM).unwrap_or(bytes);
        match self.encoding {
            OutputEncoding::Utf16Le => decode_utf16le(bytes),
            OutputEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

impl SysproxyRunner for ExternalProxyTool {
    fn execute(&self, command: &SysproxyCommand) -> Result<RunOutput, ProxyError> {
        let arguments = command.to_string();
        tracing::debug!(helper = ?self.helper_path, arguments = %arguments, "执行 sysproxy");

        let mut child =
            self.build_command(command)
                .spawn()
                .map_err(|source| ProxyError::FailToRun {
                    arguments: arguments.clone(),
                    source,
                })?;
        let deadline = self.timeout.map(|timeout| (Instant::now() + timeout, timeout));

        let stdout_reader = spawn_drain(child.stdout.take(), "stdout");
        let stderr_reader = spawn_drain(child.stderr.take(), "stderr");

        let status = self.wait(&mut child, &arguments, deadline)?;
        let stdout = self.collect(&stdout_reader, &arguments, deadline)?;
        let stderr = self.collect(&stderr_reader, &arguments, deadline)?;

        let output = RunOutput {
            stdout: self.decode(&stdout),
            stderr: self.decode(&stderr),
            exit_code: status.code(),
        };

        tracing::debug!(
            arguments = %arguments,
            exit_code = ?output.exit_code,
            stdout_len = output.stdout.len(),
            stderr = %output.stderr.trim(),
            "sysproxy 执行完成"
        );

        Ok(output)
    }
}

/// 在独立线程中读完管道，结果经 channel 返回
fn spawn_drain<P>(pipe: Option<P>, name: &'static str) -> Receiver<Vec<u8>>
where
    P: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // 接收端已放弃时发送失败，忽略即可
        let _ = tx.send(drain(pipe, name));
    });
    rx
}

fn drain(pipe: Option<impl Read>, name: &'static str) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf) {
            tracing::warn!(stream = name, error = %e, "读取 sysproxy 输出失败");
        }
    }
    buf
}
