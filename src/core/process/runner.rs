use super::{CommandRunner, IdleBackoff, ProcessInvocation, ProcessResult, SPAWN_FAILURE_CODE};
use crate::core::config::RunnerConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const PIPE_READ_BYTES: usize = 4096;
const CHUNK_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamKind {
    Stdout,
    Stderr,
}

struct Chunk {
    stream: StreamKind,
    bytes: Vec<u8>,
}

/// Runs children with one reader task per output pipe and one writer task for stdin.
///
/// Readers forward chunks over a channel; the calling task writes them to the
/// capture files and mirrors them to our own streams, so a chatty child never
/// blocks on a full pipe while we wait on another one.
#[derive(Debug, Clone)]
pub struct TokioCommandRunner {
    echo: bool,
    stdin_chunk_bytes: usize,
    idle_step: Duration,
    idle_cap: Duration,
    exit_drain_grace: Duration,
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new(&RunnerConfig::default())
    }
}

impl TokioCommandRunner {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            echo: config.echo_child_output,
            stdin_chunk_bytes: config.stdin_chunk_bytes.max(1),
            idle_step: config.idle_backoff_step(),
            idle_cap: config.idle_backoff_cap(),
            exit_drain_grace: config.exit_drain_grace(),
        }
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, invocation: &ProcessInvocation) -> Result<ProcessResult, AppError> {
        let (program, args) = invocation.argv.split_first().ok_or_else(|| {
            AppError::new(ErrorCategory::ProcessError, "cannot run an empty command line")
                .with_code(SPAWN_FAILURE_CODE)
        })?;

        let stdin_source = match &invocation.stdin {
            Some(path) => Some(File::open(path).await.map_err(|err| {
                redirect_error("open stdin source", path, err).with_code("PROC-002")
            })?),
            None => None,
        };
        let mut mirror = Mirror {
            stdout_sink: create_sink(invocation.stdout.as_deref()).await?,
            stderr_sink: create_sink(invocation.stderr.as_deref()).await?,
            echo: self.echo,
            stdout: tokio::io::stdout(),
            stderr: tokio::io::stderr(),
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(if stdin_source.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(argv = ?invocation.argv, "spawning child");
        let started = Instant::now();
        let mut child = command.spawn().map_err(|err| {
            AppError::with_source(
                ErrorCategory::ProcessError,
                format!("failed to start process `{}`: {}", program, err),
                err,
            )
            .with_code(SPAWN_FAILURE_CODE)
            .with_context("command_line", invocation.argv.join(" "))
        })?;

        let (tx, mut rx) = mpsc::channel::<Chunk>(CHUNK_QUEUE_DEPTH);
        let mut readers: Vec<JoinHandle<()>> = Vec::with_capacity(2);
        if let Some(pipe) = child.stdout.take() {
            readers.push(tokio::spawn(pump(pipe, StreamKind::Stdout, tx.clone())));
        }
        if let Some(pipe) = child.stderr.take() {
            readers.push(tokio::spawn(pump(pipe, StreamKind::Stderr, tx.clone())));
        }
        drop(tx);

        let writer = match (stdin_source, child.stdin.take()) {
            (Some(source), Some(pipe)) => {
                Some(tokio::spawn(feed(source, pipe, self.stdin_chunk_bytes)))
            }
            _ => None,
        };

        let mut backoff = IdleBackoff::new(self.idle_step, self.idle_cap);
        let mut exited: Option<ExitStatus> = None;
        loop {
            let wait = if exited.is_some() {
                self.exit_drain_grace
            } else {
                backoff.current()
            };
            match timeout(wait, rx.recv()).await {
                Ok(Some(chunk)) => {
                    mirror.write(chunk).await;
                    backoff.reset();
                }
                // Every reader hit EOF.
                Ok(None) => break,
                Err(_) if exited.is_some() => {
                    // Something the child started still holds its pipes open.
                    tracing::debug!(program, "child exited with output pipes still open");
                    break;
                }
                Err(_) => {
                    backoff.grow();
                    exited = child.try_wait().map_err(|err| wait_error(program, err))?;
                }
            }
        }

        let status = match exited {
            Some(status) => status,
            None => child.wait().await.map_err(|err| wait_error(program, err))?,
        };

        for reader in readers {
            reader.abort();
            let _ = reader.await;
        }
        while let Ok(chunk) = rx.try_recv() {
            mirror.write(chunk).await;
        }
        if let Some(writer) = writer {
            writer.abort();
            let _ = writer.await;
        }
        mirror.finish().await;

        let exit_code = exit_code(status);
        tracing::debug!(
            program,
            exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "child finished"
        );
        Ok(ProcessResult { exit_code })
    }
}

async fn pump<R>(mut pipe: R, stream: StreamKind, tx: mpsc::Sender<Chunk>)
where
    R: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; PIPE_READ_BYTES];
    loop {
        match pipe.read(&mut buffer).await {
            Ok(0) => return,
            Ok(count) => {
                let chunk = Chunk {
                    stream,
                    bytes: buffer[..count].to_vec(),
                };
                if tx.send(chunk).await.is_err() {
                    return;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                tracing::debug!(?stream, error = %err, "child output pipe closed");
                return;
            }
        }
    }
}

async fn feed(mut source: File, mut pipe: ChildStdin, chunk_bytes: usize) {
    let mut buffer = vec![0u8; chunk_bytes];
    loop {
        let count = match source.read(&mut buffer).await {
            Ok(0) => break,
            Ok(count) => count,
            Err(err) => {
                tracing::warn!(error = %err, "failed reading stdin source");
                break;
            }
        };
        if let Err(err) = pipe.write_all(&buffer[..count]).await {
            tracing::debug!(error = %err, "child stopped accepting stdin");
            return;
        }
    }
    // Closing signals EOF to the child.
    let _ = pipe.shutdown().await;
}

struct Mirror {
    stdout_sink: Option<File>,
    stderr_sink: Option<File>,
    echo: bool,
    stdout: tokio::io::Stdout,
    stderr: tokio::io::Stderr,
}

impl Mirror {
    async fn write(&mut self, chunk: Chunk) {
        match chunk.stream {
            StreamKind::Stdout => {
                write_sink(&mut self.stdout_sink, &chunk.bytes).await;
                if self.echo {
                    echo(&mut self.stdout, &chunk.bytes).await;
                }
            }
            StreamKind::Stderr => {
                write_sink(&mut self.stderr_sink, &chunk.bytes).await;
                if self.echo {
                    echo(&mut self.stderr, &chunk.bytes).await;
                }
            }
        }
    }

    async fn finish(&mut self) {
        for sink in [&mut self.stdout_sink, &mut self.stderr_sink] {
            if let Some(file) = sink.as_mut() {
                if let Err(err) = file.flush().await {
                    tracing::warn!(error = %err, "failed to flush capture file");
                }
            }
        }
    }
}

async fn write_sink(sink: &mut Option<File>, bytes: &[u8]) {
    if let Some(file) = sink.as_mut() {
        if let Err(err) = file.write_all(bytes).await {
            tracing::warn!(error = %err, "capture file write failed; dropping capture");
            *sink = None;
        }
    }
}

async fn echo<W: AsyncWrite + Unpin>(stream: &mut W, bytes: &[u8]) {
    if stream.write_all(bytes).await.is_ok() {
        let _ = stream.flush().await;
    }
}

async fn create_sink(path: Option<&Path>) -> Result<Option<File>, AppError> {
    match path {
        Some(path) => File::create(path)
            .await
            .map(Some)
            .map_err(|err| redirect_error("create capture file", path, err).with_code("PROC-003")),
        None => Ok(None),
    }
}

fn redirect_error(action: &str, path: &Path, err: io::Error) -> AppError {
    AppError::with_source(
        ErrorCategory::ProcessError,
        format!("failed to {} {}", action, path.display()),
        err,
    )
}

fn wait_error(program: &str, err: io::Error) -> AppError {
    AppError::with_source(
        ErrorCategory::ProcessError,
        format!("failed waiting for `{}`", program),
        err,
    )
    .with_code("PROC-004")
}

/// The child's own exit status; a signal death maps to 128 + signal number.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
