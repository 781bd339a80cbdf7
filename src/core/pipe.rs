use crate::core::command::CommandSpec;
use crate::domain::model::{CapturedOutput, OutputLine, PipeState, StreamSource};
use crate::utils::error::{Result, TourError};
use std::io;
use std::sync::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tokio::sync::mpsc::UnboundedSender;

/// 子行程 pipe 協調器
///
/// 啟動子行程後同時進行三件事：寫入 stdin 並關閉、讀 stdout 到 EOF、讀 stderr 到 EOF。
/// 三個活動都結束之後才會 `wait()` 子行程，避免任何一條 pipe 因為沒人讀而塞滿卡死。
pub struct PipeCoordinator {
    spec: CommandSpec,
    state: PipeState,
    line_sink: Option<UnboundedSender<OutputLine>>,
}

impl PipeCoordinator {
    pub fn new(spec: CommandSpec) -> Self {
        Self {
            spec,
            state: PipeState::NotStarted,
            line_sink: None,
        }
    }

    /// 每讀到一行就送一份到 channel，原始位元組仍完整保留在結果裡
    pub fn with_line_sink(mut self, sink: UnboundedSender<OutputLine>) -> Self {
        self.line_sink = Some(sink);
        self
    }

    pub fn state(&self) -> PipeState {
        self.state
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    fn advance(&mut self, next: PipeState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(TourError::InvalidStateTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!("{}: {} -> {}", self.spec.program, self.state, next);
        self.state = next;
        Ok(())
    }

    /// 執行指令並把 `payload` 餵給 stdin。
    ///
    /// 非零退出碼不算錯誤，呼叫端可用 [`CapturedOutput::check`] 轉換。
    pub async fn run(&mut self, payload: &[u8]) -> Result<CapturedOutput> {
        if self.state != PipeState::NotStarted {
            return Err(TourError::InvalidStateTransition {
                from: self.state.to_string(),
                to: PipeState::Started.to_string(),
            });
        }

        tracing::info!("🚀 Running: {}", self.spec.display());
        let mut child = self
            .spec
            .to_command()
            .spawn()
            .map_err(|source| TourError::LaunchError {
                program: self.spec.program.clone(),
                source,
            })?;
        self.advance(PipeState::Started)?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        self.advance(PipeState::StreamsDraining)?;

        let program = self.spec.program.clone();
        let deadline = self.spec.timeout;
        let outcome = match deadline {
            Some(after) => {
                tokio::time::timeout(after, self.finish(&mut child, stdin, stdout, stderr, payload))
                    .await
                    .map_err(|_| after)
            }
            None => Ok(self.finish(&mut child, stdin, stdout, stderr, payload).await),
        };

        match outcome {
            Ok(result) => result,
            Err(after) => {
                tracing::warn!("⏱️ {} exceeded {:?}, killing it", program, after);
                kill_and_reap(&mut child).await;
                Err(TourError::Timeout { program, after })
            }
        }
    }

    async fn finish(
        &mut self,
        child: &mut Child,
        stdin: Option<ChildStdin>,
        stdout: Option<ChildStdout>,
        stderr: Option<ChildStderr>,
        payload: &[u8],
    ) -> Result<CapturedOutput> {
        let combined = self.spec.combined.then(|| Mutex::new(Vec::new()));
        let sink = self.line_sink.as_ref();

        // completion barrier：三個活動全部結束才往下走
        let (written, out, err) = tokio::join!(
            feed_stdin(stdin, payload),
            drain_stream(stdout, StreamSource::Stdout, combined.as_ref(), sink),
            drain_stream(stderr, StreamSource::Stderr, combined.as_ref(), sink),
        );

        let drained = written.and(out).and_then(|stdout| err.map(|stderr| (stdout, stderr)));
        let (stdout, stderr) = match drained {
            Ok(buffers) => buffers,
            Err(e) => {
                tracing::error!("❌ Stream failure on {}: {}", self.spec.program, e);
                kill_and_reap(child).await;
                return Err(e);
            }
        };
        self.advance(PipeState::Exited)?;

        let status = child.wait().await?;
        self.advance(PipeState::Reaped)?;

        tracing::debug!(
            "{} finished with {} ({} bytes stdout, {} bytes stderr)",
            self.spec.program,
            status,
            stdout.len(),
            stderr.len()
        );

        Ok(CapturedOutput {
            stdout,
            stderr,
            combined: combined.map(|buf| buf.into_inner().unwrap_or_else(|e| e.into_inner())),
            status,
        })
    }
}

async fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        tracing::debug!("kill failed (child probably already exited): {}", e);
    }
    if let Err(e) = child.wait().await {
        tracing::warn!("Failed to reap child process: {}", e);
    }
}

async fn feed_stdin<W>(stdin: Option<W>, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let Some(mut stdin) = stdin else {
        return Ok(());
    };

    let written = async {
        stdin.write_all(payload).await?;
        stdin.shutdown().await
    }
    .await;
    // drop 才會真正關閉 fd，子行程才讀得到 EOF
    drop(stdin);

    match written {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            tracing::debug!("Child closed stdin before reading everything: {}", e);
            Ok(())
        }
        Err(source) => Err(TourError::StreamError {
            stream: "stdin",
            source,
        }),
    }
}

async fn drain_stream<R>(
    stream: Option<R>,
    origin: StreamSource,
    combined: Option<&Mutex<Vec<u8>>>,
    sink: Option<&UnboundedSender<OutputLine>>,
) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return Ok(Vec::new());
    };

    let mut reader = BufReader::new(stream);
    let mut captured = Vec::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        let n = reader
            .read_until(b'\n', &mut line)
            .await
            .map_err(|source| TourError::StreamError {
                stream: origin.as_str(),
                source,
            })?;
        if n == 0 {
            break;
        }

        captured.extend_from_slice(&line);
        if let Some(buf) = combined {
            let mut guard = buf.lock().unwrap_or_else(|e| e.into_inner());
            guard.extend_from_slice(&line);
        }
        if let Some(tx) = sink {
            let text = String::from_utf8_lossy(strip_newline(&line)).into_owned();
            // receiver 被丟掉也沒關係，資料仍照常收集
            let _ = tx.send(OutputLine {
                source: origin,
                line: text,
                raw: line.clone(),
            });
        }
    }

    Ok(captured)
}

fn strip_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
