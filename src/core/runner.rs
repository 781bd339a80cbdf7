use crate::core::command::CommandSpec;
use crate::core::pipe::PipeCoordinator;
use crate::domain::model::{CapturedOutput, OutputLine};
use crate::utils::error::Result;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

/// 執行外部指令的入口，帶一個預設逾時
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    default_timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self {
            default_timeout: timeout,
        }
    }

    fn prepare(&self, mut spec: CommandSpec) -> CommandSpec {
        if spec.timeout.is_none() {
            spec.timeout = self.default_timeout;
        }
        spec
    }

    /// 執行並回傳完整結果，非零退出碼不視為錯誤
    pub async fn run(&self, spec: CommandSpec, payload: &[u8]) -> Result<CapturedOutput> {
        PipeCoordinator::new(self.prepare(spec)).run(payload).await
    }

    /// 只要 stdout，退出碼非零時回傳 `TourError::ExitStatus`
    pub async fn output(&self, spec: CommandSpec) -> Result<Vec<u8>> {
        let captured = self.run(spec, &[]).await?.check()?;
        Ok(captured.stdout)
    }

    /// stdout 與 stderr 依到達順序合併
    pub async fn combined_output(&self, spec: CommandSpec, payload: &[u8]) -> Result<Vec<u8>> {
        let captured = self.run(spec.combined(true), payload).await?.check()?;
        Ok(captured.combined.unwrap_or_default())
    }

    /// 把子行程的 stdout 當成 JSON 解析
    pub async fn decode_json_stdout<T: DeserializeOwned>(&self, spec: CommandSpec) -> Result<T> {
        let stdout = self.output(spec).await?;
        Ok(serde_json::from_slice(&stdout)?)
    }

    /// 在背景執行，逐行輸出透過 channel 即時送出
    pub fn spawn_streaming(
        &self,
        spec: CommandSpec,
        payload: Vec<u8>,
    ) -> (UnboundedReceiver<OutputLine>, JoinHandle<Result<CapturedOutput>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut coordinator = PipeCoordinator::new(self.prepare(spec)).with_line_sink(tx);
        // coordinator 持有唯一的 sender，結束後 channel 自然關閉
        let handle = tokio::spawn(async move { coordinator.run(&payload).await });
        (rx, handle)
    }
}
