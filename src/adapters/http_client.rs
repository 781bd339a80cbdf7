use crate::utils::error::{Result, TourError};
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// 完整讀完的回應
#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchedBody {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Option<Duration>,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// GET 並把 body 整個讀進記憶體，任何狀態碼都算成功
    pub async fn get(&self, url: &str) -> Result<FetchedBody> {
        tracing::debug!("Making GET request to: {}", url);

        let mut request = self.client.get(url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        // body 讀完後連線會自動歸還
        let body = response.bytes().await?;

        tracing::debug!("Response status: {} ({} bytes)", status, body.len());
        Ok(FetchedBody {
            status,
            content_type,
            body,
        })
    }

    /// 非 2xx 回傳 `TourError::HttpStatus`
    pub async fn get_checked(&self, url: &str) -> Result<FetchedBody> {
        let fetched = self.get(url).await?;
        if !fetched.is_success() {
            tracing::warn!("⚠️ {} responded with {}", url, fetched.status);
            return Err(TourError::HttpStatus {
                status: fetched.status,
                url: url.to_string(),
            });
        }
        Ok(fetched)
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        Ok(self.get_checked(url).await?.text())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let fetched = self.get_checked(url).await?;
        Ok(serde_json::from_slice(&fetched.body)?)
    }
}
