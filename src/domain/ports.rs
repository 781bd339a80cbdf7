use async_trait::async_trait;
use bytes::Bytes;
use hyper::{Request, Response};
use std::time::Duration;

/// HTTP handler port. Bodies are fully buffered before dispatch so handlers
/// can be called directly in tests without a socket.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn serve(&self, req: Request<Bytes>) -> Response<Bytes>;
}

pub trait ConfigProvider: Send + Sync {
    fn server_addr(&self) -> &str;
    fn files_root(&self) -> Option<&str>;
    fn process_timeout(&self) -> Option<Duration>;
    fn verbose(&self) -> bool;
}
