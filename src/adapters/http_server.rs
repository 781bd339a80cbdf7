use crate::adapters::router::{response, Router};
use crate::utils::error::{Result, TourError};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// 先把 body 讀完再交給 router
async fn dispatch(
    router: Arc<Router>,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::warn!("⚠️ Failed to read request body: {}", TourError::from(e));
            let resp = response(StatusCode::BAD_REQUEST, Some("text/plain; charset=utf-8"), "bad request body\n");
            return Ok(resp.map(Full::new));
        }
    };

    let resp = router.handle(Request::from_parts(parts, body)).await;
    Ok(resp.map(Full::new))
}

pub async fn bind(addr: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("🌐 Listening on http://{}", listener.local_addr()?);
    Ok(listener)
}

/// accept 失敗後等多久再試
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// EMFILE 這類錯誤會一直重複，稍等一下避免空轉
async fn accept_failed(e: &io::Error) {
    tracing::warn!("⚠️ Failed to accept connection: {}; retrying in {:?}", e, ACCEPT_RETRY_DELAY);
    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
}

/// 每條連線一個 task。`shutdown` 完成後停止 accept，並等進行中的連線處理完
pub async fn serve<F>(listener: TcpListener, router: Arc<Router>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    let graceful = GracefulShutdown::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (tcp, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        accept_failed(&e).await;
                        continue;
                    }
                };

                let io = TokioIo::new(tcp);
                let router = router.clone();
                let conn = http1::Builder::new()
                    .timer(TokioTimer::new())
                    .serve_connection(io, service_fn(move |req| dispatch(router.clone(), req)));
                let conn = graceful.watch(conn);

                tokio::spawn(async move {
                    if let Err(err) = conn.await {
                        let err = TourError::from(err);
                        tracing::debug!("Error serving connection from {}: {}", peer, err);
                    }
                });
            }
            _ = &mut shutdown => {
                tracing::info!("🛑 Shutdown requested, waiting for open connections");
                break;
            }
        }
    }

    drop(listener);
    graceful.shutdown().await;
    tracing::info!("✅ Server stopped");
    Ok(())
}

/// 綁在 `127.0.0.1` 隨機 port 的測試用 server，`close()` 或 drop 時關閉
pub struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<Result<()>>>,
}

impl TestServer {
    pub async fn start(router: Router) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (tx, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(serve(listener, Arc::new(router), async move {
            // sender 被 drop 也視為關閉
            let _ = rx.await;
        }));

        tracing::debug!("Test server listening on {}", addr);
        Ok(Self {
            addr,
            shutdown: Some(tx),
            handle: Some(handle),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// 關閉並等 server task 結束
    pub async fn close(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.handle.take() {
            Some(handle) => handle
                .await
                .map_err(|e| TourError::IoError(std::io::Error::other(e)))?,
            None => Ok(()),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
