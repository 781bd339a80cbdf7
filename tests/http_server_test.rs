use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use stdlib_tour::adapters::http_server;
use stdlib_tour::adapters::router::{CountHandler, FileServer, HomeHandler, NotFoundHandler, StripPrefix, TextHandler};
use stdlib_tour::{HttpClient, Router, TestServer};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// 測試 server 回應 handler 的內容
#[tokio::test]
async fn test_server_hello_client() -> Result<()> {
    let server = TestServer::start(Router::new().route("/", TextHandler::new("Hello, client\n"))).await?;

    let client = HttpClient::new();
    let fetched = client.get(&server.url()).await?;

    assert_eq!(fetched.status, 200);
    assert_eq!(fetched.text(), "Hello, client\n");
    assert_eq!(fetched.content_type.as_deref(), Some("text/plain; charset=utf-8"));

    server.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_count_handler_over_http() -> Result<()> {
    let server = TestServer::start(Router::new().route("/count", CountHandler::default())).await?;
    let client = HttpClient::new();
    let url = format!("{}/count", server.url());

    assert_eq!(client.get_text(&url).await?, "count is 1\n");
    assert_eq!(client.get_text(&url).await?, "count is 2\n");
    assert_eq!(client.get_text(&url).await?, "count is 3\n");

    server.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_mux_routes_and_not_found() -> Result<()> {
    let router = Router::new()
        .route("/", HomeHandler::new("Welcome to the home page!"))
        .route("/resources", NotFoundHandler)
        .route("/resources/people/", TextHandler::new("This is the people handler.\n"));
    let server = TestServer::start(router).await?;
    let client = HttpClient::new();

    let home = client.get(&format!("{}/", server.url())).await?;
    assert_eq!(home.text(), "Welcome to the home page!");

    let people = client.get(&format!("{}/resources/people/bob", server.url())).await?;
    assert_eq!(people.status, 200);
    assert_eq!(people.text(), "This is the people handler.\n");

    let missing = client.get(&format!("{}/resources", server.url())).await?;
    assert_eq!(missing.status, 404);
    assert_eq!(missing.text(), "404 page not found\n");

    let elsewhere = client.get(&format!("{}/nowhere", server.url())).await?;
    assert_eq!(elsewhere.status, 404);

    server.close().await?;
    Ok(())
}

/// 非 2xx 由 get_checked 轉成 HttpStatus 錯誤
#[tokio::test]
async fn test_get_checked_reports_status() -> Result<()> {
    let server = TestServer::start(Router::new().route("/resources", NotFoundHandler)).await?;
    let client = HttpClient::new();

    let err = client
        .get_checked(&format!("{}/resources", server.url()))
        .await
        .unwrap_err();
    assert!(matches!(err, stdlib_tour::TourError::HttpStatus { status: 404, .. }));

    server.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_file_server_under_stripped_prefix() -> Result<()> {
    let dir = TempDir::new()?;
    std::fs::write(dir.path().join("notes.txt"), "some notes\n")?;
    std::fs::write(dir.path().join("index.html"), "<html><body>index</body></html>")?;

    let router = Router::new().route(
        "/tmpfiles/",
        StripPrefix::new("/tmpfiles/", FileServer::new(dir.path())),
    );
    let server = TestServer::start(router).await?;
    let client = HttpClient::new();

    let notes = client.get(&format!("{}/tmpfiles/notes.txt", server.url())).await?;
    assert_eq!(notes.status, 200);
    assert_eq!(notes.text(), "some notes\n");

    // 目錄有 index.html 時直接回傳
    let index = client.get(&format!("{}/tmpfiles/", server.url())).await?;
    assert_eq!(index.content_type.as_deref(), Some("text/html; charset=utf-8"));
    assert_eq!(index.text(), "<html><body>index</body></html>");

    // 少了結尾斜線會被導向子樹，reqwest 會自動跟隨
    let redirected = client.get(&format!("{}/tmpfiles", server.url())).await?;
    assert_eq!(redirected.status, 200);
    assert_eq!(redirected.text(), "<html><body>index</body></html>");

    server.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_post_body_reaches_handler() -> Result<()> {
    use async_trait::async_trait;
    use bytes::Bytes;
    use hyper::{Request, Response};
    use stdlib_tour::core::Handler;

    struct Echo;

    #[async_trait]
    impl Handler for Echo {
        async fn serve(&self, req: Request<Bytes>) -> Response<Bytes> {
            Response::new(req.into_body())
        }
    }

    let server = TestServer::start(Router::new().route("/echo", Echo)).await?;
    let body = reqwest::Client::new()
        .post(format!("{}/echo", server.url()))
        .body("ping payload")
        .send()
        .await?
        .text()
        .await?;
    assert_eq!(body, "ping payload");

    server.close().await?;
    Ok(())
}

/// shutdown 觸發後停止接受新連線，serve 正常結束
#[tokio::test]
async fn test_graceful_shutdown_stops_accepting() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, rx) = oneshot::channel::<()>();

    let router = Arc::new(Router::new().route("/hello", TextHandler::new("Hello, world!\n")));
    let handle = tokio::spawn(http_server::serve(listener, router, async move {
        let _ = rx.await;
    }));

    let client = HttpClient::new().with_timeout(Duration::from_secs(5));
    let url = format!("http://{}/hello", addr);
    assert_eq!(client.get_text(&url).await?, "Hello, world!\n");

    tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle).await???;

    // listener 已關閉，新的請求會失敗
    let fresh = HttpClient::new().with_timeout(Duration::from_secs(2));
    assert!(fresh.get(&url).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_dropping_test_server_shuts_it_down() -> Result<()> {
    let server = TestServer::start(Router::new().route("/", TextHandler::new("bye\n"))).await?;
    let url = server.url();
    drop(server);

    // 給背景 task 一點時間關閉 listener
    tokio::time::sleep(Duration::from_millis(200)).await;
    let client = HttpClient::new().with_timeout(Duration::from_secs(2));
    assert!(client.get(&url).await.is_err());
    Ok(())
}

/// 壞掉的請求只影響那條連線，server 仍繼續服務
#[tokio::test]
async fn test_malformed_request_does_not_stop_server() -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let server = TestServer::start(Router::new().route("/hello", TextHandler::new("Hello, world!\n"))).await?;

    let mut raw = tokio::net::TcpStream::connect(server.addr()).await?;
    raw.write_all(b"NOT AN HTTP REQUEST\r\n\r\n").await?;
    let mut reply = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), raw.read_to_end(&mut reply)).await??;
    assert!(String::from_utf8_lossy(&reply).starts_with("HTTP/1.1 400"));

    let client = HttpClient::new();
    assert_eq!(client.get_text(&format!("{}/hello", server.url())).await?, "Hello, world!\n");

    server.close().await?;
    Ok(())
}
