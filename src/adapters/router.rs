use crate::domain::ports::Handler;
use async_trait::async_trait;
use bytes::Bytes;
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE, LOCATION};
use hyper::http::uri::PathAndQuery;
use hyper::{Method, Request, Response, StatusCode, Uri};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";

pub fn response(status: StatusCode, content_type: Option<&'static str>, body: impl Into<Bytes>) -> Response<Bytes> {
    let mut resp = Response::new(body.into());
    *resp.status_mut() = status;
    if let Some(content_type) = content_type {
        resp.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    resp
}

pub fn not_found() -> Response<Bytes> {
    response(StatusCode::NOT_FOUND, Some(TEXT_PLAIN), "404 page not found\n")
}

fn redirect(location: &str) -> Response<Bytes> {
    let mut resp = response(StatusCode::MOVED_PERMANENTLY, None, Bytes::new());
    if let Ok(value) = HeaderValue::from_str(location) {
        resp.headers_mut().insert(LOCATION, value);
    }
    resp
}

/// 依 body 前幾個位元組推測 Content-Type
pub fn detect_content_type(body: &[u8]) -> &'static str {
    const HTML_TAGS: [&[u8]; 17] = [
        b"<!DOCTYPE HTML",
        b"<HTML",
        b"<HEAD",
        b"<SCRIPT",
        b"<IFRAME",
        b"<H1",
        b"<DIV",
        b"<FONT",
        b"<TABLE",
        b"<A",
        b"<STYLE",
        b"<TITLE",
        b"<B",
        b"<BODY",
        b"<BR",
        b"<P",
        b"<!--",
    ];

    let head = &body[..body.len().min(512)];
    let start = head
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' '))
        .unwrap_or(head.len());
    let trimmed = &head[start..];

    for tag in HTML_TAGS {
        if trimmed.len() > tag.len()
            && trimmed[..tag.len()].eq_ignore_ascii_case(tag)
            && matches!(trimmed[tag.len()], b' ' | b'>')
        {
            return TEXT_HTML;
        }
    }

    let binary = head
        .iter()
        .any(|&b| b <= 0x08 || b == 0x0b || (0x0e..=0x1a).contains(&b) || (0x1c..=0x1f).contains(&b));
    // 512 位元組的窗口可能切在多位元組字元中間，結尾不完整不算錯
    let utf8 = match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    };
    if !binary && utf8 {
        TEXT_PLAIN
    } else {
        OCTET_STREAM
    }
}

struct Route {
    pattern: String,
    handler: Arc<dyn Handler>,
}

impl Route {
    fn is_subtree(&self) -> bool {
        self.pattern.ends_with('/')
    }

    fn matches(&self, path: &str) -> bool {
        if self.is_subtree() {
            path.starts_with(&self.pattern)
        } else {
            path == self.pattern
        }
    }
}

/// 路徑多工器。
///
/// 以 `/` 結尾的 pattern 代表整個子樹（`/api/` 會接 `/api/users`），其他 pattern
/// 只接完全相同的路徑。多個 pattern 都符合時取最長的那個，所以 `/` 會接住其他
/// pattern 沒處理的所有路徑。
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, pattern: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.add(pattern, Arc::new(handler));
        self
    }

    /// 同一個 handler 掛在多個 pattern 時使用
    pub fn route_shared(mut self, pattern: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        self.add(pattern, handler);
        self
    }

    fn add(&mut self, pattern: impl Into<String>, handler: Arc<dyn Handler>) {
        let pattern = pattern.into();
        tracing::debug!("Registering route {}", pattern);
        // 重複註冊時後來的覆蓋前面的
        self.routes.retain(|r| r.pattern != pattern);
        self.routes.push(Route { pattern, handler });
    }

    fn lookup(&self, path: &str) -> Option<&Route> {
        self.routes
            .iter()
            .filter(|r| r.matches(path))
            .max_by_key(|r| r.pattern.len())
    }

    /// 不經過 socket 直接處理一個請求
    pub async fn handle(&self, req: Request<Bytes>) -> Response<Bytes> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        // `/tmpfiles` 只註冊了 `/tmpfiles/` 時導向子樹
        let mut resp = if let Some(location) = self.subtree_redirect(&path) {
            redirect(&location)
        } else {
            match self.lookup(&path) {
                Some(route) => route.handler.serve(req).await,
                None => not_found(),
            }
        };

        if !resp.headers().contains_key(CONTENT_TYPE) && !resp.body().is_empty() {
            let sniffed = detect_content_type(resp.body());
            resp.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(sniffed));
        }

        tracing::debug!("📥 {} {} -> {}", method, path, resp.status().as_u16());
        resp
    }

    fn subtree_redirect(&self, path: &str) -> Option<String> {
        let with_slash = format!("{}/", path);
        let exact = self.routes.iter().any(|r| r.pattern == path);
        let subtree = self.routes.iter().any(|r| r.pattern == with_slash);
        (!exact && subtree).then_some(with_slash)
    }
}

#[async_trait]
impl Handler for Router {
    async fn serve(&self, req: Request<Bytes>) -> Response<Bytes> {
        self.handle(req).await
    }
}

/// 固定回傳一段文字
pub struct TextHandler {
    body: Bytes,
}

impl TextHandler {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self { body: body.into() }
    }
}

#[async_trait]
impl Handler for TextHandler {
    async fn serve(&self, _req: Request<Bytes>) -> Response<Bytes> {
        response(StatusCode::OK, None, self.body.clone())
    }
}

/// 每次請求把計數加一
#[derive(Default)]
pub struct CountHandler {
    n: Mutex<u64>,
}

#[async_trait]
impl Handler for CountHandler {
    async fn serve(&self, _req: Request<Bytes>) -> Response<Bytes> {
        let n = {
            let mut guard = self.n.lock().unwrap_or_else(|e| e.into_inner());
            *guard += 1;
            *guard
        };
        response(StatusCode::OK, None, format!("count is {}\n", n))
    }
}

pub struct NotFoundHandler;

#[async_trait]
impl Handler for NotFoundHandler {
    async fn serve(&self, _req: Request<Bytes>) -> Response<Bytes> {
        not_found()
    }
}

/// `/` 的 pattern 會接住所有路徑，這裡只回應真正的根目錄
pub struct HomeHandler {
    message: Bytes,
}

impl HomeHandler {
    pub fn new(message: impl Into<Bytes>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Handler for HomeHandler {
    async fn serve(&self, req: Request<Bytes>) -> Response<Bytes> {
        if req.uri().path() != "/" {
            return not_found();
        }
        response(StatusCode::OK, None, self.message.clone())
    }
}

/// 去掉路徑前綴後交給下一個 handler，前綴不符就回 404
pub struct StripPrefix {
    prefix: String,
    inner: Arc<dyn Handler>,
}

impl StripPrefix {
    pub fn new(prefix: impl Into<String>, inner: impl Handler + 'static) -> Self {
        Self {
            prefix: prefix.into(),
            inner: Arc::new(inner),
        }
    }

    fn rewrite(&self, uri: &Uri) -> Option<Uri> {
        let rest = uri.path().strip_prefix(&self.prefix)?;
        let path = if rest.starts_with('/') {
            rest.to_string()
        } else {
            format!("/{}", rest)
        };
        let path_and_query = match uri.query() {
            Some(query) => format!("{}?{}", path, query),
            None => path,
        };

        let mut parts = uri.clone().into_parts();
        parts.path_and_query = Some(path_and_query.parse::<PathAndQuery>().ok()?);
        Uri::from_parts(parts).ok()
    }
}

#[async_trait]
impl Handler for StripPrefix {
    async fn serve(&self, mut req: Request<Bytes>) -> Response<Bytes> {
        match self.rewrite(req.uri()) {
            Some(uri) => {
                *req.uri_mut() = uri;
                self.inner.serve(req).await
            }
            None => not_found(),
        }
    }
}

/// 提供某個目錄底下的檔案，路徑無法跳出根目錄
pub struct FileServer {
    root: PathBuf,
}

impl FileServer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 把 URL 路徑轉成根目錄底下的檔案路徑，含 `..` 或 NUL 的一律拒絕
    fn resolve(&self, url_path: &str) -> Option<PathBuf> {
        if url_path.contains('\0') || url_path.contains('\\') {
            return None;
        }
        let raw = Path::new(url_path);
        if raw.components().any(|c| matches!(c, Component::ParentDir)) {
            return None;
        }

        let cleaned = path_clean::clean(format!("/{}", url_path));
        let relative = cleaned.strip_prefix("/").ok()?;
        Some(self.root.join(relative))
    }

    async fn list_dir(&self, dir: &Path) -> std::io::Result<String> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await?.is_dir() {
                name.push('/');
            }
            names.push(name);
        }
        names.sort();

        let mut listing = String::from("<pre>\n");
        for name in names {
            let escaped = html_escape(&name);
            listing.push_str(&format!("<a href=\"{}\">{}</a>\n", escaped, escaped));
        }
        listing.push_str("</pre>\n");
        Ok(listing)
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&#34;")
        .replace('\'', "&#39;")
}

fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let content_type = match ext.as_str() {
        "html" | "htm" => TEXT_HTML,
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" => TEXT_PLAIN,
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => return None,
    };
    Some(content_type)
}

#[async_trait]
impl Handler for FileServer {
    async fn serve(&self, req: Request<Bytes>) -> Response<Bytes> {
        if req.method() != Method::GET && req.method() != Method::HEAD {
            let mut resp = response(StatusCode::METHOD_NOT_ALLOWED, Some(TEXT_PLAIN), "Method Not Allowed\n");
            resp.headers_mut()
                .insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
            return resp;
        }

        let url_path = req.uri().path();
        let Some(mut target) = self.resolve(url_path) else {
            tracing::warn!("⚠️ Rejected path {}", url_path);
            return response(StatusCode::BAD_REQUEST, Some(TEXT_PLAIN), "invalid URL path\n");
        };

        let meta = match tokio::fs::metadata(&target).await {
            Ok(meta) => meta,
            Err(_) => return not_found(),
        };

        if meta.is_dir() {
            if !url_path.ends_with('/') {
                let base = url_path.rsplit('/').next().unwrap_or_default();
                return redirect(&format!("{}/", base));
            }
            let index = target.join("index.html");
            if tokio::fs::metadata(&index).await.map(|m| m.is_file()).unwrap_or(false) {
                target = index;
            } else {
                return match self.list_dir(&target).await {
                    Ok(listing) => response(StatusCode::OK, Some(TEXT_HTML), listing),
                    Err(e) => {
                        tracing::error!("❌ Failed to list {}: {}", target.display(), e);
                        response(StatusCode::INTERNAL_SERVER_ERROR, Some(TEXT_PLAIN), "500 Internal Server Error\n")
                    }
                };
            }
        }

        match tokio::fs::read(&target).await {
            Ok(contents) => response(StatusCode::OK, content_type_for(&target), contents),
            Err(e) => {
                tracing::debug!("Failed to read {}: {}", target.display(), e);
                not_found()
            }
        }
    }
}
