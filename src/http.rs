use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::error::SimError;

/// Document served for `/`.
pub const INDEX_DOCUMENT: &str = "index.html";

/// Produces the JSON body of a registered key.
pub type Producer = Arc<dyn Fn() -> serde_json::Result<Vec<u8>> + Send + Sync>;

/// GET/HEAD responder: registered JSON keys first, then static files.
pub struct StatusPublisher {
    keys: BTreeMap<String, Producer>,
    www_root: PathBuf,
}

/// Running publisher. Stopping (or dropping) it joins the worker thread.
pub struct PublisherHandle {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<std::io::Result<()>>>,
}

impl StatusPublisher {
    pub fn new(www_root: impl Into<PathBuf>) -> Self {
        Self {
            keys: BTreeMap::new(),
            www_root: www_root.into(),
        }
    }

    /// Serve `producer()` as JSON at `/<key>`, shadowing any file of that name.
    pub fn register_key<F, T>(&mut self, key: impl Into<String>, producer: F)
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Serialize,
    {
        let producer: Producer = Arc::new(move || serde_json::to_vec(&producer()));
        self.keys.insert(key.into(), producer);
    }

    pub fn router(self) -> Router {
        Router::new().fallback(dispatch).with_state(Arc::new(self))
    }

    /// Binds `addr` and serves from a background thread.
    ///
    /// The listener is bound before this returns, so a browser opened right
    /// afterwards will connect.
    pub fn start(self, addr: SocketAddr) -> Result<PublisherHandle, SimError> {
        let listener = std::net::TcpListener::bind(addr).map_err(|source| SimError::Bind {
            what: "HTTP",
            addr,
            source,
        })?;
        listener.set_nonblocking(true).map_err(SimError::Http)?;
        let local_addr = listener.local_addr().map_err(SimError::Http)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SimError::Http)?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = self.router();

        let thread = thread::Builder::new()
            .name("ledsim-http".into())
            .spawn(move || {
                runtime.block_on(async move {
                    let listener = tokio::net::TcpListener::from_std(listener)?;
                    log::info!("HTTP server listening on http://{local_addr}/");
                    axum::serve(listener, app)
                        .with_graceful_shutdown(async move {
                            let _ = shutdown_rx.await;
                        })
                        .await
                })
            })
            .map_err(SimError::Http)?;

        Ok(PublisherHandle {
            local_addr,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    async fn get(&self, path: &str) -> Response {
        let key = path.strip_prefix('/').unwrap_or(path);
        if let Some(producer) = self.keys.get(key) {
            return match producer() {
                Ok(body) => ([(CONTENT_TYPE, "application/json")], body).into_response(),
                Err(e) => {
                    log::error!("cannot serialize /{key}: {e}");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            };
        }

        let relative = if key.is_empty() {
            log::info!("Main page opened");
            INDEX_DOCUMENT
        } else {
            key
        };
        let Some(file) = self.asset_path(relative) else {
            return StatusCode::NOT_FOUND.into_response();
        };

        match tokio::fs::read(&file).await {
            Ok(bytes) => ([(CONTENT_TYPE, content_type(&file))], bytes).into_response(),
            Err(e) => {
                log::debug!("{}: {e}", file.display());
                StatusCode::NOT_FOUND.into_response()
            }
        }
    }

    /// Resolves a request path under the asset root, refusing anything that
    /// could step outside it.
    fn asset_path(&self, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative);
        relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
            .then(|| self.www_root.join(relative))
    }
}

async fn dispatch(
    State(publisher): State<Arc<StatusPublisher>>,
    method: Method,
    uri: Uri,
) -> Response {
    match method {
        // Any path, always HTML, never a body.
        Method::HEAD => (StatusCode::OK, [(CONTENT_TYPE, "text/html")]).into_response(),
        Method::GET => publisher.get(uri.path()).await,
        _ => StatusCode::NOT_IMPLEMENTED.into_response(),
    }
}

pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html",
        Some("js") => "text/javascript",
        Some("css") => "text/css",
        _ => "application/octet-stream",
    }
}

impl PublisherHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Signals the accept loop and waits for the worker thread to exit.
    pub fn stop(mut self) -> Result<(), SimError> {
        self.shutdown_and_join()
    }

    fn shutdown_and_join(&mut self) -> Result<(), SimError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        match thread.join() {
            Ok(result) => {
                log::info!("HTTP server stopped");
                result.map_err(SimError::Http)
            }
            Err(_) => Err(SimError::Fatal("HTTP worker panicked".into())),
        }
    }
}

impl Drop for PublisherHandle {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown_and_join() {
            log::error!("{e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn www_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("www")
    }

    fn publisher() -> StatusPublisher {
        let mut publisher = StatusPublisher::new(www_root());
        publisher.register_key("data", || serde_json::json!({"data_updates": 3}));
        publisher
    }

    async fn send(
        router: Router,
        method: Method,
        uri: &str,
    ) -> (StatusCode, Option<String>, Vec<u8>) {
        let response = router
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, body.to_vec())
    }

    #[tokio::test]
    async fn test_registered_key_returns_json() {
        let (status, ct, body) = send(publisher().router(), Method::GET, "/data").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ct.as_deref(), Some("application/json"));
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"data_updates": 3}));
    }

    #[tokio::test]
    async fn test_producer_runs_per_request() {
        use std::sync::atomic::{AtomicU64, Ordering};

        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        let mut publisher = StatusPublisher::new(www_root());
        publisher.register_key("count", move || counter.fetch_add(1, Ordering::SeqCst) + 1);
        let router = publisher.router();

        let (_, _, first) = send(router.clone(), Method::GET, "/count").await;
        let (_, _, second) = send(router, Method::GET, "/count").await;
        assert_eq!(first, b"1");
        assert_eq!(second, b"2");
    }

    #[tokio::test]
    async fn test_keys_shadow_static_files() {
        let mut publisher = publisher();
        publisher.register_key("style.css", || "shadowed");
        let (status, ct, body) = send(publisher.router(), Method::GET, "/style.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ct.as_deref(), Some("application/json"));
        assert_eq!(body, b"\"shadowed\"");
    }

    #[tokio::test]
    async fn test_static_css() {
        let (status, ct, body) = send(publisher().router(), Method::GET, "/style.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ct.as_deref(), Some("text/css"));
        assert_eq!(body, std::fs::read(www_root().join("style.css")).unwrap());
    }

    #[tokio::test]
    async fn test_root_serves_index() {
        let (status, ct, body) = send(publisher().router(), Method::GET, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ct.as_deref(), Some("text/html"));
        assert_eq!(body, std::fs::read(www_root().join(INDEX_DOCUMENT)).unwrap());
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_404() {
        let (status, _, body) = send(publisher().router(), Method::GET, "/nonexistent").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_directory_is_404() {
        let publisher = StatusPublisher::new(env!("CARGO_MANIFEST_DIR"));
        let (status, _, _) = send(publisher.router(), Method::GET, "/src").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_parent_paths_are_refused() {
        for uri in ["/../Cargo.toml", "/a/../../Cargo.toml"] {
            let (status, _, body) = send(publisher().router(), Method::GET, uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert!(body.is_empty());
        }
    }

    #[tokio::test]
    async fn test_head_is_html_for_any_path() {
        for uri in ["/", "/data", "/style.css", "/nonexistent"] {
            let (status, ct, body) = send(publisher().router(), Method::HEAD, uri).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(ct.as_deref(), Some("text/html"));
            assert!(body.is_empty());
        }
    }

    #[tokio::test]
    async fn test_other_methods_not_implemented() {
        let (status, _, _) = send(publisher().router(), Method::POST, "/data").await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    }

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(content_type(Path::new("www/index.html")), "text/html");
        assert_eq!(content_type(Path::new("www/visualizer.js")), "text/javascript");
        assert_eq!(content_type(Path::new("www/style.css")), "text/css");
        assert_eq!(content_type(Path::new("www/favicon.ico")), "application/octet-stream");
        assert_eq!(content_type(Path::new("www/README")), "application/octet-stream");
    }

    #[test]
    fn test_start_and_stop() {
        let handle = publisher().start("127.0.0.1:0".parse().unwrap()).unwrap();
        assert_ne!(handle.local_addr().port(), 0);
        handle.stop().unwrap();
    }
}
