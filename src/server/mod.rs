//! Blog server: pre-rendered pages, on-demand rendering and preview mode

mod store;

use anyhow::Result;
use axum::{
    extract::{self, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use store::{CachedPage, Miss, PageStore, MAX_MISSES};

use crate::generator::Generator;
use crate::helpers::{post_path, safe_return_path};
use crate::preview::{resolve_preview, PreviewData, PreviewSession};
use crate::prismic::ContentApi;
use crate::Spacetraveling;

/// How long a failed on-demand render is reported before it is retried
const FAILURE_TTL: Duration = Duration::from_secs(10);

/// Shared server state
pub struct AppState<C> {
    generator: Generator<C>,
    store: PageStore,
    preview: PreviewSession,
}

/// A page the store knows how to (re)render
#[derive(Debug, Clone)]
enum Target {
    Home,
    Post(String),
}

impl Target {
    fn path(&self) -> String {
        match self {
            Target::Home => "/".to_string(),
            Target::Post(slug) => post_path(slug),
        }
    }
}

impl<C: ContentApi> AppState<C> {
    pub fn new(generator: Generator<C>, preview: PreviewSession) -> Self {
        Self {
            generator,
            store: PageStore::new(),
            preview,
        }
    }

    /// Render the home page and the pre-rendered posts into the store
    pub async fn prime(&self) -> Result<usize> {
        self.refresh(&Target::Home).await?;
        for slug in self.generator.static_paths().await? {
            self.refresh(&Target::Post(slug)).await?;
        }
        Ok(self.store.len().await)
    }

    /// Render `target` without preview and store the result
    ///
    /// Unknown slugs are not stored as pages; they are remembered as a miss
    /// for one revalidation period in case the post gets published.
    async fn refresh(&self, target: &Target) -> Result<CachedPage> {
        let revalidate = self.generator.config().revalidate_after();
        let path = target.path();
        let (html, expires) = match target {
            Target::Home => {
                let home = self.generator.home_page().await?;
                (self.generator.render_home(&home)?, Some(revalidate))
            }
            Target::Post(slug) => match self.generator.post_page(slug, None).await? {
                Some(page) => (self.generator.render_post(&page)?, None),
                None => {
                    tracing::debug!("Nothing to render at {}", path);
                    self.store.record_miss(path, Miss::NotFound, revalidate).await;
                    return Ok(CachedPage {
                        status: StatusCode::NOT_FOUND,
                        html: self.generator.render_not_found()?,
                        stale: false,
                    });
                }
            },
        };

        tracing::debug!("Rendered {}", path);
        self.store.insert(path, StatusCode::OK, html.clone(), expires).await;

        Ok(CachedPage {
            status: StatusCode::OK,
            html,
            stale: false,
        })
    }

    /// Render `target` in the background unless a render is already running
    fn spawn_refresh(self: &Arc<Self>, target: Target) {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            let path = target.path();
            if !state.store.begin(&path).await {
                return;
            }
            if let Err(e) = state.refresh(&target).await {
                tracing::error!("Failed to render {}: {:#}", path, e);
                state.store.record_miss(&path, Miss::Failed, FAILURE_TTL).await;
            }
            state.store.finish(&path).await;
        });
    }
}

/// Build the router
pub fn router<C: ContentApi>(state: Arc<AppState<C>>, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(home::<C>))
        .route("/post/:slug", get(post::<C>))
        .route("/api/preview", get(enter_preview::<C>))
        .route("/api/exit-preview", get(exit_preview::<C>))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(app: &Spacetraveling, ip: &str, port: u16) -> Result<()> {
    let generator = app.generator()?;
    let preview = app.preview_session()?;
    let state = Arc::new(AppState::new(generator, preview));

    let primed = state.prime().await?;
    tracing::info!("Pre-rendered {} pages", primed);

    let router = router(state, &app.static_dir);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

async fn home<C: ContentApi>(State(state): State<Arc<AppState<C>>>) -> Response {
    if let Some(page) = state.store.get("/").await {
        if page.stale {
            state.spawn_refresh(Target::Home);
        }
        return page.into_response();
    }

    match state.refresh(&Target::Home).await {
        Ok(page) => page.into_response(),
        Err(e) => server_error(e),
    }
}

async fn post<C: ContentApi>(
    State(state): State<Arc<AppState<C>>>,
    extract::Path(slug): extract::Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Some(preview) = state.preview.read(&headers) {
        return render_preview_post(&state, &slug, &preview).await;
    }

    let target = Target::Post(slug);
    let path = target.path();
    if let Some(page) = state.store.get(&path).await {
        if page.stale {
            state.spawn_refresh(target);
        }
        return page.into_response();
    }

    match state.store.miss(&path).await {
        Some(Miss::NotFound) => {
            return match state.generator.render_not_found() {
                Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
                Err(e) => server_error(e),
            };
        }
        Some(Miss::Failed) => {
            return server_error(anyhow::anyhow!("Rendering {} failed recently", path));
        }
        None => {}
    }

    state.spawn_refresh(target);
    match state.generator.render_loading() {
        Ok(html) => Html(html).into_response(),
        Err(e) => server_error(e),
    }
}

/// Preview renders always hit the API and are never stored
async fn render_preview_post<C: ContentApi>(
    state: &AppState<C>,
    slug: &str,
    preview: &PreviewData,
) -> Response {
    let rendered = match state
        .generator
        .post_page(slug, Some(&preview.reference))
        .await
    {
        Ok(Some(page)) => state
            .generator
            .render_post(&page)
            .map(|html| (StatusCode::OK, html)),
        Ok(None) => state
            .generator
            .render_not_found()
            .map(|html| (StatusCode::NOT_FOUND, html)),
        Err(e) => Err(e),
    };

    match rendered {
        Ok((status, html)) => (status, Html(html)).into_response(),
        Err(e) => server_error(e),
    }
}

#[derive(Debug, Deserialize)]
struct PreviewParams {
    token: Option<String>,
    #[serde(rename = "documentId")]
    document_id: Option<String>,
}

async fn enter_preview<C: ContentApi>(
    State(state): State<Arc<AppState<C>>>,
    Query(params): Query<PreviewParams>,
) -> Response {
    let Some(token) = params.token.filter(|token| !token.is_empty()) else {
        return invalid_token();
    };

    let path = match resolve_preview(state.generator.api(), &token, params.document_id.as_deref()).await
    {
        Ok(Some(path)) => path,
        Ok(None) => return invalid_token(),
        Err(e) => return server_error(e.into()),
    };

    match preview_redirect(&state, token, &path) {
        Ok(response) => response,
        Err(e) => server_error(e),
    }
}

/// Set the preview cookie and send the browser to `path`
fn preview_redirect<C: ContentApi>(state: &AppState<C>, token: String, path: &str) -> Result<Response> {
    let cookie = state.preview.set_cookie(&PreviewData { reference: token })?;
    let html = state.generator.render_preview_redirect(path)?;
    tracing::info!("Entering preview mode, redirecting to {}", path);
    Ok(([(header::SET_COOKIE, cookie)], Html(html)).into_response())
}

#[derive(Debug, Deserialize)]
struct ExitPreviewParams {
    #[serde(rename = "currentUrl")]
    current_url: Option<String>,
}

async fn exit_preview<C: ContentApi>(
    State(state): State<Arc<AppState<C>>>,
    Query(params): Query<ExitPreviewParams>,
) -> Response {
    let target = safe_return_path(params.current_url.as_deref());
    (
        [(header::SET_COOKIE, state.preview.clear_cookie())],
        Redirect::temporary(&target),
    )
        .into_response()
}

fn invalid_token() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Invalid token" })),
    )
        .into_response()
}

fn server_error(e: anyhow::Error) -> Response {
    tracing::error!("Request failed: {:#}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}

impl IntoResponse for CachedPage {
    fn into_response(self) -> Response {
        (self.status, Html(self.html)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::prismic::testing::{sample_posts, FakeApi};
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    fn state(api: FakeApi) -> Arc<AppState<FakeApi>> {
        let mut config = SiteConfig::default();
        config.timezone = "UTC".to_string();
        let generator = Generator::new(Arc::new(api), config).unwrap();
        let preview = PreviewSession::new("preview", b"secret").unwrap();
        Arc::new(AppState::new(generator, preview))
    }

    fn app(state: &Arc<AppState<FakeApi>>) -> Router {
        router(Arc::clone(state), Path::new("does-not-exist"))
    }

    async fn get(router: &Router, uri: &str, cookie: Option<&str>) -> (StatusCode, HeaderMap, String) {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let response = router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn wait_for(state: &AppState<FakeApi>, path: &str) -> CachedPage {
        for _ in 0..200 {
            if let Some(page) = state.store.get(path).await {
                return page;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("{} was never rendered", path);
    }

    async fn wait_for_miss(state: &AppState<FakeApi>, path: &str) -> Miss {
        for _ in 0..200 {
            if let Some(miss) = state.store.miss(path).await {
                return miss;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("{} never settled", path);
    }

    fn set_cookie(headers: &HeaderMap) -> String {
        headers
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_prime_renders_static_paths() {
        let state = state(FakeApi::new(sample_posts()));
        // home + three posts
        assert_eq!(state.prime().await.unwrap(), 4);

        let (status, _, body) = get(&app(&state), "/post/second-post", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Second post | spacetraveling"));
    }

    #[tokio::test]
    async fn test_home_renders_and_is_stored() {
        let state = state(FakeApi::new(sample_posts()));
        let (status, _, body) = get(&app(&state), "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("First post"));
        assert!(body.contains("Carregar mais posts"));
        assert!(state.store.get("/").await.is_some());
    }

    #[tokio::test]
    async fn test_stale_home_is_served_then_regenerated() {
        let state = state(FakeApi::new(sample_posts()));
        state
            .store
            .insert("/", StatusCode::OK, "old".to_string(), Some(Duration::ZERO))
            .await;

        let (_, _, body) = get(&app(&state), "/", None).await;
        assert_eq!(body, "old");

        for _ in 0..200 {
            if state.store.get("/").await.unwrap().html != "old" {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("home page was never regenerated");
    }

    #[tokio::test]
    async fn test_home_upstream_failure() {
        let state = state(FakeApi::new(sample_posts()).rejecting_queries());
        let (status, _, _) = get(&app(&state), "/", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_post_on_demand_shows_loading_first() {
        let state = state(FakeApi::new(sample_posts()));
        let router = app(&state);

        let (status, _, body) = get(&router, "/post/third-post", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Carregando..."));

        let page = wait_for(&state, "/post/third-post").await;
        assert_eq!(page.status, StatusCode::OK);

        let (_, _, body) = get(&router, "/post/third-post", None).await;
        assert!(body.contains("Third post | spacetraveling"));
    }

    #[tokio::test]
    async fn test_unknown_post_becomes_not_found() {
        let state = state(FakeApi::new(sample_posts()));
        let router = app(&state);

        get(&router, "/post/nope", None).await;
        assert_eq!(wait_for_miss(&state, "/post/nope").await, Miss::NotFound);

        let (status, _, body) = get(&router, "/post/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Post não encontrado"));
        assert_eq!(state.store.len().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_slugs_do_not_grow_the_store() {
        let state = state(FakeApi::new(sample_posts()));
        let router = app(&state);

        for i in 0..50 {
            let path = format!("/post/junk-{}", i);
            get(&router, &path, None).await;
            wait_for_miss(&state, &path).await;
        }
        assert_eq!(state.store.len().await, 0);
        assert!(state.store.miss_count().await <= MAX_MISSES);
    }

    #[tokio::test]
    async fn test_on_demand_failure_returns_error() {
        let state = state(FakeApi::new(sample_posts()).rejecting_queries());
        let router = app(&state);

        let (status, _, body) = get(&router, "/post/first-post", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Carregando..."));
        assert_eq!(wait_for_miss(&state, "/post/first-post").await, Miss::Failed);

        let (status, _, body) = get(&router, "/post/first-post", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("Carregando..."));
        assert_eq!(state.store.len().await, 0);
    }

    #[tokio::test]
    async fn test_preview_requires_token() {
        let state = state(FakeApi::new(sample_posts()).with_ref("preview-ref"));
        let router = app(&state);

        for uri in ["/api/preview", "/api/preview?token=bogus&documentId=B2"] {
            let (status, headers, body) = get(&router, uri, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert!(headers.get(header::SET_COOKIE).is_none());
            let body: serde_json::Value = serde_json::from_str(&body).unwrap();
            assert_eq!(body, json!({ "message": "Invalid token" }));
        }
    }

    #[tokio::test]
    async fn test_preview_flow() {
        let state = state(FakeApi::new(sample_posts()).with_ref("preview-ref"));
        let router = app(&state);

        let (status, headers, body) =
            get(&router, "/api/preview?token=preview-ref&documentId=B2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/post/second-post"));
        let cookie = set_cookie(&headers);
        assert!(cookie.starts_with("preview="));

        let cookie = cookie.split(';').next().unwrap().to_string();
        let (status, _, body) = get(&router, "/post/second-post", Some(&cookie)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Sair do modo Preview"));
        assert!(state.store.get("/post/second-post").await.is_none());

        let (status, _, _) = get(&router, "/post/nope", Some(&cookie)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_preview_without_document_goes_home() {
        let state = state(FakeApi::new(sample_posts()).with_ref("preview-ref"));
        let (status, _, body) = get(&app(&state), "/api/preview?token=preview-ref", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"window.location.href = "/";"#));
    }

    #[tokio::test]
    async fn test_exit_preview() {
        let state = state(FakeApi::new(sample_posts()));
        let router = app(&state);

        let cases = [
            ("/api/exit-preview", "/"),
            ("/api/exit-preview?currentUrl=%2Fpost%2Fsecond-post", "/post/second-post"),
            ("/api/exit-preview?currentUrl=https%3A%2F%2Fevil.example", "/"),
            ("/api/exit-preview?currentUrl=%2F%2Fevil.example", "/"),
        ];
        for (uri, location) in cases {
            let (status, headers, _) = get(&router, uri, None).await;
            assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
            assert_eq!(headers.get(header::LOCATION).unwrap(), location);
            assert!(set_cookie(&headers).contains("Max-Age=0"));
        }
    }

    #[tokio::test]
    async fn test_static_assets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("css/style.css"), "body {}").unwrap();

        let state = state(FakeApi::new(sample_posts()));
        let router = router(Arc::clone(&state), dir.path());

        let (status, _, body) = get(&router, "/css/style.css", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "body {}");

        let (status, _, _) = get(&router, "/missing.png", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
