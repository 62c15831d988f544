use std::sync::{Arc, MutexGuard};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use log::info;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::DashboardConfig;
use crate::downloader::{self, XLSX_MIME};
use crate::error::DashboardError;
use crate::pipeline::{self, MapRequest};
use crate::session::{SessionContext, SessionStore, SharedSession};
use crate::view::{MapStyle, MapViewState, Page};

const SESSION_COOKIE: &str = "session";

pub struct AppState {
    config: DashboardConfig,
    sessions: SessionStore,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        let ttl = Duration::from_secs(config.session_ttl_secs);
        AppState {
            config,
            sessions: SessionStore::new(ttl),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    kind: &'static str,
    message: String,
}

#[derive(Serialize)]
struct SessionSummary {
    page: Page,
    view: MapViewState,
    style: MapStyle,
    selected_parameter: Option<String>,
    min_value: Option<f64>,
}

#[derive(Deserialize)]
struct ViewUpdate {
    lat: f64,
    lng: f64,
    zoom: f64,
}

#[derive(Deserialize)]
struct LookupQuery {
    cas: Option<String>,
}

#[derive(Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

#[derive(Deserialize)]
struct ExportQuery {
    parameter: Option<String>,
    #[serde(default)]
    format: ExportFormat,
}

/// Build the router with every page and API route
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(serve_home))
        .route("/map", get(serve_map))
        .route("/lookup", get(serve_lookup))
        .route("/assets/dashboard.css", get(serve_css))
        .route("/assets/dashboard.js", get(serve_js))
        .route("/api/session", get(get_session))
        .route("/api/session/end", post(end_session))
        .route("/api/parameters", get(get_parameters))
        .route("/api/map", get(get_map))
        .route("/api/view", post(update_view))
        .route("/api/view/reset", post(reset_view))
        .route("/api/reload", post(reload_tables))
        .route("/api/lookup", get(get_lookup))
        .route("/api/lookup/identifiers", get(get_identifiers))
        .route("/api/downloads", get(get_downloads))
        .route("/api/export", get(export_markers))
        .route("/download/:artifact", get(download_artifact))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

pub async fn run(config: DashboardConfig) -> anyhow::Result<()> {
    let bind = config.bind.clone();
    let app = router(Arc::new(AppState::new(config)));

    let listener = TcpListener::bind(&bind).await?;
    info!("Listening on http://{}", bind);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Resolve the session cookie, starting a new session when it is absent or
/// unknown.
fn open_session(state: &AppState, jar: CookieJar) -> (CookieJar, SharedSession) {
    let current = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let (id, session, created) = state.sessions.open(
        current.as_deref(),
        || Uuid::new_v4().to_string(),
        &state.config,
    );

    if created {
        let mut cookie = Cookie::new(SESSION_COOKIE, id);
        cookie.set_path("/");
        cookie.set_http_only(true);
        (jar.add(cookie), session)
    } else {
        (jar, session)
    }
}

fn lock(session: &SharedSession) -> MutexGuard<'_, SessionContext> {
    session.lock().unwrap_or_else(|e| e.into_inner())
}

fn error_response(err: DashboardError) -> Response {
    let status = match err {
        DashboardError::InvalidQuery => StatusCode::BAD_REQUEST,
        DashboardError::NotFound(_) | DashboardError::FileNotFound(_) => StatusCode::NOT_FOUND,
        DashboardError::MissingColumns(_) | DashboardError::ReadError(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    };
    (
        status,
        Json(ErrorResponse {
            status: "error",
            kind: err.kind(),
            message: err.to_string(),
        }),
    )
        .into_response()
}

fn json_or_error<T: Serialize>(result: Result<T, DashboardError>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(err) => error_response(err),
    }
}

fn render_page(template: &str, config: &DashboardConfig) -> Html<String> {
    let boot = serde_json::json!({ "title": config.title });
    Html(template.replace(
        "</head>",
        &format!("    <script>const DASHBOARD = {};</script>\n</head>", boot),
    ))
}

async fn navigate(state: Arc<AppState>, jar: CookieJar, page: Page, template: &str) -> Response {
    let (jar, session) = open_session(&state, jar);
    lock(&session).navigate(page);
    (jar, render_page(template, &state.config)).into_response()
}

async fn serve_home(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    navigate(state, jar, Page::Home, include_str!("./static/landing.html")).await
}

async fn serve_map(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    navigate(state, jar, Page::Map, include_str!("./static/map.html")).await
}

async fn serve_lookup(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    navigate(state, jar, Page::Lookup, include_str!("./static/lookup.html")).await
}

async fn serve_css() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        include_str!("./static/dashboard.css"),
    )
}

async fn serve_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        include_str!("./static/dashboard.js"),
    )
}

async fn get_session(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let (jar, session) = open_session(&state, jar);
    let ctx = lock(&session);
    let summary = SessionSummary {
        page: ctx.page,
        view: ctx.view,
        style: ctx.style,
        selected_parameter: ctx.selected_parameter.clone(),
        min_value: ctx.min_value,
    };
    (jar, Json(summary)).into_response()
}

async fn end_session(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.end(cookie.value());
    }
    let mut removal = Cookie::from(SESSION_COOKIE);
    removal.set_path("/");
    let jar = jar.remove(removal);
    (jar, StatusCode::NO_CONTENT).into_response()
}

async fn get_parameters(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let (jar, session) = open_session(&state, jar);
    let result = pipeline::parameters(&mut lock(&session), &state.config);
    (jar, json_or_error(result)).into_response()
}

async fn get_map(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(request): Query<MapRequest>,
) -> Response {
    let (jar, session) = open_session(&state, jar);
    let result = pipeline::render_map(&mut lock(&session), &state.config, &request);
    (jar, json_or_error(result)).into_response()
}

async fn update_view(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(update): Json<ViewUpdate>,
) -> Response {
    let (jar, session) = open_session(&state, jar);
    let mut ctx = lock(&session);
    ctx.view.pan((update.lat, update.lng));
    ctx.view.zoom(update.zoom.round() as i32);
    (jar, Json(ctx.view)).into_response()
}

async fn reset_view(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let (jar, session) = open_session(&state, jar);
    let mut ctx = lock(&session);
    ctx.view.reset();
    info!("map view reset (render key {})", ctx.view.render_key());
    (jar, Json(ctx.view)).into_response()
}

async fn reload_tables(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let (jar, session) = open_session(&state, jar);
    lock(&session).tables.invalidate();
    (jar, StatusCode::NO_CONTENT).into_response()
}

async fn get_lookup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<LookupQuery>,
) -> Response {
    let (jar, session) = open_session(&state, jar);
    let cas = query.cas.unwrap_or_default();
    let result = pipeline::lookup(&mut lock(&session), &state.config, &cas);
    (jar, json_or_error(result)).into_response()
}

async fn get_identifiers(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let (jar, session) = open_session(&state, jar);
    let result = lock(&session)
        .tables
        .toxicity(&state.config)
        .map(|table| {
            table
                .identifiers()
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        });
    (jar, json_or_error(result)).into_response()
}

async fn get_downloads(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(downloader::artifacts(&state.config))
}

async fn download_artifact(
    State(state): State<Arc<AppState>>,
    Path(artifact): Path<String>,
) -> Response {
    let Some(artifact) = downloader::artifact(&state.config, &artifact) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match artifact.read() {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, XLSX_MIME.to_string()),
                (header::CONTENT_DISPOSITION, artifact.content_disposition()),
            ],
            bytes,
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn export_markers(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<ExportQuery>,
) -> Response {
    let (jar, session) = open_session(&state, jar);
    let request = MapRequest {
        parameter: query.parameter,
        ..MapRequest::default()
    };
    let payload = match pipeline::render_map(&mut lock(&session), &state.config, &request) {
        Ok(payload) => payload,
        Err(err) => return (jar, error_response(err)).into_response(),
    };

    let name = &payload.parameter.name;
    let exported = match query.format {
        ExportFormat::Csv => downloader::to_csv(name, &payload.markers)
            .map(|csv| ("text/csv; charset=utf-8", "markers.csv", csv.into_bytes())),
        ExportFormat::Xlsx => downloader::to_xlsx(name, &payload.markers)
            .map(|bytes| (XLSX_MIME, "markers.xlsx", bytes)),
    };
    match exported {
        Ok((mime, file_name, bytes)) => (
            jar,
            [
                (header::CONTENT_TYPE, mime.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file_name),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(err) => (jar, error_response(err)).into_response(),
    }
}
