use crate::catalog::{self, CatalogApi, Shuffle, TmdbCatalog};
use crate::config::Config;
use crate::models::MovieId;
use crate::navigation::Key;
use crate::session::{IntentError, Session};
use crate::store::{FileStorage, KeyValueStorage, WatchedError, WatchedList};
use crate::view::{self, View};
use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogApi>,
    pub session: Arc<Mutex<Session>>,
    pub shuffle: Shuffle,
    pub poster_base: Arc<str>,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        storage: Arc<dyn KeyValueStorage>,
        shuffle: Shuffle,
        poster_base: &str,
        slideshow_interval: Duration,
    ) -> Self {
        let watched = WatchedList::load(storage);
        Self {
            catalog,
            session: Arc::new(Mutex::new(Session::new(watched, slideshow_interval))),
            shuffle,
            poster_base: Arc::from(poster_base),
        }
    }

    pub async fn view(&self) -> View {
        let session = self.session.lock().await;
        view::render(&session, &self.poster_base)
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let catalog: Arc<dyn CatalogApi> = Arc::new(TmdbCatalog::new(&config.catalog)?);
    let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::new(&config.store_path));
    let state = AppState::new(
        catalog,
        storage,
        catalog::random_shuffle(),
        &config.catalog.poster_base_url,
        config.slideshow_interval,
    );

    spawn_initial_loads(&state);
    let app = build_router(state);

    info!("Listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(current_view))
        .route("/health", get(health))
        .route("/intent/search-focus", post(focus_search))
        .route("/intent/home", post(go_home))
        .route("/intent/query", post(set_query))
        .route("/intent/select/:id", post(select_movie))
        .route("/intent/close", post(close_movie))
        .route("/intent/key", post(key_press))
        .route("/intent/rate", post(rate_movie))
        .route("/intent/add-watched", post(add_watched))
        .route("/watched/:id", delete(delete_watched))
        .route("/slideshow/next", post(slideshow_next))
        .route("/slideshow/previous", post(slideshow_previous))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Genres and trending load independently; neither failure blocks the other.
pub fn spawn_initial_loads(state: &AppState) {
    let genres_state = state.clone();
    tokio::spawn(async move { load_genres(&genres_state).await });
    let trending_state = state.clone();
    tokio::spawn(async move { load_trending(&trending_state).await });
}

pub async fn load_genres(state: &AppState) {
    let result = state.catalog.fetch_genres().await;
    state.session.lock().await.genres_loaded(result);
}

pub async fn load_trending(state: &AppState) {
    state.session.lock().await.begin_trending();
    refresh_trending(state).await;
}

/// Fetch and shuffle trending movies into a session already marked as loading.
async fn refresh_trending(state: &AppState) {
    let result = catalog::fetch_trending(state.catalog.as_ref(), &state.shuffle).await;
    state.session.lock().await.trending_loaded(result);
}

async fn health() -> &'static str {
    "OK"
}

async fn current_view(State(state): State<AppState>) -> Json<View> {
    Json(state.view().await)
}

async fn focus_search(State(state): State<AppState>) -> Json<View> {
    let mut session = state.session.lock().await;
    session.focus_search();
    Json(view::render(&session, &state.poster_base))
}

async fn go_home(State(state): State<AppState>) -> Json<View> {
    let mut session = state.session.lock().await;
    if session.go_home() {
        debug!("Home shown again, reloading trending movies");
        let task_state = state.clone();
        tokio::spawn(async move { refresh_trending(&task_state).await });
    }
    Json(view::render(&session, &state.poster_base))
}

#[derive(Deserialize)]
struct QueryBody {
    query: String,
}

async fn set_query(State(state): State<AppState>, Json(body): Json<QueryBody>) -> Json<View> {
    let mut session = state.session.lock().await;
    if let Some((ticket, query)) = session.set_query(&body.query) {
        debug!(%query, "Starting search");
        let task_state = state.clone();
        let task = tokio::spawn(async move {
            let result = task_state.catalog.search_movies(&query).await;
            task_state
                .session
                .lock()
                .await
                .search_finished(ticket, result);
        });
        session.attach_search(ticket, task.abort_handle());
    }
    Json(view::render(&session, &state.poster_base))
}

async fn select_movie(State(state): State<AppState>, Path(id): Path<String>) -> Json<View> {
    let mut session = state.session.lock().await;
    if let Some(ticket) = session.select(MovieId::new(id)) {
        debug!(id = %ticket.id, "Loading movie detail");
        let task_state = state.clone();
        tokio::spawn(async move {
            let result = task_state.catalog.fetch_detail(&ticket.id).await;
            task_state
                .session
                .lock()
                .await
                .detail_finished(ticket, result);
        });
    }
    Json(view::render(&session, &state.poster_base))
}

async fn close_movie(State(state): State<AppState>) -> Json<View> {
    let mut session = state.session.lock().await;
    session.close();
    Json(view::render(&session, &state.poster_base))
}

#[derive(Deserialize)]
struct KeyBody {
    key: String,
}

async fn key_press(State(state): State<AppState>, Json(body): Json<KeyBody>) -> Json<View> {
    let mut session = state.session.lock().await;
    session.key_pressed(Key::from_name(&body.key));
    Json(view::render(&session, &state.poster_base))
}

#[derive(Deserialize)]
struct RateBody {
    rating: u8,
}

async fn rate_movie(
    State(state): State<AppState>,
    Json(body): Json<RateBody>,
) -> Result<Json<View>, IntentError> {
    let mut session = state.session.lock().await;
    session.rate(body.rating)?;
    Ok(Json(view::render(&session, &state.poster_base)))
}

async fn add_watched(State(state): State<AppState>) -> Result<Json<View>, IntentError> {
    let mut session = state.session.lock().await;
    session.add_watched()?;
    Ok(Json(view::render(&session, &state.poster_base)))
}

async fn delete_watched(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<View>, IntentError> {
    let mut session = state.session.lock().await;
    session.delete_watched(&MovieId::new(id))?;
    Ok(Json(view::render(&session, &state.poster_base)))
}

async fn slideshow_next(State(state): State<AppState>) -> Json<View> {
    let mut session = state.session.lock().await;
    session.slideshow_next();
    Json(view::render(&session, &state.poster_base))
}

async fn slideshow_previous(State(state): State<AppState>) -> Json<View> {
    let mut session = state.session.lock().await;
    session.slideshow_previous();
    Json(view::render(&session, &state.poster_base))
}

impl IntoResponse for IntentError {
    fn into_response(self) -> Response {
        let status = match &self {
            IntentError::NoSelection | IntentError::DetailNotReady(_) | IntentError::NoRating => {
                StatusCode::CONFLICT
            }
            IntentError::InvalidRating(_) => StatusCode::UNPROCESSABLE_ENTITY,
            IntentError::Watched(WatchedError::AlreadyWatched(_)) => StatusCode::CONFLICT,
            IntentError::Watched(WatchedError::NotFound(_)) => StatusCode::NOT_FOUND,
            IntentError::Watched(WatchedError::Persist(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Intent failed: {}", self);
        } else {
            warn!("Intent rejected: {}", self);
        }
        let body = Json(json!({"status": "error", "message": self.to_string()}));
        (status, body).into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
