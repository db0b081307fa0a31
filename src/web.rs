//! HTTP API for browsing and editing collections
//!
//! Each user gets a [`Session`] opened on first access, cloned from the
//! catalog normalized once at startup.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::Settings;
use crate::error::CollectionError;
use crate::export::export_owned_to_bytes;
use crate::models::{CardKey, CardVariant, Catalog};
use crate::session::{EditEvent, EditOutcome, Session, UserId};
use crate::view::{PageView, SortKey};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    catalog: Arc<Catalog>,
    settings: Arc<Settings>,
    sessions: Arc<Mutex<HashMap<UserId, Session>>>,
}

impl AppState {
    pub fn new(catalog: Catalog, settings: Settings) -> Self {
        Self {
            catalog: Arc::new(catalog),
            settings: Arc::new(settings),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<UserId, Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` on the user's session, opening it if needed
    ///
    /// Also returns the session's load warning as it stood before `f` ran, so
    /// the request that overwrites a corrupt collection still reports it.
    fn with_session<T>(
        &self,
        raw_user: &str,
        f: impl FnOnce(&mut Session) -> crate::Result<T>,
    ) -> crate::Result<(T, Option<String>)> {
        let user = UserId::parse(raw_user)?;
        let mut sessions = self.lock_sessions();
        let session = sessions.entry(user.clone()).or_insert_with(|| {
            let (session, warning) = Session::open(user, (*self.catalog).clone(), &self.settings);
            if let Some(e) = warning {
                log::warn!("Session opened with zeroed quantities: {}", e);
            }
            session
        });
        let warning = session.load_warning().map(str::to_string);
        Ok((f(session)?, warning))
    }

    /// Save every session with unsaved edits
    pub fn flush_sessions(&self) {
        let mut sessions = self.lock_sessions();
        for session in sessions.values_mut().filter(|s| s.is_dirty()) {
            if let Err(e) = session.save() {
                log::error!("Failed to save collection for {}: {}", session.user(), e);
            }
        }
    }
}

/// API response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    /// Non-fatal problem, e.g. a saved collection that could not be read
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

/// Error returned by handlers, rendered as an [`ApiResponse`] with `success: false`
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }
}

impl From<CollectionError> for ApiError {
    fn from(err: CollectionError) -> Self {
        let status = match err {
            CollectionError::InvalidUser(_) | CollectionError::Config(_) => {
                StatusCode::BAD_REQUEST
            }
            CollectionError::UnknownCard(_) => StatusCode::NOT_FOUND,
            _ => {
                log::error!("Request failed: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.message),
            warning: None,
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn success<T>(data: T) -> ApiResult<T> {
    success_with_warning(data, None)
}

fn success_with_warning<T>(data: T, warning: Option<String>) -> ApiResult<T> {
    Ok(Json(ApiResponse {
        success: true,
        data: Some(data),
        error: None,
        warning,
    }))
}

/// Listing query parameters
#[derive(Debug, Default, Deserialize)]
struct CardsParams {
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    owned_only: Option<bool>,
    /// Set names separated by `|`
    #[serde(default)]
    sets: Option<String>,
    #[serde(default)]
    sort: Option<String>,
    #[serde(default)]
    page: Option<usize>,
}

impl CardsParams {
    fn into_events(self) -> Result<Vec<EditEvent>, String> {
        let sort = self.sort.as_deref().map(str::parse::<SortKey>).transpose()?;
        let sets: Vec<String> = self
            .sets
            .map(|sets| {
                sets.split('|')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(vec![
            EditEvent::ResetFilters,
            EditEvent::SetSearch(self.q.unwrap_or_default()),
            EditEvent::SetOwnedOnly(self.owned_only.unwrap_or(false)),
            EditEvent::SetSets(sets),
            EditEvent::SetSort(sort),
            EditEvent::GoToPage(self.page.unwrap_or(1)),
        ])
    }
}

/// Quantity update body
#[derive(Debug, Deserialize)]
struct QuantityUpdate {
    name: String,
    set_name: String,
    #[serde(default)]
    set_code: String,
    #[serde(default)]
    rarity: String,
    quantity: u32,
}

#[derive(Debug, Serialize)]
struct QuantityUpdated {
    card: CardVariant,
    previous: u32,
    saved: bool,
}

#[derive(Debug, Serialize)]
struct SaveSummary {
    owned_printings: usize,
    total_cards: u64,
}

/// GET /api/sets
async fn sets_handler(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    success(state.catalog.set_names())
}

/// GET /api/users/{user}/cards?q=&owned_only=&sets=&sort=&page=
async fn cards_handler(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(params): Query<CardsParams>,
) -> ApiResult<PageView> {
    let events = params
        .into_events()
        .map_err(ApiError::bad_request)?;

    let (view, warning) = state.with_session(&user, |session| {
        session.apply_all(events)?;
        Ok(session.render())
    })?;
    success_with_warning(view, warning)
}

/// PUT /api/users/{user}/cards
async fn update_quantity_handler(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(update): Json<QuantityUpdate>,
) -> ApiResult<QuantityUpdated> {
    let key = CardKey::new(update.name, update.set_name, update.set_code, update.rarity);

    let (updated, warning) = state.with_session(&user, |session| {
        let outcome = session.apply(EditEvent::SetQuantity {
            key: key.clone(),
            quantity: update.quantity,
        })?;
        let index = session
            .catalog()
            .resolve(&key)
            .ok_or_else(|| CollectionError::UnknownCard(key.to_string()))?;
        let card = session.catalog().rows()[index].clone();

        let (previous, saved) = match outcome {
            EditOutcome::QuantityChanged {
                previous, saved, ..
            } => (previous, saved),
            _ => (card.owned_quantity, false),
        };
        Ok(QuantityUpdated {
            card,
            previous,
            saved,
        })
    })?;
    success_with_warning(updated, warning)
}

/// POST /api/users/{user}/save
async fn save_handler(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> ApiResult<SaveSummary> {
    let (summary, warning) = state.with_session(&user, |session| {
        session.apply(EditEvent::Save)?;
        Ok(SaveSummary {
            owned_printings: session.catalog().owned_count(),
            total_cards: session.catalog().total_owned(),
        })
    })?;
    success_with_warning(summary, warning)
}

/// GET /api/users/{user}/export
/// Downloads the owned printings as CSV
async fn export_handler(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Response, ApiError> {
    let ((user, bytes), _) = state.with_session(&user, |session| {
        let bytes = export_owned_to_bytes(session.catalog())?;
        Ok((session.user().clone(), bytes))
    })?;

    let disposition = format!("attachment; filename=\"collection_{}_owned.csv\"", user);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Build the web server router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/sets", get(sets_handler))
        .route(
            "/api/users/{user}/cards",
            get(cards_handler).put(update_quantity_handler),
        )
        .route("/api/users/{user}/save", post(save_handler))
        .route("/api/users/{user}/export", get(export_handler))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown requested");
}

/// Start the web server; pending edits are saved on shutdown
pub async fn serve(state: AppState, port: u16) -> crate::Result<()> {
    let app = create_router(state.clone());
    let addr = format!("127.0.0.1:{}", port);

    log::info!("Collection API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.flush_sessions();
    Ok(())
}

#[cfg(test)]
#[path = "web_tests.rs"]
mod tests;
