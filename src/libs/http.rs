// HTTP routes for the table editor

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{ConnectInfo, FromRequestParts, Path, Query, Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::libs::auth::{EditorAuth, require_loopback};
use crate::libs::config::EditorConfig;
use crate::libs::error::{EditorError, Result};
use crate::libs::json::{row_from_json, string_field};
use crate::libs::rows::{Page, RowPage, Table};
use crate::libs::schema::TableSchema;
use crate::libs::session::{InMemorySessionStore, SystemClock};
use crate::libs::store::Store;

#[derive(Clone)]
pub struct ApiState {
    pub store: Store,
    pub auth: Arc<EditorAuth>,
    pub database_name: String,
}

impl ApiState {
    pub fn new(store: Store, auth: EditorAuth, database_name: impl Into<String>) -> Self {
        Self {
            store,
            auth: Arc::new(auth),
            database_name: database_name.into(),
        }
    }

    /// Single in-memory session and the system clock.
    pub fn from_config(store: Store, config: &EditorConfig) -> Self {
        let auth = EditorAuth::new(
            config.root_password.clone(),
            config.token_ttl(),
            Arc::new(InMemorySessionStore::new()),
            Arc::new(SystemClock),
        );
        Self::new(store, auth, config.database_name.clone())
    }
}

/// Route table. `/rows/:table` and `/rows/:table/:pk` are separate routes;
/// verbs that are not wired answer 405. Everything under the prefix,
/// including unmatched paths, is loopback-only.
pub fn create_router(state: ApiState, prefix: &str) -> Router {
    let login_routes = Router::new().route("/login", post(login_handler).fallback(method_not_allowed));

    let protected_routes = Router::new()
        .route("/tables", get(tables_handler).fallback(method_not_allowed))
        .route("/schema/:table", get(schema_handler).fallback(method_not_allowed))
        .route(
            "/rows/:table",
            get(list_rows_handler)
                .post(insert_row_handler)
                .fallback(method_not_allowed),
        )
        .route(
            "/rows/:table/:pk",
            get(get_row_handler)
                .put(update_row_handler)
                .delete(delete_row_handler)
                .fallback(method_not_allowed),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let editor = login_routes
        .merge(protected_routes)
        .fallback(not_found)
        .layer(middleware::from_fn(loopback_middleware));

    Router::new()
        .nest(prefix, editor)
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// `Path` with rejections rendered as JSON errors.
#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(EditorError))]
struct EditorPath<T>(T);

/// `Query` with rejections rendered as JSON errors.
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(EditorError))]
struct EditorQuery<T>(T);

async fn loopback_middleware(
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response> {
    require_loopback(remote)?;
    Ok(next.run(request).await)
}

/// Runs inside the loopback layer, so only the bearer token is left to check.
async fn auth_middleware(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);
    state.auth.authorize(header.as_deref()).await?;
    Ok(next.run(request).await)
}

async fn method_not_allowed() -> EditorError {
    EditorError::MethodNotAllowed
}

async fn not_found() -> EditorError {
    EditorError::not_found("not found")
}

async fn login_handler(State(state): State<ApiState>, body: Bytes) -> Result<Json<Value>> {
    let password = string_field(&body, "password").or_else(|| string_field(&body, "rootPassword"));
    let session = state.auth.login(password.as_deref()).await?;
    Ok(Json(json!({
        "token": session.token,
        "expires_at": session.expires_at.timestamp_millis(),
    })))
}

async fn tables_handler(State(state): State<ApiState>) -> Result<Json<Value>> {
    let tables = state.store.list_tables().await?;
    Ok(Json(json!({ "db": state.database_name, "tables": tables })))
}

async fn schema_handler(
    State(state): State<ApiState>,
    EditorPath(table): EditorPath<String>,
) -> Result<Json<TableSchema>> {
    Ok(Json(Table::open(&state.store, &table).await?.into_schema()))
}

#[derive(Debug, Deserialize)]
struct PageParams {
    limit: Option<String>,
    offset: Option<String>,
}

async fn list_rows_handler(
    State(state): State<ApiState>,
    EditorPath(table): EditorPath<String>,
    EditorQuery(params): EditorQuery<PageParams>,
) -> Result<Json<RowPage>> {
    let page = Page::from_query(params.limit.as_deref(), params.offset.as_deref());
    debug!("listing {} with {:?}", table, page);
    Ok(Json(Table::open(&state.store, &table).await?.list(page).await?))
}

async fn get_row_handler(
    State(state): State<ApiState>,
    EditorPath((table, pk)): EditorPath<(String, String)>,
) -> Result<Json<Value>> {
    let handle = Table::open(&state.store, &table).await?;
    let row = handle.get(&pk).await?;
    Ok(Json(json!({ "table": handle.schema().name, "row": row })))
}

async fn insert_row_handler(
    State(state): State<ApiState>,
    EditorPath(table): EditorPath<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>)> {
    let handle = Table::open(&state.store, &table).await?;
    let row = row_from_json(&body)?;
    let body = match handle.insert(row).await? {
        Some(id) => json!({ "ok": true, "id": id.to_string() }),
        None => json!({ "ok": true }),
    };
    Ok((StatusCode::CREATED, Json(body)))
}

async fn update_row_handler(
    State(state): State<ApiState>,
    EditorPath((table, pk)): EditorPath<(String, String)>,
    body: Bytes,
) -> Result<Json<Value>> {
    let handle = Table::open(&state.store, &table).await?;
    let row = row_from_json(&body)?;
    let updated = handle.update(&pk, row).await?;
    Ok(Json(json!({ "ok": true, "updated": updated })))
}

async fn delete_row_handler(
    State(state): State<ApiState>,
    EditorPath((table, pk)): EditorPath<(String, String)>,
) -> Result<Json<Value>> {
    let deleted = Table::open(&state.store, &table).await?.delete(&pk).await?;
    Ok(Json(json!({ "ok": true, "deleted": deleted })))
}
