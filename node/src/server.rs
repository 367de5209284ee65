// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, MatchedPath, Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

use arbor_kernel::{Revision, TreeId};

use crate::admin::AdminServer;
use crate::api::*;
use crate::errors::ServiceError;
use crate::log_server::LogServer;
use crate::map_server::MapServer;
use crate::registry::Registry;
use crate::telemetry;

#[derive(Clone)]
pub struct AppState {
    pub admin: AdminServer,
    pub logs: LogServer,
    pub maps: MapServer,
}

impl AppState {
    pub fn new(registry: Registry) -> Self {
        Self {
            admin: AdminServer::new(registry.clone()),
            logs: LogServer::new(registry.clone()),
            maps: MapServer::new(registry),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/trees", post(create_tree).get(list_trees))
        .route("/v1/trees/:id", get(get_tree).patch(update_tree).delete(delete_tree))
        .route("/v1/trees/:id/undelete", post(undelete_tree))
        .route("/v1/trees/:id/hard_delete", post(hard_delete_tree))
        .route("/v1/logs/:id/roots", post(commit_log_root))
        .route("/v1/logs/:id/roots/latest", get(latest_log_root))
        .route("/v1/logs/:id/roots/:revision", get(log_root_at))
        .route("/v1/maps/:id/roots", post(commit_map_root))
        .route("/v1/maps/:id/roots/latest", get(latest_map_root))
        .route("/v1/maps/:id/roots/:revision", get(map_root_at))
        .route("/healthz", get(healthz))
        .route_layer(middleware::from_fn(record_rpc_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Prometheus scrape endpoint, served on its own port.
pub fn build_metrics_router() -> Router {
    Router::new().route("/metrics", get(|| async { telemetry::get_metrics() }))
}

async fn record_rpc_stats(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = req.method().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!("arbor_rpc_requests_total", 1, "method" => method, "route" => route.clone(), "status" => status);
    metrics::histogram!("arbor_rpc_duration_seconds", start.elapsed().as_secs_f64(), "route" => route);
    response
}

/// Body extraction whose failures answer with a coded JSON error.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ServiceError::InvalidArgument(format!("malformed request body: {}", rejection.body_text())))
}

// --- Admin ---

async fn create_tree(
    State(state): State<AppState>,
    payload: Result<Json<CreateTreeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TreeView>), ServiceError> {
    let spec = json_body(payload)?.into_new_tree()?;
    let tree = state.admin.create_tree(spec).await?;
    Ok((StatusCode::CREATED, Json(TreeView::from(&tree))))
}

async fn list_trees(
    State(state): State<AppState>,
    Query(query): Query<ListTreesQuery>,
) -> Result<Json<ListTreesResponse>, ServiceError> {
    let trees = state.admin.list_trees(query.show_deleted).await?;
    Ok(Json(ListTreesResponse {
        trees: trees.iter().map(TreeView::from).collect(),
    }))
}

async fn get_tree(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<TreeView>, ServiceError> {
    let tree = state.admin.get_tree(TreeId(id)).await?;
    Ok(Json(TreeView::from(&tree)))
}

async fn update_tree(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateTreeRequest>, JsonRejection>,
) -> Result<Json<TreeView>, ServiceError> {
    let update = json_body(payload)?.into_update()?;
    let tree = state.admin.update_tree(TreeId(id), update).await?;
    Ok(Json(TreeView::from(&tree)))
}

async fn delete_tree(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<TreeView>, ServiceError> {
    let tree = state.admin.delete_tree(TreeId(id)).await?;
    Ok(Json(TreeView::from(&tree)))
}

async fn undelete_tree(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<TreeView>, ServiceError> {
    let tree = state.admin.undelete_tree(TreeId(id)).await?;
    Ok(Json(TreeView::from(&tree)))
}

async fn hard_delete_tree(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TreeView>, ServiceError> {
    let tree = state.admin.hard_delete_tree(TreeId(id)).await?;
    Ok(Json(TreeView::from(&tree)))
}

// --- Logs ---

async fn commit_log_root(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<CommitLogRootRequest>, JsonRejection>,
) -> Result<Json<SignedLogRootView>, ServiceError> {
    let req = json_body(payload)?;
    let root_hash = decode_hex("root_hash", &req.root_hash)?;
    let root = state.logs.commit_root(TreeId(id), root_hash, req.tree_size).await?;
    Ok(Json(SignedLogRootView::from(&root)))
}

async fn latest_log_root(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SignedLogRootView>, ServiceError> {
    let root = state.logs.latest_root(TreeId(id)).await?;
    Ok(Json(SignedLogRootView::from(&root)))
}

async fn log_root_at(
    State(state): State<AppState>,
    Path((id, revision)): Path<(i64, u64)>,
) -> Result<Json<SignedLogRootView>, ServiceError> {
    let root = state.logs.root_at(TreeId(id), Revision(revision)).await?;
    Ok(Json(SignedLogRootView::from(&root)))
}

// --- Maps ---

async fn commit_map_root(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<CommitMapRootRequest>, JsonRejection>,
) -> Result<Json<SignedMapRootView>, ServiceError> {
    let req = json_body(payload)?;
    let root_hash = decode_hex("root_hash", &req.root_hash)?;
    let root = state.maps.commit_root(TreeId(id), root_hash, req.metadata).await?;
    Ok(Json(SignedMapRootView::from(&root)))
}

async fn latest_map_root(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SignedMapRootView>, ServiceError> {
    let root = state.maps.latest_root(TreeId(id)).await?;
    Ok(Json(SignedMapRootView::from(&root)))
}

async fn map_root_at(
    State(state): State<AppState>,
    Path((id, revision)): Path<(i64, u64)>,
) -> Result<Json<SignedMapRootView>, ServiceError> {
    let root = state.maps.root_at(TreeId(id), Revision(revision)).await?;
    Ok(Json(SignedMapRootView::from(&root)))
}

async fn healthz(State(state): State<AppState>) -> Result<Json<HealthResponse>, ServiceError> {
    state.logs.is_healthy().await?;
    Ok(Json(HealthResponse {
        status: "SERVING".to_string(),
    }))
}
