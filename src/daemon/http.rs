use std::net::SocketAddr;

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    economy::garden::{GardenError, PlantRequest},
    store::document::{AppDocument, FoodEntry, Mode, PlantKind, Task},
};

use super::service::{
    BridgeHandle, ComfortDraft, FoodDraft, SentimentDraft, ServiceError, StatusReport,
};

pub const DEFAULT_BIND: &str = "127.0.0.1:5000";

/// Serves the bridge over loopback HTTP, the one transport any UI talks to.
/// Routes and response shapes follow the REST surface earlier clients already
/// speak.
pub struct HttpBridge {
    bind: SocketAddr,
    handle: BridgeHandle,
    shutdown: CancellationToken,
}

impl HttpBridge {
    pub fn new(bind: SocketAddr, handle: BridgeHandle, shutdown: CancellationToken) -> Self {
        Self {
            bind,
            handle,
            shutdown,
        }
    }

    pub async fn run(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.bind).await?;
        info!("Bridge listening on http://{}", listener.local_addr()?);

        axum::serve(listener, build_router(self.handle))
            .with_graceful_shutdown(self.shutdown.clone().cancelled_owned())
            .await?;
        Ok(())
    }
}

pub fn build_router(handle: BridgeHandle) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/status", get(status))
        .route("/api/data", get(get_data).post(post_data))
        .route("/api/mode", post(post_mode))
        .route("/api/tasks", get(get_tasks).post(post_task))
        .route("/api/tasks/:id", patch(patch_task).delete(delete_task))
        .route("/api/sentiment", post(post_sentiment))
        .route("/api/food", get(get_food).post(post_food))
        .route("/api/comfort", post(post_comfort))
        .route("/api/points", post(post_points))
        .route("/api/goal", post(post_goal))
        .route("/api/plant", post(post_plant))
        .route("/api/login", post(post_login))
        .route("/api/logout", post(post_logout))
        .with_state(handle)
}

type ErrorReply = (StatusCode, Json<Value>);

/// The service only stops answering while the daemon shuts down, so a lost
/// request maps to a plain 500.
fn service_gone(e: anyhow::Error) -> ErrorReply {
    error!("The state service dropped a request: {e:?}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "state service unavailable"})),
    )
}

fn client_error(status: StatusCode, message: String) -> ErrorReply {
    (status, Json(json!({"error": message})))
}

#[derive(Debug, Deserialize)]
struct ModePayload {
    #[serde(default)]
    mode: Mode,
}

#[derive(Debug, Deserialize)]
struct TaskPayload {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct PointsPayload {
    #[serde(default)]
    change: i64,
}

#[derive(Debug, Deserialize)]
struct GoalPayload {
    #[serde(default)]
    goal: Option<String>,
    #[serde(default)]
    completed: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct PlantPayload {
    x: f64,
    y: f64,
    #[serde(default, rename = "type")]
    kind: Option<PlantKind>,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    #[serde(default)]
    name: Option<String>,
}

async fn index() -> Json<Value> {
    Json(json!({
        "name": "Touchgrass API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": [
            "GET /api/status - Get character state and points",
            "GET /api/data - Get all app data",
            "POST /api/data - Save all app data",
            "POST /api/mode - Set current mode",
            "GET /api/tasks - Get all tasks",
            "POST /api/tasks - Add a task",
            "PATCH /api/tasks/<id> - Toggle task completion",
            "DELETE /api/tasks/<id> - Delete a task",
            "POST /api/sentiment - Add sentiment entry",
            "GET /api/food - Get today's meals",
            "POST /api/food - Add food entry",
            "POST /api/comfort - Add comfort item",
            "POST /api/points - Update focus points",
            "POST /api/goal - Set daily goal",
            "POST /api/plant - Plant a seed in the zen garden",
            "POST /api/login - Create a local profile",
            "POST /api/logout - Clear the local profile",
        ],
    }))
}

async fn status(State(handle): State<BridgeHandle>) -> Result<Json<StatusReport>, ErrorReply> {
    Ok(Json(handle.status().await.map_err(service_gone)?))
}

async fn get_data(State(handle): State<BridgeHandle>) -> Result<Json<AppDocument>, ErrorReply> {
    Ok(Json(handle.load_document().await.map_err(service_gone)?))
}

/// Full-document replace. The payload is checked as a whole before anything
/// is overwritten; a single bad planting rejects the lot.
async fn post_data(
    State(handle): State<BridgeHandle>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ErrorReply> {
    let document: AppDocument = serde_json::from_value(payload)
        .map_err(|e| client_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let saved = handle.save_document(document).await.map_err(service_gone)?;
    Ok(Json(json!({"success": saved})))
}

async fn post_mode(
    State(handle): State<BridgeHandle>,
    Json(payload): Json<ModePayload>,
) -> Result<Json<Value>, ErrorReply> {
    let mode = handle.set_mode(payload.mode).await.map_err(service_gone)?;
    Ok(Json(json!({"success": true, "mode": mode})))
}

async fn get_tasks(State(handle): State<BridgeHandle>) -> Result<Json<Vec<Task>>, ErrorReply> {
    Ok(Json(handle.tasks().await.map_err(service_gone)?))
}

async fn post_task(
    State(handle): State<BridgeHandle>,
    Json(payload): Json<TaskPayload>,
) -> Result<Json<Task>, ErrorReply> {
    match handle.add_task(payload.text).await.map_err(service_gone)? {
        Ok(task) => Ok(Json(task)),
        Err(e) => Err(client_error(StatusCode::BAD_REQUEST, e.to_string())),
    }
}

async fn patch_task(
    State(handle): State<BridgeHandle>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ErrorReply> {
    match handle.toggle_task(id).await.map_err(service_gone)? {
        Ok(outcome) => Ok(Json(
            json!({"success": true, "focus_points": outcome.balance}),
        )),
        Err(e @ ServiceError::TaskNotFound { .. }) => {
            Err(client_error(StatusCode::NOT_FOUND, e.to_string()))
        }
        Err(e) => Err(client_error(StatusCode::BAD_REQUEST, e.to_string())),
    }
}

/// Deleting is idempotent: an id that is already gone still answers success.
async fn delete_task(
    State(handle): State<BridgeHandle>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ErrorReply> {
    handle.delete_task(id).await.map_err(service_gone)?;
    Ok(Json(json!({"success": true})))
}

async fn post_sentiment(
    State(handle): State<BridgeHandle>,
    Json(draft): Json<SentimentDraft>,
) -> Result<Json<Value>, ErrorReply> {
    let outcome = handle.add_sentiment(draft).await.map_err(service_gone)?;
    Ok(Json(
        json!({"success": true, "points_earned": outcome.points_earned}),
    ))
}

async fn get_food(State(handle): State<BridgeHandle>) -> Result<Json<Vec<FoodEntry>>, ErrorReply> {
    Ok(Json(handle.meals_today().await.map_err(service_gone)?))
}

async fn post_food(
    State(handle): State<BridgeHandle>,
    Json(draft): Json<FoodDraft>,
) -> Result<Json<Value>, ErrorReply> {
    let outcome = handle.add_food(draft).await.map_err(service_gone)?;
    Ok(Json(
        json!({"success": true, "points_earned": outcome.points_earned}),
    ))
}

async fn post_comfort(
    State(handle): State<BridgeHandle>,
    Json(draft): Json<ComfortDraft>,
) -> Result<Json<Value>, ErrorReply> {
    let outcome = handle.add_comfort(draft).await.map_err(service_gone)?;
    Ok(Json(
        json!({"success": true, "points_earned": outcome.points_earned}),
    ))
}

/// Raw balance adjustment. Negative changes go through the ledger's debit, so
/// a change that would cross zero bounces with 409 instead of going negative.
async fn post_points(
    State(handle): State<BridgeHandle>,
    Json(payload): Json<PointsPayload>,
) -> Result<Json<Value>, ErrorReply> {
    match handle
        .adjust_points(payload.change)
        .await
        .map_err(service_gone)?
    {
        Ok(balance) => Ok(Json(json!({"focus_points": balance}))),
        Err(e) => Err(client_error(StatusCode::CONFLICT, e.to_string())),
    }
}

async fn post_goal(
    State(handle): State<BridgeHandle>,
    Json(payload): Json<GoalPayload>,
) -> Result<Json<Value>, ErrorReply> {
    let balance = handle
        .set_goal(payload.goal, payload.completed)
        .await
        .map_err(service_gone)?;
    Ok(Json(json!({"success": true, "focus_points": balance})))
}

async fn post_plant(
    State(handle): State<BridgeHandle>,
    Json(payload): Json<PlantPayload>,
) -> Result<(StatusCode, Json<Value>), ErrorReply> {
    let request = PlantRequest {
        x: payload.x,
        y: payload.y,
        kind: payload.kind,
    };
    match handle.plant(request).await.map_err(service_gone)? {
        Ok(outcome) => Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "points": outcome.balance,
                "planting": outcome.planting,
            })),
        )),
        // The bridge contract reports an empty wallet as a message, not an
        // HTTP failure
        Err(e @ GardenError::Funds(_)) => Ok((
            StatusCode::OK,
            Json(json!({"success": false, "message": e.to_string()})),
        )),
        Err(e @ GardenError::OutsideGarden { .. }) => {
            Err(client_error(StatusCode::BAD_REQUEST, e.to_string()))
        }
    }
}

async fn post_login(
    State(handle): State<BridgeHandle>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<Value>, ErrorReply> {
    let user = handle
        .login(payload.email, payload.name)
        .await
        .map_err(service_gone)?;
    Ok(Json(json!({"success": true, "user": user})))
}

async fn post_logout(State(handle): State<BridgeHandle>) -> Result<Json<Value>, ErrorReply> {
    handle.logout().await.map_err(service_gone)?;
    Ok(Json(json!({"success": true})))
}
