//! Ops Stub API: REST endpoints
//!
//! The action-execution boundary consumed by the copilot CLI's approval
//! flow. Accepts `{type, operator, item?, details?, original_query}`
//! payloads, mutates the file-backed operations state, appends an audit
//! entry, and returns `{ok, message, state}`. The agent pipeline never
//! calls this service — it only produces the payload shape.

pub mod store;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use store::{FileStore, OpsState};

/// Action payload posted by the approval flow.
///
/// Unknown extra fields are ignored so the client can evolve independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub operator: String,
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub original_query: Option<String>,
}

/// Build the service router.
pub fn create_app(store: Arc<FileStore>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/pause_item", post(pause_item))
        .route("/unpause_item", post(unpause_item))
        .route("/update_hours", post(update_hours))
        .route("/state", get(get_state))
        .route("/audit", get(get_audit))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

/// Bind and serve until shutdown.
pub async fn run(addr: &str, data_dir: &Path) {
    let store = Arc::new(FileStore::new(data_dir).expect("usable data dir"));
    let app = create_app(store);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");

    tracing::info!("Ops stub API listening on {}", addr);
    axum::serve(listener, app).await.expect("Server error");
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "ok": true })))
}

async fn pause_item(
    State(store): State<Arc<FileStore>>,
    Json(payload): Json<ActionPayload>,
) -> (StatusCode, Json<Value>) {
    set_item_status(&store, payload, "paused", "Paused")
}

async fn unpause_item(
    State(store): State<Arc<FileStore>>,
    Json(payload): Json<ActionPayload>,
) -> (StatusCode, Json<Value>) {
    set_item_status(&store, payload, "active", "Unpaused")
}

fn set_item_status(
    store: &FileStore,
    payload: ActionPayload,
    status: &str,
    verb: &str,
) -> (StatusCode, Json<Value>) {
    let Some(item) = payload.item.clone().filter(|i| !i.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Missing 'item' in payload" })),
        );
    };

    let state = match store.update_state(|state| {
        state.items.insert(item.clone(), status.to_string());
    }) {
        Ok(state) => state,
        Err(e) => return internal_error(e),
    };

    if let Err(e) = store.append_audit(audit_entry(&payload)) {
        return internal_error(e);
    }

    (
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "message": format!("{} item '{}'", verb, item),
            "state": state,
        })),
    )
}

async fn update_hours(
    State(store): State<Arc<FileStore>>,
    Json(payload): Json<ActionPayload>,
) -> (StatusCode, Json<Value>) {
    let note = payload
        .details
        .clone()
        .or_else(|| payload.original_query.clone())
        .unwrap_or_else(|| "updated hours".to_string());

    let state = match store.update_state(|state| {
        state.hours_note = note.clone();
    }) {
        Ok(state) => state,
        Err(e) => return internal_error(e),
    };

    if let Err(e) = store.append_audit(audit_entry(&payload)) {
        return internal_error(e);
    }

    (
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "message": "Hours updated",
            "note": note,
            "state": state,
        })),
    )
}

async fn get_state(State(store): State<Arc<FileStore>>) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!(store.load_state())))
}

async fn get_audit(State(store): State<Arc<FileStore>>) -> (StatusCode, Json<Value>) {
    let entries = store.read_audit();
    (
        StatusCode::OK,
        Json(json!({ "count": entries.len(), "entries": entries })),
    )
}

fn audit_entry(payload: &ActionPayload) -> Value {
    let mut entry = serde_json::to_value(payload).unwrap_or_else(|_| json!({}));
    if let Some(obj) = entry.as_object_mut() {
        obj.insert("action".to_string(), json!(payload.kind));
    }
    entry
}

fn internal_error(e: std::io::Error) -> (StatusCode, Json<Value>) {
    tracing::error!("Store failure: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": e.to_string() })),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (Arc<FileStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()).unwrap());
        (store, dir)
    }

    fn payload(kind: &str, item: Option<&str>, details: Option<&str>) -> ActionPayload {
        ActionPayload {
            kind: kind.to_string(),
            operator: "demo_user".to_string(),
            item: item.map(|s| s.to_string()),
            details: details.map(|s| s.to_string()),
            original_query: Some("original".to_string()),
        }
    }

    #[tokio::test]
    async fn pause_item_mutates_state_and_audits() {
        let (store, _dir) = test_store();

        let (status, Json(body)) = pause_item(
            State(Arc::clone(&store)),
            Json(payload("pause_item", Some("Garlic Bread"), None)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["message"], "Paused item 'Garlic Bread'");
        assert_eq!(body["state"]["items"]["Garlic Bread"], "paused");

        let audit = store.read_audit();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0]["action"], "pause_item");
        assert_eq!(audit[0]["operator"], "demo_user");
    }

    #[tokio::test]
    async fn unpause_item_sets_active() {
        let (store, _dir) = test_store();

        pause_item(
            State(Arc::clone(&store)),
            Json(payload("pause_item", Some("Cheesecake"), None)),
        )
        .await;
        let (status, Json(body)) = unpause_item(
            State(Arc::clone(&store)),
            Json(payload("unpause_item", Some("Cheesecake"), None)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"]["items"]["Cheesecake"], "active");
    }

    #[tokio::test]
    async fn pause_without_item_is_bad_request() {
        let (store, _dir) = test_store();

        let (status, Json(body)) =
            pause_item(State(store), Json(payload("pause_item", None, None))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Missing 'item' in payload");
    }

    #[tokio::test]
    async fn update_hours_prefers_details_over_original_query() {
        let (store, _dir) = test_store();

        let (status, Json(body)) = update_hours(
            State(store),
            Json(payload(
                "update_hours",
                None,
                Some("update opening hours for Friday to 9-5"),
            )),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["note"], "update opening hours for Friday to 9-5");
        assert_eq!(
            body["state"]["hours_note"],
            "update opening hours for Friday to 9-5"
        );
    }

    #[tokio::test]
    async fn update_hours_falls_back_to_original_query() {
        let (store, _dir) = test_store();

        let (_, Json(body)) =
            update_hours(State(store), Json(payload("update_hours", None, None))).await;
        assert_eq!(body["note"], "original");
    }

    #[tokio::test]
    async fn state_and_audit_endpoints_reflect_mutations() {
        let (store, _dir) = test_store();

        pause_item(
            State(Arc::clone(&store)),
            Json(payload("pause_item", Some("A"), None)),
        )
        .await;

        let (_, Json(state)) = get_state(State(Arc::clone(&store))).await;
        assert_eq!(state["items"]["A"], "paused");

        let (_, Json(audit)) = get_audit(State(store)).await;
        assert_eq!(audit["count"], 1);
        assert_eq!(audit["entries"][0]["action"], "pause_item");
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, Json(body)) = health().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }
}
