//! API Server module
//!
//! HTTP surface over a shared [`Core`]: the read-only outline for renderers, a single
//! operation endpoint, and the event feed for persistence or collaboration layers.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Redirect, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::models::{ItemId, ItemRecord};
use crate::operation::{Dispatched, Operation};
use crate::outline::{Core, OutlineError};

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 3000).into(),
        }
    }
}

/// API responses
#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Query for `GET /api/events`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub since: u64,
}

fn error_response<T: Serialize>(status: StatusCode, message: String) -> Response {
    (status, Json(ApiResponse::<T>::error(message))).into_response()
}

/// Maps a dispatch result to a response. Rejections and no-ops are successful
/// responses; only caller mistakes become HTTP errors.
fn map_dispatch_result(result: Result<Dispatched, OutlineError>) -> Response {
    match result {
        Ok(dispatched) => (StatusCode::OK, Json(ApiResponse::success(dispatched))).into_response(),
        Err(e @ (OutlineError::UnknownItem(_) | OutlineError::UnknownParent(_))) => {
            error_response::<Dispatched>(StatusCode::NOT_FOUND, e.to_string())
        }
        Err(e @ OutlineError::InvalidStatus(_)) => {
            error_response::<Dispatched>(StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}

/// Builds the application router
pub fn router(core: Core) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { Redirect::temporary("/ui") }))
        .route("/api/outline", get(get_outline))
        .route("/api/items/:id", get(get_item))
        .route("/api/config", get(get_config))
        .route("/api/ops", post(dispatch_op))
        .route("/api/events", get(get_events))
        .route("/api/events/stream", get(stream_events))
        .route("/ui", get(ui_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(core)
}

/// Starts the API server
pub async fn serve(core: Core, config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(core);

    tracing::info!("Starting server on {}", config.address);
    let listener = TcpListener::bind(config.address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn get_outline(State(core): State<Core>) -> impl IntoResponse {
    Json(ApiResponse::success(core.records()))
}

async fn get_item(State(core): State<Core>, Path(id): Path<String>) -> Response {
    let id = ItemId::from(id);
    match core.record(&id) {
        Some(record) => Json(ApiResponse::success(record)).into_response(),
        None => error_response::<ItemRecord>(
            StatusCode::NOT_FOUND,
            OutlineError::UnknownItem(id).to_string(),
        ),
    }
}

async fn get_config(State(core): State<Core>) -> impl IntoResponse {
    Json(ApiResponse::success(core.config()))
}

async fn dispatch_op(State(core): State<Core>, Json(op): Json<Operation>) -> Response {
    // confirming an editor applies its staged input, so gate on that instead
    let staged = match &op {
        Operation::ConfirmEditor => core
            .active_editor()
            .and_then(|editor| Some(Operation::from_pending(editor.id, editor.pending?))),
        _ => None,
    };
    if !core.config().features.allows(staged.as_ref().unwrap_or(&op)) {
        tracing::info!("refusing disabled operation {:?}", op);
        return error_response::<Dispatched>(
            StatusCode::FORBIDDEN,
            "Operation is disabled by configuration".to_string(),
        );
    }
    map_dispatch_result(core.dispatch(op))
}

async fn get_events(State(core): State<Core>, Query(query): Query<EventsQuery>) -> impl IntoResponse {
    Json(ApiResponse::success(core.events_since(query.since)))
}

async fn stream_events(
    State(core): State<Core>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = core.subscribe();
    let stream = futures::stream::unfold(receiver, |mut receiver| async move {
        let event = match receiver.recv().await {
            Ok(record) => Event::default()
                .event(record.event.name())
                .id(record.seq.to_string())
                .data(serde_json::to_string(&record).unwrap_or_default()),
            Err(RecvError::Lagged(missed)) => {
                // clients can catch up through /api/events?since=
                tracing::warn!("event stream lagged, {} events skipped", missed);
                Event::default().event("lagged").data(missed.to_string())
            }
            Err(RecvError::Closed) => return None,
        };
        Some((Ok::<_, Infallible>(event), receiver))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn ui_handler(State(core): State<Core>) -> Html<String> {
    Html(render_ui(&core.records()))
}

const HTML_HEADER: &str = "<!DOCTYPE html><html><head><meta charset='utf-8'>\
<title>Outline</title><style>\
body{font-family:sans-serif;margin:2em}ul{list-style:none;padding-left:1.5em}\
.label{font-weight:bold;margin-right:.5em}.done{color:#888;text-decoration:line-through}\
.progress{color:#666;margin-left:.5em}.tag{background:#eef;border-radius:3px;padding:0 .3em;margin-left:.3em}\
.flag{color:#c33;margin-left:.3em}\
</style></head><body><h1>Outline</h1>";

fn render_ui(records: &[ItemRecord]) -> String {
    let mut html = String::from(HTML_HEADER);
    if records.is_empty() {
        html.push_str("<p>No items yet. Add some with <code>outliner item add</code></p>");
    } else {
        render_items_html(&mut html, records);
    }
    html.push_str("</body></html>");
    html
}

fn render_items_html(html: &mut String, records: &[ItemRecord]) {
    html.push_str("<ul>");
    for record in records {
        let item = &record.item;
        let class = if record.completed { "item done" } else { "item" };
        html.push_str(&format!(
            "<li data-id='{}'><span class='{}'>",
            html_escape::encode_single_quoted_attribute(item.id().as_str()),
            class
        ));
        if let Some(label) = &record.label {
            html.push_str(&format!(
                "<span class='label'>{}</span>",
                html_escape::encode_text(label)
            ));
        }
        html.push_str(&html_escape::encode_text(item.text()));
        html.push_str("</span>");
        if let Some(progress) = record.progress {
            html.push_str(&format!("<span class='progress'>[{}]</span>", progress));
        }
        if item.is_priority() {
            html.push_str("<span class='flag'>!</span>");
        }
        if item.is_blocked() {
            html.push_str("<span class='flag'>blocked</span>");
        }
        for tag in item.tags() {
            html.push_str(&format!(
                "<span class='tag'>#{}</span>",
                html_escape::encode_text(tag)
            ));
        }
        if !record.children.is_empty() {
            render_items_html(html, &record.children);
        }
        html.push_str("</li>");
    }
    html.push_str("</ul>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Features, OutlineConfig};
    use crate::events::EventRecord;
    use crate::models::ItemSeed;
    use crate::outline::{Outcome, Outline};
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt; // for `collect`
    use serde::de::DeserializeOwned;
    use serde_json::json;
    use tower::ServiceExt; // for `oneshot`

    fn setup_test_app(config: OutlineConfig) -> (Core, Router) {
        let outline = Outline::with_seed(config, 9).with_items(vec![ItemSeed::new("Parent")
            .with_id("p")
            .with_children(vec![ItemSeed::new("<b>child</b>").with_id("c")])]);
        let core = Core::new(outline);
        (core.clone(), router(core))
    }

    async fn request_json<T: DeserializeOwned>(
        app: &Router,
        method: &str,
        uri: &str,
        body: Body,
    ) -> (StatusCode, ApiResponse<T>) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
        let parsed = serde_json::from_slice::<ApiResponse<T>>(&body_bytes).unwrap_or_else(|e| {
            panic!(
                "failed to parse response: {}. Body: {}",
                e,
                String::from_utf8_lossy(&body_bytes)
            )
        });
        (status, parsed)
    }

    fn op_body(op: serde_json::Value) -> Body {
        Body::from(op.to_string())
    }

    #[tokio::test]
    async fn test_get_outline() {
        let (_, app) = setup_test_app(OutlineConfig::default());
        let (status, resp) =
            request_json::<Vec<ItemRecord>>(&app, "GET", "/api/outline", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        let records = resp.data.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].children.len(), 1);
        assert_eq!(records[0].progress.map(|p| p.to_string()), Some("0/1".to_string()));
    }

    #[tokio::test]
    async fn test_dispatch_add_and_cycle() {
        let (core, app) = setup_test_app(OutlineConfig::default());
        let (status, resp) = request_json::<Dispatched>(
            &app,
            "POST",
            "/api/ops",
            op_body(json!({"op": "add", "text": "sibling"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let dispatched = resp.data.unwrap();
        assert!(dispatched.outcome.is_applied());
        assert_eq!(dispatched.events[0].event.name(), "item:add");
        assert_eq!(core.records().len(), 2);

        let (_, resp) = request_json::<Dispatched>(
            &app,
            "POST",
            "/api/ops",
            op_body(json!({"op": "cycle-forward", "id": "c"})),
        )
        .await;
        assert!(resp.data.unwrap().outcome.is_applied());
    }

    #[tokio::test]
    async fn test_guard_rejection_is_a_successful_response() {
        let (_, app) = setup_test_app(OutlineConfig::default());
        let (status, resp) = request_json::<Dispatched>(
            &app,
            "POST",
            "/api/ops",
            op_body(json!({"op": "set-status", "id": "p", "status": "DONE"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let dispatched = resp.data.unwrap();
        assert!(matches!(dispatched.outcome, Outcome::Rejected(_)));
        assert_eq!(
            dispatched.events[0].event.name(),
            "item:permission-denied"
        );
    }

    #[tokio::test]
    async fn test_unknown_item_is_not_found() {
        let (_, app) = setup_test_app(OutlineConfig::default());
        let (status, resp) = request_json::<Dispatched>(
            &app,
            "POST",
            "/api/ops",
            op_body(json!({"op": "indent", "id": "ghost"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!resp.success);
        assert!(resp.error.unwrap().contains("ghost"));

        let (status, _) =
            request_json::<ItemRecord>(&app, "GET", "/api/items/ghost", Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_status_is_bad_request() {
        let (_, app) = setup_test_app(OutlineConfig::default());
        let (status, _) = request_json::<Dispatched>(
            &app,
            "POST",
            "/api/ops",
            op_body(json!({"op": "set-status", "id": "c", "status": "LATER"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_disabled_features_are_forbidden() {
        let config = OutlineConfig {
            features: Features {
                archive: false,
                ..Features::default()
            },
            ..OutlineConfig::default()
        };
        let (core, app) = setup_test_app(config);
        let (status, _) = request_json::<Dispatched>(
            &app,
            "POST",
            "/api/ops",
            op_body(json!({"op": "archive", "id": "c"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(core.record(&ItemId::from("c")).is_some());
        assert_eq!(core.last_seq(), 0);
    }

    #[tokio::test]
    async fn test_disabled_features_cannot_be_reached_through_editors() {
        let config = OutlineConfig {
            features: Features {
                archive: false,
                ..Features::default()
            },
            ..OutlineConfig::default()
        };
        let (core, app) = setup_test_app(config);

        let (status, _) = request_json::<Dispatched>(
            &app,
            "POST",
            "/api/ops",
            op_body(json!({"op": "open-editor", "id": "c", "kind": "archive"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = request_json::<Dispatched>(
            &app,
            "POST",
            "/api/ops",
            op_body(json!({"op": "stage", "input": {"kind": "archive"}})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // an editor opened in-process still cannot be confirmed over HTTP
        core.dispatch(Operation::OpenEditor {
            id: ItemId::from("c"),
            kind: crate::popup::EditorKind::Archive,
        })
        .unwrap();
        core.dispatch(Operation::Stage {
            input: crate::popup::PendingInput::Archive,
        })
        .unwrap();
        let (status, _) = request_json::<Dispatched>(
            &app,
            "POST",
            "/api/ops",
            op_body(json!({"op": "confirm-editor"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(core.record(&ItemId::from("c")).is_some());
    }

    #[tokio::test]
    async fn test_events_since() {
        let (_, app) = setup_test_app(OutlineConfig::default());
        for _ in 0..2 {
            request_json::<Dispatched>(
                &app,
                "POST",
                "/api/ops",
                op_body(json!({"op": "toggle-priority", "id": "c"})),
            )
            .await;
        }
        let (_, resp) =
            request_json::<Vec<EventRecord>>(&app, "GET", "/api/events?since=1", Body::empty())
                .await;
        let events = resp.data.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].seq, 2);
    }

    #[tokio::test]
    async fn test_ui_escapes_item_text() {
        let (_, app) = setup_test_app(OutlineConfig::default());
        let response = app
            .oneshot(Request::builder().uri("/ui").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8_lossy(&body);
        assert!(html.contains("&lt;b&gt;child&lt;/b&gt;"));
        assert!(html.contains("[0/1]"));
        assert!(!html.contains("<b>child</b>"));
    }
}
