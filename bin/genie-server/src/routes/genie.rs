//! Genie proxy routes.
//!
//! Three operations are forwarded to the remote service with the server-held
//! bearer token attached:
//!
//! - `POST /api/genie/chat` – start or continue a conversation
//! - `GET  /api/genie/poll/{conversationId}/{messageId}` – message status
//! - `GET  /api/genie/results/...` – query result rows, shaped by the
//!   configured [`ResultsStrategy`]
//!
//! Credentials are loaded and validated before anything else happens in a
//! handler; an unconfigured server never reaches the network.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use genie_types::{is_valid_id, ResultKey, ResultKeyError, ResultsStrategy, SubmitRequest};
use serde_json::Value;
use tracing::{debug, info};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::ErrorBody;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(submit_message, poll_status, fetch_results, fetch_statement_results),
    components(schemas(SubmitRequest, ErrorBody))
)]
pub struct GenieApi;

/// Register the proxy routes. Only the results route matching `strategy`
/// is mounted.
pub fn router(strategy: ResultsStrategy) -> Router<Arc<AppState>> {
    let router = Router::new()
        .route("/chat", post(submit_message))
        .route("/poll/{conversation_id}/{message_id}", get(poll_status));

    match strategy {
        ResultsStrategy::AttachmentPath => router.route(
            "/results/{conversation_id}/{message_id}/{attachment_id}",
            get(fetch_results),
        ),
        ResultsStrategy::StatementId => {
            router.route("/results/{statement_id}", get(fetch_statement_results))
        }
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// Start a conversation, or add a message to an existing one.
///
/// The body is decoded leniently: anything without a usable `message` is a
/// 400, after the configuration check.
#[utoipa::path(
    post,
    path = "/api/genie/chat",
    tag = "genie",
    request_body = SubmitRequest,
    responses(
        (status = 200, description = "Genie message accepted (remote body)", body = Value),
        (status = 400, description = "Message is required", body = ErrorBody),
        (status = 500, description = "Configuration or transport error", body = ErrorBody),
    )
)]
pub async fn submit_message(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ServerError> {
    info!("Genie chat request received");
    let creds = state.credentials.load()?;

    let req: SubmitRequest = serde_json::from_slice(&body).unwrap_or_default();
    let message = req
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ServerError::Validation("Message is required".into()))?;
    let conversation_id = req
        .conversation_id
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    if conversation_id.is_some_and(|c| !is_valid_id(c)) {
        return Err(ResultKeyError::InvalidId.into());
    }

    debug!(continuing = conversation_id.is_some(), len = message.len(), "forwarding message");
    let data = match conversation_id {
        Some(cid) => state.upstream.create_message(&creds, cid, message).await?,
        None => state.upstream.start_conversation(&creds, message).await?,
    };
    Ok(Json(data))
}

/// Fetch the current state of a message.
#[utoipa::path(
    get,
    path = "/api/genie/poll/{conversation_id}/{message_id}",
    tag = "genie",
    params(
        ("conversation_id" = String, Path, description = "Genie conversation id"),
        ("message_id" = String, Path, description = "Genie message id"),
    ),
    responses(
        (status = 200, description = "Remote message resource", body = Value),
        (status = 400, description = "Missing or malformed id", body = ErrorBody),
        (status = 500, description = "Configuration or transport error", body = ErrorBody),
    )
)]
pub async fn poll_status(
    State(state): State<Arc<AppState>>,
    Path((conversation_id, message_id)): Path<(String, String)>,
) -> Result<Json<Value>, ServerError> {
    info!("Genie poll request received");
    let creds = state.credentials.load()?;

    let (conversation_id, message_id) = (conversation_id.trim(), message_id.trim());
    if conversation_id.is_empty() || message_id.is_empty() {
        return Err(ServerError::Validation(
            "Conversation ID and Message ID are required".into(),
        ));
    }
    if !is_valid_id(conversation_id) || !is_valid_id(message_id) {
        return Err(ResultKeyError::InvalidId.into());
    }

    let data = state
        .upstream
        .get_message(&creds, conversation_id, message_id)
        .await?;
    Ok(Json(data))
}

/// Fetch query result rows addressed by three path segments.
#[utoipa::path(
    get,
    path = "/api/genie/results/{conversation_id}/{message_id}/{attachment_id}",
    tag = "genie",
    params(
        ("conversation_id" = String, Path, description = "Genie conversation id"),
        ("message_id" = String, Path, description = "Genie message id"),
        ("attachment_id" = String, Path, description = "Query attachment id"),
    ),
    responses(
        (status = 200, description = "Remote query result", body = Value),
        (status = 400, description = "Missing id", body = ErrorBody),
        (status = 500, description = "Configuration or transport error", body = ErrorBody),
    )
)]
pub async fn fetch_results(
    State(state): State<Arc<AppState>>,
    Path((conversation_id, message_id, attachment_id)): Path<(String, String, String)>,
) -> Result<Json<Value>, ServerError> {
    info!("Genie results request received");
    let creds = state.credentials.load()?;
    let key = ResultKey::new(conversation_id, message_id, attachment_id)?;
    let data = state.upstream.get_query_result(&creds, &key).await?;
    Ok(Json(data))
}

/// Fetch query result rows addressed by one composite statement id
/// (`conversation/message/attachment`, percent-encoded as one segment).
#[utoipa::path(
    get,
    path = "/api/genie/results/{statement_id}",
    tag = "genie",
    params(
        ("statement_id" = String, Path, description = "Composite `conversation/message/attachment` id"),
    ),
    responses(
        (status = 200, description = "Remote query result", body = Value),
        (status = 400, description = "Invalid statement ID format", body = ErrorBody),
        (status = 500, description = "Configuration or transport error", body = ErrorBody),
    )
)]
pub async fn fetch_statement_results(
    State(state): State<Arc<AppState>>,
    Path(statement_id): Path<String>,
) -> Result<Json<Value>, ServerError> {
    info!("Genie statement results request received");
    let creds = state.credentials.load()?;
    let key = ResultKey::parse_statement_id(&statement_id)?;
    let data = state.upstream.get_query_result(&creds, &key).await?;
    Ok(Json(data))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;
    use tracing_test::traced_test;

    use crate::config::Config;
    use crate::error::{CONFIG_ERROR_DETAILS, CONFIG_ERROR_MESSAGE};
    use crate::routes::test_support::{
        configured, state_with, state_with_config, unconfigured, RecordingUpstream,
    };
    use crate::routes;

    use super::*;

    async fn call(
        app: Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn app(state: Arc<AppState>) -> Router {
        routes::build(state)
    }

    // ── configuration ────────────────────────────────────────────────────────

    #[tokio::test]
    #[traced_test]
    async fn unconfigured_submit_short_circuits_without_remote_calls() {
        let upstream = RecordingUpstream::default();
        let calls = upstream.calls.clone();
        let sources = [
            unconfigured(),
            crate::config::CredentialSource::Fixed {
                workspace_url: Some("https://example.com".into()),
                access_token: Some("PLACEHOLDER-secret-token".into()),
                space_id: Some("space-1".into()),
            },
        ];

        for source in sources {
            let state = state_with(source, upstream.clone());
            let (status, body) = call(
                app(state),
                "POST",
                "/api/genie/chat",
                Some(json!({ "message": "Who won in 2008?" })),
            )
            .await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body["error"], CONFIG_ERROR_MESSAGE);
            assert_eq!(body["details"], CONFIG_ERROR_DETAILS);
        }
        assert_eq!(calls.lock().unwrap().len(), 0);
        assert!(!logs_contain("PLACEHOLDER-secret-token"));
    }

    #[tokio::test]
    async fn unconfigured_poll_and_results_short_circuit() {
        let upstream = RecordingUpstream::default();
        let calls = upstream.calls.clone();
        let state = state_with(unconfigured(), upstream);

        let (status, _) = call(app(state.clone()), "GET", "/api/genie/poll/c/m", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let (status, _) = call(app(state), "GET", "/api/genie/results/c/m/a", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(calls.lock().unwrap().is_empty());
    }

    // ── submit ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn blank_message_is_rejected_before_any_call() {
        let upstream = RecordingUpstream::default();
        let calls = upstream.calls.clone();
        let state = state_with(configured(), upstream);

        for body in [json!({ "message": "   " }), json!({}), json!({ "message": null })] {
            let (status, resp) = call(app(state.clone()), "POST", "/api/genie/chat", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(resp, json!({ "error": "Message is required" }));
        }

        // Not even JSON.
        let resp = app(state)
            .oneshot(
                Request::post("/api/genie/chat")
                    .body(Body::from("garbage"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn first_message_starts_a_conversation() {
        let upstream = RecordingUpstream::replying(json!({
            "conversation_id": "conv-1",
            "message_id": "msg-1",
        }));
        let calls = upstream.calls.clone();
        let state = state_with(configured(), upstream);

        let (status, body) = call(
            app(state),
            "POST",
            "/api/genie/chat",
            Some(json!({ "message": "  Who won in 2008?  " })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "conversation_id": "conv-1", "message_id": "msg-1" }));
        assert_eq!(
            *calls.lock().unwrap(),
            ["start_conversation(Who won in 2008?)"]
        );
    }

    #[tokio::test]
    async fn follow_up_continues_the_conversation() {
        let upstream = RecordingUpstream::default();
        let calls = upstream.calls.clone();
        let state = state_with(configured(), upstream);

        let (status, _) = call(
            app(state.clone()),
            "POST",
            "/api/genie/chat",
            Some(json!({ "message": "and 2009?", "conversationId": "conv-1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // A blank id counts as absent.
        call(
            app(state),
            "POST",
            "/api/genie/chat",
            Some(json!({ "message": "hello", "conversationId": " " })),
        )
        .await;

        assert_eq!(
            *calls.lock().unwrap(),
            ["create_message(conv-1, and 2009?)", "start_conversation(hello)"]
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn upstream_failure_forwards_status_with_generic_body() {
        let upstream = RecordingUpstream::failing(StatusCode::FORBIDDEN);
        let state = state_with(configured(), upstream);

        let (status, body) = call(
            app(state),
            "POST",
            "/api/genie/chat",
            Some(json!({ "message": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(
            body,
            json!({ "error": "Failed to communicate with Genie", "details": "Status: 403" })
        );
        assert!(!logs_contain("dapi-test-token"));
    }

    #[tokio::test]
    async fn transport_failure_is_500_with_message() {
        let upstream = RecordingUpstream::unreachable("connection refused");
        let state = state_with(configured(), upstream);

        let (status, body) = call(app(state), "GET", "/api/genie/poll/c/m", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({ "error": "Internal server error", "message": "connection refused" })
        );
    }

    // ── poll ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn poll_forwards_remote_body() {
        let upstream = RecordingUpstream::replying(json!({ "status": "PENDING" }));
        let calls = upstream.calls.clone();
        let state = state_with(configured(), upstream);

        let (status, body) = call(app(state), "GET", "/api/genie/poll/conv-1/msg-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "PENDING");
        assert_eq!(*calls.lock().unwrap(), ["get_message(conv-1, msg-1)"]);
    }

    #[tokio::test]
    async fn poll_rejects_blank_ids() {
        let upstream = RecordingUpstream::default();
        let calls = upstream.calls.clone();
        let state = state_with(configured(), upstream);

        let (status, body) = call(app(state), "GET", "/api/genie/poll/%20/msg-1", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Conversation ID and Message ID are required");
        assert!(calls.lock().unwrap().is_empty());
    }

    // ── results ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn attachment_path_results_forward_three_ids() {
        let upstream = RecordingUpstream::default();
        let calls = upstream.calls.clone();
        let state = state_with(configured(), upstream);

        let (status, _) = call(app(state.clone()), "GET", "/api/genie/results/c1/m1/a1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(*calls.lock().unwrap(), ["get_query_result(c1/m1/a1)"]);

        // The statement route is not mounted under this strategy.
        let (status, _) = call(app(state), "GET", "/api/genie/results/c1%2Fm1%2Fa1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn statement_results_split_composite_id() {
        let upstream = RecordingUpstream::default();
        let calls = upstream.calls.clone();
        let config = Config {
            results_strategy: ResultsStrategy::StatementId,
            ..Config::default()
        };
        let state = state_with_config(config, configured(), upstream);

        let (status, _) = call(
            app(state.clone()),
            "GET",
            "/api/genie/results/abc%2Fdef%2Fghi",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) =
            call(app(state), "GET", "/api/genie/results/abc%2Fdef", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid statement ID format");

        assert_eq!(*calls.lock().unwrap(), ["get_query_result(abc/def/ghi)"]);
    }

    #[tokio::test]
    async fn results_upstream_failure_uses_results_message() {
        let upstream = RecordingUpstream::failing(StatusCode::NOT_FOUND);
        let state = state_with(configured(), upstream);

        let (status, body) = call(app(state), "GET", "/api/genie/results/c/m/a", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Failed to fetch query results");
    }

    // ── id validation ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn traversal_ids_are_rejected_before_any_call() {
        let upstream = RecordingUpstream::default();
        let calls = upstream.calls.clone();
        let state = state_with(configured(), upstream);

        for uri in [
            "/api/genie/poll/..%2F..%2F..%2F..%2F..%2F2.0%2Fsecrets%2Fscopes%2Flist%3F/x",
            "/api/genie/poll/conv-1/..",
            "/api/genie/poll/conv-1/msg%3Fpage_token%3D1",
            "/api/genie/results/conv-1/msg-1/..%2F..%2Fquery-result",
            "/api/genie/results/conv-1/msg-1/att%231",
        ] {
            let (status, body) = call(app(state.clone()), "GET", uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()), "{uri}");
        }

        let (status, body) = call(
            app(state),
            "POST",
            "/api/genie/chat",
            Some(json!({ "message": "hello", "conversationId": "../../../2.0/secrets" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid ID format" }));

        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn traversal_statement_id_is_rejected() {
        let upstream = RecordingUpstream::default();
        let calls = upstream.calls.clone();
        let config = Config {
            results_strategy: ResultsStrategy::StatementId,
            ..Config::default()
        };
        let state = state_with_config(config, configured(), upstream);

        for uri in [
            "/api/genie/results/..%2F..%2Fsecrets",
            "/api/genie/results/c%2Fm%2Fa%3Flist",
        ] {
            let (status, body) = call(app(state.clone()), "GET", uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"], "Invalid statement ID format");
        }
        assert!(calls.lock().unwrap().is_empty());
    }
}
