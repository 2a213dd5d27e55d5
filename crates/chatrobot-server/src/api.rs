use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Query, State},
    http::Method,
    routing::{get, post},
    Json, Router,
};
use chatrobot_shared::constants::{DEFAULT_CONVERSATION_TITLE, DEFAULT_USER_NAME};
use chatrobot_shared::relay::{Ack, ConversationCreated, MessagesResponse, UploadImageResponse};
use chatrobot_shared::MessageStatus;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::db::{NewRemoteMessage, RelayDb};
use crate::error::ServerError;
use crate::image_store::ImageStore;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<RelayDb>,
    pub images: Arc<ImageStore>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/messages", post(post_message).get(list_messages))
        .route("/uploadImage", post(upload_image))
        .route("/users", post(upsert_user))
        .route("/conversations", post(create_conversation))
        .nest_service("/static", ServeDir::new(state.images.base_path()))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// `POST /messages` body as sent by clients.  Every field is optional here
/// so missing ones surface as a 400 with a reason instead of a serde
/// rejection.
#[derive(Deserialize)]
struct MessageBody {
    name: Option<String>,
    time: Option<i64>,
    content: Option<String>,
    user_id: Option<i64>,
    is_self: Option<bool>,
    session_id: Option<i64>,
    image_uri: Option<String>,
    status: Option<String>,
}

#[derive(Deserialize)]
struct MessagesQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

#[derive(Deserialize)]
struct UploadBody {
    base64: Option<String>,
}

#[derive(Deserialize)]
struct UserBody {
    account: Option<String>,
    password_hash: Option<String>,
    name: Option<String>,
}

#[derive(Deserialize)]
struct ConversationBody {
    user_id: Option<i64>,
    title: Option<String>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Unwrap a JSON body, turning malformed input into a 400.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServerError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ServerError::BadRequest(e.body_text()))
}

fn required_text(value: Option<String>, field: &str) -> Result<String, ServerError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServerError::BadRequest(format!("missing {}", field)))
}

fn required_id(value: Option<i64>, field: &str) -> Result<i64, ServerError> {
    value
        .filter(|v| *v != 0)
        .ok_or_else(|| ServerError::BadRequest(format!("missing {}", field)))
}

impl TryFrom<MessageBody> for NewRemoteMessage {
    type Error = ServerError;

    fn try_from(body: MessageBody) -> Result<Self, Self::Error> {
        Ok(Self {
            name: required_text(body.name, "name")?,
            time: required_id(body.time, "time")?,
            content: required_text(body.content, "content")?,
            user_id: required_id(body.user_id, "user_id")?,
            is_self: body
                .is_self
                .ok_or_else(|| ServerError::BadRequest("missing is_self".to_string()))?,
            session_id: required_id(body.session_id, "session_id")?,
            image_uri: body.image_uri.filter(|uri| !uri.is_empty()),
            status: body
                .status
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| MessageStatus::Sent.as_str().to_string()),
        })
    }
}

async fn post_message(
    State(state): State<AppState>,
    payload: Result<Json<MessageBody>, JsonRejection>,
) -> Result<Json<Ack>, ServerError> {
    let message = NewRemoteMessage::try_from(body(payload)?)?;
    let id = state.db.insert_message(&message)?;
    debug!(id, session = message.session_id, "Message mirrored");
    Ok(Json(Ack { ok: true }))
}

async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<MessagesResponse>, ServerError> {
    let session_id = query
        .session_id
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|id| *id != 0)
        .ok_or_else(|| ServerError::BadRequest("missing sessionId".to_string()))?;

    let data = state.db.messages_for_session(session_id)?;
    Ok(Json(MessagesResponse { ok: true, data }))
}

async fn upload_image(
    State(state): State<AppState>,
    payload: Result<Json<UploadBody>, JsonRejection>,
) -> Result<Json<UploadImageResponse>, ServerError> {
    let encoded = required_text(body(payload)?.base64, "base64")?;
    let name = state.images.store_base64(&encoded).await?;

    info!(name = %name, "Image uploaded");

    Ok(Json(UploadImageResponse {
        ok: true,
        path: format!("/static/{}", name),
    }))
}

async fn upsert_user(
    State(state): State<AppState>,
    payload: Result<Json<UserBody>, JsonRejection>,
) -> Result<Json<Ack>, ServerError> {
    let user = body(payload)?;
    let account = required_text(user.account, "account")?;
    let password_hash = required_text(user.password_hash, "password_hash")?;
    let name = user
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_USER_NAME.to_string());

    state.db.upsert_user(&account, &password_hash, &name)?;
    Ok(Json(Ack { ok: true }))
}

async fn create_conversation(
    State(state): State<AppState>,
    payload: Result<Json<ConversationBody>, JsonRejection>,
) -> Result<Json<ConversationCreated>, ServerError> {
    let conversation = body(payload)?;
    let user_id = required_id(conversation.user_id, "user_id")?;
    let title = conversation
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_CONVERSATION_TITLE.to_string());

    let id = state.db.insert_conversation(user_id, &title)?;
    debug!(id, user_id, "Conversation mirrored");
    Ok(Json(ConversationCreated { ok: true, id }))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "HTTP server listening");
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use base64::Engine;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn test_state() -> (AppState, TempDir) {
        let dir = TempDir::new().unwrap();
        let images = ImageStore::new(dir.path().join("uploads")).await.unwrap();
        let state = AppState {
            db: Arc::new(RelayDb::open_in_memory().unwrap()),
            images: Arc::new(images),
            config: Arc::new(ServerConfig::default()),
        };
        (state, dir)
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn message(time: i64, content: &str, is_self: bool) -> Value {
        json!({
            "name": if is_self { "用户" } else { "AI" },
            "time": time,
            "content": content,
            "user_id": 1,
            "is_self": is_self,
            "session_id": 5,
            "image_uri": null,
            "status": "sent",
        })
    }

    #[tokio::test]
    async fn test_health_check() {
        let (state, _dir) = test_state().await;
        let router = build_router(state);
        let (status, body) = send(&router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_mirrored_messages_listed_in_time_order() {
        let (state, _dir) = test_state().await;
        let router = build_router(state);

        let (status, body) = send(&router, post_json("/messages", message(20, "你好！", false))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));
        send(&router, post_json("/messages", message(10, "你好", true))).await;

        let (status, body) = send(&router, get("/messages?sessionId=5")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["content"], "你好");
        assert_eq!(data[0]["is_self"], true);
        assert_eq!(data[1]["content"], "你好！");
        assert_eq!(data[1]["image_uri"], Value::Null);
    }

    #[tokio::test]
    async fn test_message_missing_field_is_rejected() {
        let (state, _dir) = test_state().await;
        let router = build_router(state);

        let mut missing_content = message(10, "x", true);
        missing_content.as_object_mut().unwrap().remove("content");
        let (status, body) = send(&router, post_json("/messages", missing_content)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);

        let mut missing_is_self = message(10, "x", true);
        missing_is_self.as_object_mut().unwrap().remove("is_self");
        let (status, _) = send(&router, post_json("/messages", missing_is_self)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let mut zero_session = message(10, "x", true);
        zero_session["session_id"] = json!(0);
        let (status, _) = send(&router, post_json("/messages", zero_session)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_message_status_defaults_to_sent() {
        let (state, _dir) = test_state().await;
        let router = build_router(state);

        let mut no_status = message(10, "x", true);
        no_status.as_object_mut().unwrap().remove("status");
        let (status, _) = send(&router, post_json("/messages", no_status)).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&router, get("/messages?sessionId=5")).await;
        assert_eq!(body["data"][0]["status"], "sent");
    }

    #[tokio::test]
    async fn test_list_messages_requires_session() {
        let (state, _dir) = test_state().await;
        let router = build_router(state);

        for uri in ["/messages", "/messages?sessionId=0", "/messages?sessionId=abc"] {
            let (status, body) = send(&router, get(uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["ok"], false);
        }
    }

    #[tokio::test]
    async fn test_upload_image_is_served_from_static() {
        let (state, _dir) = test_state().await;
        let router = build_router(state);

        let encoded = base64::engine::general_purpose::STANDARD.encode(b"fake png");
        let (status, body) = send(&router, post_json("/uploadImage", json!({ "base64": encoded }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        let path = body["path"].as_str().unwrap().to_string();
        assert!(path.starts_with("/static/"));
        assert!(path.ends_with(".png"));

        let response = router.clone().oneshot(get(&path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"fake png");
    }

    #[tokio::test]
    async fn test_upload_image_requires_base64() {
        let (state, _dir) = test_state().await;
        let router = build_router(state);

        let (status, body) = send(&router, post_json("/uploadImage", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);

        let (status, _) = send(&router, post_json("/uploadImage", json!({ "base64": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_users_upsert() {
        let (state, _dir) = test_state().await;
        let router = build_router(state);

        let (status, body) = send(
            &router,
            post_json("/users", json!({ "account": "alice", "password_hash": "h" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));

        let (status, _) = send(
            &router,
            post_json("/users", json!({ "account": "alice", "password_hash": "h2", "name": "Alice" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&router, post_json("/users", json!({ "account": "bob" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_conversation() {
        let (state, _dir) = test_state().await;
        let router = build_router(state);

        let (status, body) = send(&router, post_json("/conversations", json!({ "user_id": 3 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        let first = body["id"].as_i64().unwrap();
        assert!(first > 0);

        let (_, body) = send(
            &router,
            post_json("/conversations", json!({ "user_id": 3, "title": "聊天" })),
        )
        .await;
        assert!(body["id"].as_i64().unwrap() > first);

        let (status, _) = send(&router, post_json("/conversations", json!({ "title": "x" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let (state, _dir) = test_state().await;
        let router = build_router(state);

        let request = Request::builder()
            .method("POST")
            .uri("/conversations")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
    }
}
