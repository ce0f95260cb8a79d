use crate::agent::AIAgent;
use crate::cli::Args;
use crate::error::{ AppError, StatusMessage };
use crate::models::chat::{ ChatMessage, Session };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    body::Bytes,
    routing::{ delete, get, post },
    Router,
    extract::{ Path, State },
    response::IntoResponse,
    http::StatusCode,
    Json,
};
use serde::{ Deserialize, Serialize };
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, error };

#[derive(Deserialize, Default)]
struct SendMessageRequest {
    message: Option<String>,
}

#[derive(Serialize)]
struct SessionResponse {
    status: &'static str,
    session: Session,
}

#[derive(Serialize)]
struct SessionListResponse {
    status: &'static str,
    sessions: Vec<Session>,
}

#[derive(Serialize)]
struct MessagesResponse {
    status: &'static str,
    messages: Vec<ChatMessage>,
}

#[derive(Clone)]
struct AppState {
    agent: Arc<AIAgent>,
}

pub fn router(agent: Arc<AIAgent>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/sessions", post(create_session_handler).get(list_sessions_handler))
        .route("/api/sessions/{session_id}", delete(delete_session_handler))
        .route("/api/sessions/{session_id}/messages", post(send_message_handler))
        .layer(cors)
        .with_state(AppState { agent })
}

pub async fn start_http_server(
    addr: &str,
    agent: Arc<AIAgent>,
    args: &Args,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = addr.parse::<SocketAddr>()?;
    let app = router(agent);

    match (args.enable_tls, &args.tls_cert_path, &args.tls_key_path) {
        (true, Some(cert_path), Some(key_path)) => {
            info!(
                "TLS enabled. Loading certificate from '{}' and key from '{}'",
                cert_path,
                key_path
            );
            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                cert_path,
                key_path
            ).await?;

            info!("Starting HTTPS API server on: https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        (true, _, _) => {
            error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
            return Err("Missing TLS certificate or key path".into());
        }
        (false, _, _) => {
            let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
                format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e)
            })?;
            info!("Starting HTTP API server on: http://{}", addr);
            axum::serve(listener, app.into_make_service()).await?;
        }
    }

    Ok(())
}

async fn health_handler() -> impl IntoResponse {
    Json(StatusMessage::success("ok"))
}

async fn create_session_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.agent.create_session().await?;
    Ok((StatusCode::CREATED, Json(SessionResponse { status: "success", session })))
}

async fn list_sessions_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let sessions = state.agent.list_sessions().await?;
    Ok(Json(SessionListResponse { status: "success", sessions }))
}

async fn delete_session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.agent.delete_session(&session_id).await?;
    Ok(Json(StatusMessage::success("Session deleted successfully")))
}

async fn send_message_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    // A malformed body is treated like a missing message; the agent decides
    // between 404 and 400.
    let req: SendMessageRequest = serde_json::from_slice(&body).unwrap_or_default();
    let (user_message, ai_message) = state.agent
        .send_message(&session_id, req.message.as_deref())
        .await?;

    Ok(Json(MessagesResponse {
        status: "success",
        messages: vec![user_message, ai_message],
    }))
}
