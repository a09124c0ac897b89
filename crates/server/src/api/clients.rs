use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use registry::ClientIdentity;
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct CreateClient {
    name: String,
    #[serde(default = "default_protocol")]
    protocol: String,
}

fn default_protocol() -> String {
    "openvpn".to_string()
}

#[derive(Debug, Serialize)]
pub(super) struct ClientList {
    clients: Vec<ClientIdentity>,
}

#[derive(Debug, Serialize)]
pub(super) struct Created {
    success: bool,
    message: String,
    client: ClientIdentity,
}

#[derive(Debug, Serialize)]
pub(super) struct Deleted {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

pub(super) async fn list(State(state): State<AppState>) -> Result<Json<ClientList>, ApiError> {
    let clients = state.coordinator.list_clients().await?;
    Ok(Json(ClientList { clients }))
}

pub(super) async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateClient>, JsonRejection>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let Json(request) = payload?;

    let client = state
        .coordinator
        .create_client(request.name.trim(), &request.protocol)
        .await?;

    let created = Created {
        success: true,
        message: format!("Client {} created successfully", client.name),
        client,
    };

    Ok((StatusCode::CREATED, Json(created)))
}

pub(super) async fn get(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<ClientIdentity>, ApiError> {
    Ok(Json(state.coordinator.get_client(&name).await?))
}

/// Serves the credential file as a download.
pub(super) async fn artifact(State(state): State<AppState>, Path(name): Path<String>) -> Result<Response, ApiError> {
    let artifact = state.coordinator.fetch_artifact(&name).await?;

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.file_name),
        ),
    ];

    Ok((headers, artifact.content).into_response())
}

pub(super) async fn delete(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<Deleted>, ApiError> {
    let revocation = state.coordinator.delete_client(&name).await?;

    Ok(Json(Deleted {
        success: true,
        message: format!("Client {} deleted successfully", revocation.name),
        warning: revocation.warning,
    }))
}
