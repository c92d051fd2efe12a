//! HTTP/JSON surface of the gateway.
//!
//! Every route maps to one [`SafeClient`] call. Transport failures become
//! `500 {"detail": ...}`, malformed request bodies `422 {"detail": ...}`.

use crate::{
    protocol::Aggregate,
    register_map::{ConfigurationUpdate, FunctionsUpdate, ResourceGroup},
    tokio_async_safe_client::SafeClient,
    tokio_common::TransportError,
};
use axum::{
    extract::{rejection::JsonRejection, FromRequest, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;

/// Errors surfaced to HTTP callers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Validation(#[from] JsonRejection),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::Transport(err) => {
                (StatusCode::INTERNAL_SERVER_ERROR, err.message().to_string())
            }
            ApiError::Validation(rejection) => {
                (StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text())
            }
        };
        log::warn!("Request failed with {status}: {detail}");
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// `Json` extractor whose rejections are reported as [`ApiError::Validation`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// Confirmation returned by the update routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acknowledgement {
    pub status: &'static str,
}

pub const CONFIGURATION_UPDATED: Acknowledgement = Acknowledgement {
    status: "Configuration updated",
};
pub const FUNCTIONS_UPDATED: Acknowledgement = Acknowledgement {
    status: "Functions updated",
};

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Builds the router with all resource routes bound to `client`.
pub fn router(client: SafeClient) -> Router {
    Router::new()
        .route("/api/version_info", get(get_version_info))
        .route("/api/status", get(get_status))
        .route(
            "/api/configuration",
            get(get_configuration).post(set_configuration),
        )
        .route("/api/output_measurements", get(get_output_measurements))
        .route("/api/charging_session", get(get_charging_session))
        .route("/api/functions", get(get_functions).post(set_functions))
        .route("/api/diagnostic", get(get_diagnostic))
        .with_state(client)
}

async fn read_group(client: &SafeClient, group: ResourceGroup) -> ApiResult<Aggregate> {
    Ok(Json(client.read_group(group).await?))
}

async fn get_version_info(State(client): State<SafeClient>) -> ApiResult<Aggregate> {
    read_group(&client, ResourceGroup::VersionInfo).await
}

async fn get_status(State(client): State<SafeClient>) -> ApiResult<Aggregate> {
    read_group(&client, ResourceGroup::Status).await
}

async fn get_configuration(State(client): State<SafeClient>) -> ApiResult<Aggregate> {
    read_group(&client, ResourceGroup::Configuration).await
}

async fn set_configuration(
    State(client): State<SafeClient>,
    AppJson(update): AppJson<ConfigurationUpdate>,
) -> ApiResult<Acknowledgement> {
    client.update_configuration(&update).await?;
    Ok(Json(CONFIGURATION_UPDATED))
}

async fn get_output_measurements(State(client): State<SafeClient>) -> ApiResult<Aggregate> {
    read_group(&client, ResourceGroup::OutputMeasurements).await
}

async fn get_charging_session(State(client): State<SafeClient>) -> ApiResult<Aggregate> {
    read_group(&client, ResourceGroup::ChargingSession).await
}

async fn get_functions(State(client): State<SafeClient>) -> ApiResult<Aggregate> {
    read_group(&client, ResourceGroup::Functions).await
}

async fn set_functions(
    State(client): State<SafeClient>,
    AppJson(update): AppJson<FunctionsUpdate>,
) -> ApiResult<Acknowledgement> {
    client.update_functions(&update).await?;
    Ok(Json(FUNCTIONS_UPDATED))
}

async fn get_diagnostic(State(client): State<SafeClient>) -> ApiResult<Aggregate> {
    read_group(&client, ResourceGroup::Diagnostic).await
}
