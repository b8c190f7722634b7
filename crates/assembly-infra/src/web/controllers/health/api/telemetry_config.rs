use crate::{
    telemetry::{DynConfig, TelemetryService},
    web::{IntoProblemResponse, ProblemConfig, ProblemResponse},
};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct TraceConfig {
    pub filter: String,
}

#[utoipa::path(
    put,
    path = "/api/telemetry/config",
    tag = "health",
    description = "Update telemetry configuration.",
    request_body = TraceConfig,
    responses(
        (status = OK, description = "Telemetry configuration is updated.")
    )
)]
pub async fn put_telemetry_config(
    Extension(telemetry): Extension<TelemetryService>,
    Extension(problem_config): Extension<ProblemConfig>,
    Json(body): Json<TraceConfig>,
) -> Result<(), ProblemResponse> {
    log::trace!("reconfigure telemetry: {:#?}", body);
    telemetry
        .set_configuration(DynConfig { filter: body.filter })
        .map_err(|err| err.into_response(&problem_config))?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/telemetry/config",
    tag = "health",
    description = "Get the current telemetry configuration.",
    responses(
        (status = OK, body = TraceConfig)
    )
)]
pub async fn get_telemetry_config(
    Extension(telemetry): Extension<TelemetryService>,
    Extension(problem_config): Extension<ProblemConfig>,
) -> Result<Json<TraceConfig>, ProblemResponse> {
    let config = telemetry
        .get_configuration()
        .map_err(|err| err.into_response(&problem_config))?;

    Ok(Json(TraceConfig { filter: config.filter }))
}
