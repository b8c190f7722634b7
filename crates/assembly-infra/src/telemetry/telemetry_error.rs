use crate::web::Problem;
use thiserror::Error as ThisError;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::filter::ParseError;

#[derive(Debug, ThisError)]
pub enum TelemetryBuildError {
    #[error(transparent)]
    SetGlobalTracing(#[from] SetGlobalDefaultError),
    #[error("Default log format could not be parsed")]
    DefaultLogError(#[from] ParseError),
}

#[derive(Debug, ThisError)]
pub enum TelemetryError {
    #[error("Failed to update trace configuration: {0}")]
    TraceUpdateConfig(String),
    #[error("Reconfigure is not enabled")]
    TraceNoReconfigure,
}

impl From<TelemetryError> for Problem {
    fn from(value: TelemetryError) -> Self {
        match value {
            TelemetryError::TraceUpdateConfig(_) => Problem::bad_request("invalid-trace-filter")
                .with_detail(value.to_string())
                .with_sensitive_dbg(value),
            TelemetryError::TraceNoReconfigure => Problem::precondition_failed("trace-reconfigure-disabled")
                .with_detail(value.to_string()),
        }
    }
}
