use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryConfig {
    pub enable_console_log: bool,
    /// Initial filter in the env-filter format, `warn` if not given.
    pub default_level: Option<String>,
    /// Allow to replace the filter at runtime through the telemetry api.
    pub allow_reconfigure: bool,
    #[serde(default)]
    pub format: LogFormat,
}
