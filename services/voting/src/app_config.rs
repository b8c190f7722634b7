use assembly_infra::web::FeatureConfig;
use assembly_voting::ballot::BallotValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_allowed_values() -> Vec<BallotValue> {
    BallotValue::ALL.to_vec()
}

fn default_monitor_channel_warn_threshold() -> usize {
    256
}

fn default_monitor_channel_close_threshold() -> usize {
    4096
}

/// The application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Ballot values of the sessions created without an explicit list.
    #[serde(default = "default_allowed_values")]
    pub default_allowed_values: Vec<BallotValue>,
    /// Number of undelivered messages of a connection after which a slow client is reported.
    #[serde(default = "default_monitor_channel_warn_threshold")]
    pub monitor_channel_warn_threshold: usize,
    /// Number of undelivered messages of a connection after which the connection is closed.
    #[serde(default = "default_monitor_channel_close_threshold")]
    pub monitor_channel_close_threshold: usize,
    /// Display labels of the known participants by identity token.
    #[serde(default)]
    pub participants: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_allowed_values: default_allowed_values(),
            monitor_channel_warn_threshold: default_monitor_channel_warn_threshold(),
            monitor_channel_close_threshold: default_monitor_channel_close_threshold(),
            participants: HashMap::new(),
        }
    }
}

impl FeatureConfig for AppConfig {
    const NAME: &'static str = "voting";
}
