use crate::app_config::AppConfig;
use anyhow::{anyhow, Error as AnyError};
use assembly_infra::web::WebAppConfig;
use assembly_voting::{
    ballot::BallotValue,
    broadcast::BroadcastHub,
    identity::{ClientIdentity, IdentityRegistry},
    session::VotingSessions,
    tally::ParticipantRoster,
};
use std::sync::Arc;

struct Inner {
    identities: IdentityRegistry,
    sessions: VotingSessions,
    roster: Arc<ParticipantRoster>,
    default_allowed_values: Vec<BallotValue>,
    monitor_channel_warn_threshold: usize,
    monitor_channel_close_threshold: usize,
}

#[derive(Clone)]
pub struct AppState(Arc<Inner>);

impl AppState {
    pub async fn new(config: &WebAppConfig<AppConfig>) -> Result<Self, AnyError> {
        Self::from_config(&config.feature)
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AnyError> {
        if config.monitor_channel_close_threshold < config.monitor_channel_warn_threshold {
            return Err(anyhow!(
                "Close threshold ({}) is below the warn threshold ({})",
                config.monitor_channel_close_threshold,
                config.monitor_channel_warn_threshold
            ));
        }

        let labels = config
            .participants
            .iter()
            .map(|(token, label)| {
                let identity = ClientIdentity::parse(token).ok_or_else(|| anyhow!("Invalid participant token: {token}"))?;
                Ok((identity, label.clone()))
            })
            .collect::<Result<Vec<_>, AnyError>>()?;
        log::info!("Participant roster seeded with {} label(s)", labels.len());

        let roster = Arc::new(ParticipantRoster::with_labels(labels));
        let sessions = VotingSessions::new(BroadcastHub::new(), roster.clone());

        Ok(Self(Arc::new(Inner {
            identities: IdentityRegistry::new(),
            sessions,
            roster,
            default_allowed_values: config.default_allowed_values.clone(),
            monitor_channel_warn_threshold: config.monitor_channel_warn_threshold,
            monitor_channel_close_threshold: config.monitor_channel_close_threshold,
        })))
    }

    pub fn identities(&self) -> &IdentityRegistry {
        &self.0.identities
    }

    pub fn sessions(&self) -> &VotingSessions {
        &self.0.sessions
    }

    pub fn hub(&self) -> &BroadcastHub {
        self.0.sessions.hub()
    }

    pub fn roster(&self) -> &ParticipantRoster {
        &self.0.roster
    }

    pub fn default_allowed_values(&self) -> &[BallotValue] {
        &self.0.default_allowed_values
    }

    pub fn monitor_channel_warn_threshold(&self) -> usize {
        self.0.monitor_channel_warn_threshold
    }

    pub fn monitor_channel_close_threshold(&self) -> usize {
        self.0.monitor_channel_close_threshold
    }
}
