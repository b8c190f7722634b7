use crate::telemetry::TelemetryConfig;
use anyhow::{anyhow, Error as AnyError};
use serde::de::DeserializeOwned;
use std::{fmt::Debug, path::PathBuf};

use super::{CoreConfig, Environment, ServiceConfig};

/// Configuration of the application specific features, loaded from the section `NAME`.
pub trait FeatureConfig: DeserializeOwned + Debug + Send + Sync + 'static {
    const NAME: &'static str;
}

#[derive(Debug, Clone)]
pub struct WebAppConfig<F> {
    pub core: CoreConfig,
    pub service: ServiceConfig,
    pub telemetry: TelemetryConfig,
    pub feature: F,
}

impl<F> WebAppConfig<F>
where
    F: FeatureConfig,
{
    pub fn load(stage: &str, config_file: Option<PathBuf>) -> Result<Self, AnyError> {
        Self::load_with(stage, config_file, Environment::new())
    }

    /// Load the configuration using the given environment source.
    pub fn load_with(stage: &str, config_file: Option<PathBuf>, environment: Environment) -> Result<Self, AnyError> {
        let pre_init = CoreConfig::new(stage, config_file)?;
        let config = pre_init.create_config_builder_with(environment)?.build()?;

        let core: CoreConfig = config.clone().try_deserialize()?;
        let cfg = Self {
            core,
            service: config.get("service")?,
            telemetry: config.get("telemetry")?,
            feature: config.get(F::NAME)?,
        };
        log::info!("Config loaded: {:#?}", cfg);

        if pre_init != cfg.core {
            Err(anyhow!("Core config mismatch"))
        } else {
            Ok(cfg)
        }
    }
}
