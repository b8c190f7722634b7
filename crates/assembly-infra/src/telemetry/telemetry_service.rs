use std::sync::{Arc, RwLock};
use tracing_subscriber::{
    filter::EnvFilter,
    fmt,
    layer::SubscriberExt,
    reload::{self, Handle as ReloadHandle},
    Layer, Registry,
};

use super::{LogFormat, TelemetryBuildError, TelemetryConfig, TelemetryError};

#[derive(Debug, Clone)]
pub struct DynConfig {
    pub filter: String,
}

struct FilterHandle {
    handle: ReloadHandle<EnvFilter, Registry>,
    config: DynConfig,
}

impl FilterHandle {
    fn set_configuration(&mut self, mut new_config: DynConfig) -> Result<(), String> {
        new_config.filter.retain(|c| !c.is_whitespace());
        let new_filter = new_config.filter.parse::<EnvFilter>().map_err(|e| format!("{e}"))?;
        self.handle.reload(new_filter).map_err(|e| format!("{e}"))?;
        self.config = new_config;
        Ok(())
    }
}

/// Telemetry service.
///
/// The tracing crate is used as the frontend, the log::trace,debug,info,warn,error! macros are
/// also available and channelled to the tracing layer. When enabled, the filter can be replaced
/// at runtime.
#[derive(Clone)]
pub struct TelemetryService {
    service_name: &'static str,
    reconfigure: Option<Arc<RwLock<FilterHandle>>>,
}

impl TelemetryService {
    pub fn new(service_name: &'static str, config: &TelemetryConfig) -> Result<Self, TelemetryBuildError> {
        let mut service = TelemetryService {
            service_name,
            reconfigure: None,
        };
        service.install_tracing(config)?;
        Ok(service)
    }

    pub fn service_name(&self) -> &'static str {
        self.service_name
    }

    fn install_tracing(&mut self, config: &TelemetryConfig) -> Result<(), TelemetryBuildError> {
        let filter = config.default_level.as_deref().unwrap_or("warn");
        let env_filter = EnvFilter::builder().parse(filter)?;
        let (filter_layer, reload_handle) = reload::Layer::new(env_filter);
        if config.allow_reconfigure {
            log::debug!("Registering dynamic filter tracing layer...");
            self.reconfigure = Some(Arc::new(RwLock::new(FilterHandle {
                handle: reload_handle,
                config: DynConfig {
                    filter: filter.to_string(),
                },
            })));
        }

        let console_layer = if config.enable_console_log {
            log::debug!("Registering console log tracing layer ({:?})...", config.format);
            let layer = match config.format {
                LogFormat::Compact => fmt::layer().compact().boxed(),
                LogFormat::Pretty => fmt::layer().pretty().boxed(),
                LogFormat::Json => fmt::layer().json().boxed(),
            };
            Some(layer)
        } else {
            None
        };

        let pipeline = tracing_subscriber::registry().with(filter_layer).with(console_layer);

        // SubscriberInitExt::init cannot be used as the LogTracer is installed already for the pre-init phase,
        // it would fail with a double install error.
        tracing::dispatcher::set_global_default(pipeline.into())?;
        Ok(())
    }

    pub fn set_configuration(&self, config: DynConfig) -> Result<(), TelemetryError> {
        let reconfigure = self.reconfigure.as_ref().ok_or(TelemetryError::TraceNoReconfigure)?;
        reconfigure
            .write()
            .unwrap_or_else(|err| err.into_inner())
            .set_configuration(config)
            .map_err(TelemetryError::TraceUpdateConfig)
    }

    pub fn get_configuration(&self) -> Result<DynConfig, TelemetryError> {
        let reconfigure = self.reconfigure.as_ref().ok_or(TelemetryError::TraceNoReconfigure)?;
        let reconfigure = reconfigure.read().unwrap_or_else(|err| err.into_inner());
        Ok(reconfigure.config.clone())
    }
}
