use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::Environment;

pub const DEFAULT_VERSION_CONFIG_FILE: &str = "server_version.json";

/// Partial configuration required for early setup.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CoreConfig {
    pub stage: String,
    pub version: String,
    #[serde(default)]
    pub before_layers: Vec<String>,
    #[serde(default)]
    pub after_layers: Vec<String>,
    pub root_file: String,
}

#[derive(Debug)]
enum Layer<'a> {
    Base,
    Environment,
    File { url: &'a str, path: Option<&'a str>, optional: bool },
}

impl<'a> Layer<'a> {
    fn from_layer(layer: &'a str) -> Result<Self, ConfigError> {
        if layer == "environment" {
            return Ok(Layer::Environment);
        }

        let mut tokens = layer.splitn(2, "://");
        let schema = tokens.next().unwrap_or_default();
        let path = tokens.next();
        match schema {
            "file" => Ok(Layer::File {
                url: layer,
                path,
                optional: false,
            }),
            "file?" => Ok(Layer::File {
                url: layer,
                path,
                optional: true,
            }),
            _ => Err(ConfigError::FileParse {
                uri: Some(layer.to_owned()),
                cause: format!("Unsupported schema, {schema}").into(),
            }),
        }
    }
}

impl CoreConfig {
    pub fn new(stage: &str, config_file: Option<PathBuf>) -> Result<Self, ConfigError> {
        log::info!("Loading configuration for {}", stage);

        let root_file = config_file.unwrap_or_else(|| PathBuf::from(format!("server_config.{}.json", stage)));
        let mut builder = Config::builder().add_source(File::from(root_file.as_path()));

        let version_path = Path::new(DEFAULT_VERSION_CONFIG_FILE);
        if version_path.exists() {
            builder = builder.add_source(File::from(version_path));
        } else {
            log::warn!("No version file found at {}", version_path.display());
            builder = builder.set_default("version", "custom")?;
        }

        builder = builder
            .set_override("stage", stage)?
            .set_override("rootFile", root_file.to_string_lossy().into_owned())?;

        let cfg: CoreConfig = builder.build()?.try_deserialize()?;
        log::debug!("pre-init configuration: {:#?}", cfg);
        Ok(cfg)
    }

    /// Create the builder of the full configuration: the `before_layers`, the root file and the `after_layers`
    /// in this order, later layers overriding the earlier ones.
    pub fn create_config_builder(&self) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        self.create_config_builder_with(Environment::new())
    }

    pub(crate) fn create_config_builder_with(
        &self,
        environment: Environment,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        log::debug!("Setting up configuration builder...");
        let mut builder = Config::builder();

        let mut layers = Vec::with_capacity(self.before_layers.len() + self.after_layers.len() + 1);
        for layer in &self.before_layers {
            layers.push(Layer::from_layer(layer)?);
        }
        layers.push(Layer::Base);
        for layer in &self.after_layers {
            layers.push(Layer::from_layer(layer)?);
        }

        for layer in layers {
            log::debug!("Adding layer: {:?}", layer);
            match layer {
                Layer::Base => {
                    builder = builder.add_source(File::from(Path::new(&self.root_file)));
                }
                Layer::Environment => {
                    builder = builder.add_source(environment.clone());
                }
                Layer::File { url, path, optional } => {
                    let path = path.filter(|p| !p.is_empty()).ok_or(ConfigError::FileParse {
                        uri: Some(url.to_owned()),
                        cause: "Missing file path".into(),
                    })?;

                    if !optional {
                        builder = builder.add_source(File::from(Path::new(path)));
                    } else if Path::new(path).exists() {
                        log::info!("Adding optional config file {}...", path);
                        builder = builder.add_source(File::from(Path::new(path)));
                    } else {
                        log::debug!("Optional config file {} is missing", path);
                    }
                }
            }
        }

        // these properties cannot be altered wrt the core config
        builder = builder
            .set_override("stage", self.stage.clone())?
            .set_override("version", self.version.clone())?
            .set_override("rootFile", self.root_file.clone())?;

        Ok(builder)
    }
}
