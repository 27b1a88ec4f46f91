mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{
    BrokerSettings, LogSettings, ServerSettings, Settings, StoreBackend, StoreSettings,
};

/// Prefix for environment overrides, e.g. `JOBCAST__SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "JOBCAST";

/// Loads the configuration from `config/default` (if present) and
/// `JOBCAST__*` environment variables, merged over the built-in defaults.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge_over(Settings::default()))
}

#[cfg(test)]
mod tests;
