use std::path::Path;

use activity_schedule::DisplayOptions;
use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

const DEFAULT_TIMEZONE: &str = "Europe/Madrid";
const DEFAULT_LOCALE: &str = "es_ES";

/// Settings read from a TOML file. Every key is optional.
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub timezone: Option<String>,
    pub locale: Option<String>,
    pub date_format: Option<String>,
}

/// Load the config file, or defaults when no path was given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("parsing config file {}", path.display()))?;

    debug!(path = %path.display(), ?config, "loaded config");
    Ok(config)
}

/// Command line flags override the file, which overrides the built-in defaults.
pub fn display_options(
    config: &Config,
    timezone: Option<&str>,
    locale: Option<&str>,
) -> anyhow::Result<DisplayOptions> {
    let timezone = timezone
        .or(config.timezone.as_deref())
        .unwrap_or(DEFAULT_TIMEZONE);
    let locale = locale.or(config.locale.as_deref()).unwrap_or(DEFAULT_LOCALE);

    let mut options = DisplayOptions::new(timezone, locale)?;

    if let Some(date_format) = &config.date_format {
        options = options.with_date_format(date_format.clone());
    }

    Ok(options)
}
