use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::{
    cli::GlobalArgs,
    error::{AppError, Result},
};

const DEFAULT_CONFIG_PATH: &str = "config/dividi.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    /// JSON file holding the session and any parked invite.
    pub token_path: String,
    pub level: String,
    /// IANA name used to render timestamps.
    pub timezone: String,
    /// Batch requests in flight at once; unset sends all together.
    pub batch_concurrency: Option<usize>,
    pub request_timeout_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            token_path: "config/dividi_tokens.json".to_string(),
            level: "info".to_string(),
            timezone: "UTC".to_string(),
            batch_concurrency: None,
            request_timeout_secs: None,
        }
    }
}

impl AppConfig {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| AppError::InvalidArgument(format!("unknown timezone: {}", self.timezone)))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Layers the TOML file, `DIVIDI_*` variables and command line overrides, in
/// that order.
pub fn load(args: &GlobalArgs) -> Result<AppConfig> {
    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix("DIVIDI"));
    let mut settings: AppConfig = builder.build()?.try_deserialize()?;

    if let Some(base_url) = &args.base_url {
        settings.base_url = base_url.clone();
    }
    if let Some(level) = &args.level {
        settings.level = level.clone();
    }
    if let Some(timezone) = &args.timezone {
        settings.timezone = timezone.clone();
    }
    if let Some(limit) = args.batch_concurrency {
        settings.batch_concurrency = Some(limit);
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn file_values_then_cli_overrides() {
        let dir = std::env::temp_dir().join(format!("dividi-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("dividi.toml");
        fs::write(
            &path,
            "base_url = \"https://split.example\"\ntimezone = \"Europe/Rome\"\nbatch_concurrency = 4\n",
        )
        .unwrap();

        let mut args = GlobalArgs {
            config: Some(path.to_string_lossy().into_owned()),
            ..GlobalArgs::default()
        };
        let settings = load(&args).unwrap();
        assert_eq!(settings.base_url, "https://split.example");
        assert_eq!(settings.batch_concurrency, Some(4));
        assert_eq!(settings.level, "info");
        assert_eq!(settings.tz().unwrap(), chrono_tz::Europe::Rome);

        args.base_url = Some("http://127.0.0.1:8080".to_string());
        args.batch_concurrency = Some(1);
        let settings = load(&args).unwrap();
        assert_eq!(settings.base_url, "http://127.0.0.1:8080");
        assert_eq!(settings.batch_concurrency, Some(1));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let settings = AppConfig {
            timezone: "Mars/Olympus".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(settings.tz(), Err(AppError::InvalidArgument(_))));
    }
}
