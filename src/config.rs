//! Runtime configuration, sourced from the environment once at startup.
//!
//! There is no global config; [`Config::from_env`] builds one validated value
//! that is passed by reference into the pipeline.

use std::env;
use std::path::PathBuf;

use anyhow::{Result, bail};

/// Open mirror of the VBB feed, usable without credentials.
pub const DEFAULT_FEED_URL: &str = "https://gtfs.mfdz.de/VBB.gtfs.rt";
/// Official endpoint, requires `apikey` as a query parameter.
pub const KEYED_FEED_URL: &str = "https://api.vbb.de/gtfs-rt/v1/feed";

const DEFAULT_MIN_DELAY_SECS: i32 = 300;
const DEFAULT_STATE_DIR: &str = "state";

/// Notification target. Webhook and bot token may both be set; the webhook
/// wins at send time.
#[derive(Debug, Clone, Default)]
pub struct DiscordConfig {
    pub webhook_url: Option<String>,
    pub token: Option<String>,
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub url: String,
    pub api_key: Option<String>,
}

/// Extraction policy: route-id allow-list and minimum delay worth reporting.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub lines: Vec<String>,
    pub min_delay_secs: i32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord: DiscordConfig,
    pub feed: FeedConfig,
    pub filters: FilterConfig,
    pub state_dir: PathBuf,
}

impl Config {
    /// Reads and validates the configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Fails when no notification target is configured, when a bot token is
    /// set without a channel id, or when `MIN_DELAY` is not an integer.
    pub fn from_env() -> Result<Self> {
        let api_key = env_opt("VBB_API_KEY");

        let url = env_opt("VBB_FEED_URL").unwrap_or_else(|| {
            if api_key.is_some() {
                KEYED_FEED_URL.to_string()
            } else {
                DEFAULT_FEED_URL.to_string()
            }
        });

        let min_delay_secs = match env_opt("MIN_DELAY") {
            Some(raw) => match raw.parse() {
                Ok(v) => v,
                Err(_) => bail!("MIN_DELAY must be an integer number of seconds, got {raw:?}"),
            },
            None => DEFAULT_MIN_DELAY_SECS,
        };

        let config = Config {
            discord: DiscordConfig {
                webhook_url: env_opt("DISCORD_WEBHOOK_URL"),
                token: env_opt("DISCORD_TOKEN"),
                channel_id: env_opt("DISCORD_CHANNEL_ID"),
            },
            feed: FeedConfig { url, api_key },
            filters: FilterConfig {
                lines: parse_lines(env_opt("FILTER_LINES").as_deref()),
                min_delay_secs,
            },
            state_dir: state_dir_from_env(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks the notification-target rules before any network or state
    /// activity happens.
    pub fn validate(&self) -> Result<()> {
        let d = &self.discord;
        if d.webhook_url.is_none() && d.token.is_none() {
            bail!("either DISCORD_WEBHOOK_URL or DISCORD_TOKEN must be set");
        }
        if d.token.is_some() && d.channel_id.is_none() {
            bail!("DISCORD_CHANNEL_ID is required when DISCORD_TOKEN is used");
        }
        Ok(())
    }
}

/// State directory alone, for commands that only read the state file.
pub fn state_dir_from_env() -> PathBuf {
    PathBuf::from(env_opt("STATE_DIR").unwrap_or_else(|| DEFAULT_STATE_DIR.to_string()))
}

/// Reads an environment variable, treating unset and empty as absent.
fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Splits a comma-separated allow-list, trimming whitespace around each id.
fn parse_lines(raw: Option<&str>) -> Vec<String> {
    raw.map(|r| {
        r.split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(discord: DiscordConfig) -> Config {
        Config {
            discord,
            feed: FeedConfig {
                url: DEFAULT_FEED_URL.to_string(),
                api_key: None,
            },
            filters: FilterConfig {
                lines: vec![],
                min_delay_secs: DEFAULT_MIN_DELAY_SECS,
            },
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
        }
    }

    #[test]
    fn test_validate_requires_some_target() {
        let config = base_config(DiscordConfig::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_webhook_alone_is_enough() {
        let config = base_config(DiscordConfig {
            webhook_url: Some("https://discord.com/api/webhooks/1/x".into()),
            ..Default::default()
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_token_requires_channel() {
        let config = base_config(DiscordConfig {
            token: Some("bot-token".into()),
            ..Default::default()
        });
        assert!(config.validate().is_err());

        let config = base_config(DiscordConfig {
            token: Some("bot-token".into()),
            channel_id: Some("1234".into()),
            ..Default::default()
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_lines_trims_and_skips_empty() {
        assert_eq!(parse_lines(None), Vec::<String>::new());
        assert_eq!(parse_lines(Some("100, 200 ,S7")), vec!["100", "200", "S7"]);
        assert_eq!(parse_lines(Some("100,,")), vec!["100"]);
    }
}
