// Process configuration - read once from the environment at startup.
//
// Required settings that are missing or malformed stop the bot before it
// connects. Optional settings with bad values fall back to a safe default and
// log a warning instead.

use crate::core::moderation::{
    AdminCheckPolicy, ModerationAction, ModerationConfig, DEFAULT_READONLY_DAYS,
    MAX_READONLY_DAYS,
};
use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_KEYWORDS_FILE: &str = "/app/keywords.yaml";
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;
/// Telegram does not hold a long poll open any longer than this.
const MAX_POLL_TIMEOUT_SECS: u64 = 50;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

// ============================================================================
// LOG LEVEL
// ============================================================================

/// Verbosity from LOGGING_LEVEL. Accepts the usual level names plus
/// WARNING and CRITICAL as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARN" | "WARNING" => Some(LogLevel::Warn),
            "ERROR" | "CRITICAL" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Resolve LOGGING_LEVEL, returning the bad value when it had to fall back.
    pub fn from_setting(raw: Option<&str>) -> (Self, Option<String>) {
        match raw {
            None => (LogLevel::Info, None),
            Some(value) => match Self::parse(value) {
                Some(level) => (level, None),
                None => (LogLevel::Info, Some(value.to_string())),
            },
        }
    }

    fn directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Filter for the subscriber. HTTP internals stay at warn so individual
    /// Bot API requests are not logged.
    pub fn env_filter(&self) -> EnvFilter {
        let level = self.directive();
        let quiet = if *self == LogLevel::Error { "error" } else { "warn" };
        EnvFilter::new(format!(
            "{},hyper={},reqwest={},rustls={}",
            level, quiet, quiet, quiet
        ))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.directive().to_uppercase())
    }
}

// ============================================================================
// BOT CONFIG
// ============================================================================

/// Everything the bot reads from its environment.
#[derive(Clone)]
pub struct BotConfig {
    pub token: String,
    pub group_chat_id: i64,
    pub moderation: ModerationConfig,
    pub keywords_file: PathBuf,
    pub log_level: LogLevel,
    pub poll_timeout: Duration,
    pub request_timeout: Duration,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"<censored>")
            .field("group_chat_id", &self.group_chat_id)
            .field("moderation", &self.moderation)
            .field("keywords_file", &self.keywords_file)
            .field("log_level", &self.log_level)
            .field("poll_timeout", &self.poll_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl BotConfig {
    /// Build the config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Tests pass a map here.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("TELEGRAM_BOT_TOKEN")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        let raw_chat_id = lookup("GROUP_CHAT_ID")
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(ConfigError::Missing("GROUP_CHAT_ID"))?;
        let group_chat_id = raw_chat_id
            .parse::<i64>()
            .map_err(|_| ConfigError::Invalid {
                var: "GROUP_CHAT_ID",
                value: raw_chat_id.clone(),
            })?;

        let moderation = moderation_config(&lookup);

        let keywords_file = lookup("KEYWORDS_FILE")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_KEYWORDS_FILE));

        let (log_level, _) = LogLevel::from_setting(lookup("LOGGING_LEVEL").as_deref());

        let poll_timeout = Duration::from_secs(seconds_or_default(
            &lookup,
            "POLL_TIMEOUT_SECS",
            DEFAULT_POLL_TIMEOUT_SECS,
            0..=MAX_POLL_TIMEOUT_SECS,
        ));
        let request_timeout = Duration::from_secs(seconds_or_default(
            &lookup,
            "REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
            1..=MAX_REQUEST_TIMEOUT_SECS,
        ));

        Ok(Self {
            token,
            group_chat_id,
            moderation,
            keywords_file,
            log_level,
            poll_timeout,
            request_timeout,
        })
    }
}

/// ACTION, READONLY_DAYS and ADMIN_CHECK_POLICY, normalized to safe values.
fn moderation_config<F>(lookup: &F) -> ModerationConfig
where
    F: Fn(&str) -> Option<String>,
{
    let action = match lookup("ACTION") {
        None => ModerationAction::Kick,
        Some(raw) => ModerationAction::parse(&raw).unwrap_or_else(|| {
            tracing::warn!("Invalid action: {}. Defaulting to 'kick'.", raw);
            ModerationAction::Kick
        }),
    };

    let readonly_duration_days = match lookup("READONLY_DAYS") {
        None => DEFAULT_READONLY_DAYS,
        Some(raw) => match raw.trim().parse::<i64>() {
            // Telegram turns anything past 366 days into a permanent restriction.
            Ok(days) if (1..=i64::from(MAX_READONLY_DAYS)).contains(&days) => days as u32,
            _ => {
                if action == ModerationAction::Readonly {
                    tracing::warn!(
                        "Invalid READONLY_DAYS value: {}. Defaulting to {} days.",
                        raw,
                        DEFAULT_READONLY_DAYS
                    );
                }
                DEFAULT_READONLY_DAYS
            }
        },
    };

    let admin_check_policy = match lookup("ADMIN_CHECK_POLICY") {
        None => AdminCheckPolicy::FailOpen,
        Some(raw) => AdminCheckPolicy::parse(&raw).unwrap_or_else(|| {
            tracing::warn!(
                "Invalid ADMIN_CHECK_POLICY: {}. Defaulting to 'fail_open'.",
                raw
            );
            AdminCheckPolicy::FailOpen
        }),
    };

    ModerationConfig {
        action,
        readonly_duration_days,
        admin_check_policy,
    }
}

fn seconds_or_default<F>(lookup: &F, var: &str, default: u64, allowed: RangeInclusive<u64>) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return default;
    };

    match raw.trim().parse::<u64>() {
        Ok(secs) if allowed.contains(&secs) => secs,
        _ => {
            tracing::warn!("Invalid {} value: {}. Defaulting to {}.", var, raw, default);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| env.get(key).cloned())
    }

    fn base() -> Vec<(&'static str, &'static str)> {
        vec![
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("GROUP_CHAT_ID", "-1001234567890"),
        ]
    }

    fn with(extra: &[(&'static str, &'static str)]) -> BotConfig {
        let mut pairs = base();
        pairs.extend_from_slice(extra);
        config(&pairs).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cfg = with(&[]);

        assert_eq!(cfg.group_chat_id, -1001234567890);
        assert_eq!(cfg.moderation, ModerationConfig::default());
        assert_eq!(cfg.keywords_file, PathBuf::from(DEFAULT_KEYWORDS_FILE));
        assert_eq!(cfg.log_level, LogLevel::Info);
        assert_eq!(cfg.poll_timeout, Duration::from_secs(30));
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let err = config(&[("GROUP_CHAT_ID", "-1")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("TELEGRAM_BOT_TOKEN"));

        let err = config(&[("TELEGRAM_BOT_TOKEN", "  "), ("GROUP_CHAT_ID", "-1")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn test_missing_or_bad_chat_id_is_fatal() {
        let err = config(&[("TELEGRAM_BOT_TOKEN", "t")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("GROUP_CHAT_ID"));

        let err = config(&[("TELEGRAM_BOT_TOKEN", "t"), ("GROUP_CHAT_ID", "@mygroup")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "GROUP_CHAT_ID", .. }));
    }

    #[test]
    fn test_readonly_action_and_days() {
        let cfg = with(&[("ACTION", "ReadOnly"), ("READONLY_DAYS", "3")]);

        assert_eq!(cfg.moderation.action, ModerationAction::Readonly);
        assert_eq!(cfg.moderation.readonly_duration_days, 3);
    }

    #[test]
    fn test_misspelled_action_falls_back_to_kick() {
        let cfg = with(&[("ACTION", "radonly")]);
        assert_eq!(cfg.moderation.action, ModerationAction::Kick);
    }

    #[test]
    fn test_bad_readonly_days_fall_back_to_seven() {
        for days in ["0", "-2", "three", ""] {
            let cfg = with(&[("ACTION", "readonly"), ("READONLY_DAYS", days)]);
            assert_eq!(cfg.moderation.readonly_duration_days, 7, "input {:?}", days);
        }
    }

    #[test]
    fn test_admin_check_policy() {
        let cfg = with(&[("ADMIN_CHECK_POLICY", "fail_closed")]);
        assert_eq!(cfg.moderation.admin_check_policy, AdminCheckPolicy::FailClosed);

        let cfg = with(&[("ADMIN_CHECK_POLICY", "whatever")]);
        assert_eq!(cfg.moderation.admin_check_policy, AdminCheckPolicy::FailOpen);
    }

    #[test]
    fn test_bad_timeouts_fall_back() {
        let cfg = with(&[("POLL_TIMEOUT_SECS", "soon"), ("REQUEST_TIMEOUT_SECS", "0")]);
        assert_eq!(cfg.poll_timeout, Duration::from_secs(30));
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));

        let cfg = with(&[("POLL_TIMEOUT_SECS", "0")]);
        assert_eq!(cfg.poll_timeout, Duration::ZERO);
    }

    #[test]
    fn test_oversized_timeouts_fall_back() {
        let cfg = with(&[
            ("POLL_TIMEOUT_SECS", "18446744073709551615"),
            ("REQUEST_TIMEOUT_SECS", "86400"),
        ]);
        assert_eq!(cfg.poll_timeout, Duration::from_secs(30));
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));

        let cfg = with(&[("POLL_TIMEOUT_SECS", "51")]);
        assert_eq!(cfg.poll_timeout, Duration::from_secs(30));

        let cfg = with(&[("POLL_TIMEOUT_SECS", "50")]);
        assert_eq!(cfg.poll_timeout, Duration::from_secs(50));
    }

    #[test]
    fn test_readonly_days_beyond_a_year_fall_back() {
        let cfg = with(&[("ACTION", "readonly"), ("READONLY_DAYS", "366")]);
        assert_eq!(cfg.moderation.readonly_duration_days, 366);

        for days in ["367", "4294967295", "99999999999"] {
            let cfg = with(&[("ACTION", "readonly"), ("READONLY_DAYS", days)]);
            assert_eq!(cfg.moderation.readonly_duration_days, 7, "input {:?}", days);
        }
    }

    #[test]
    fn test_log_level_names() {
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("CRITICAL"), Some(LogLevel::Error));
        assert_eq!(
            LogLevel::from_setting(Some("loud")),
            (LogLevel::Info, Some("loud".to_string()))
        );
        assert_eq!(LogLevel::from_setting(None), (LogLevel::Info, None));
    }

    #[test]
    fn test_debug_output_hides_token() {
        let cfg = with(&[]);
        let printed = format!("{:?}", cfg);
        assert!(printed.contains("<censored>"));
        assert!(!printed.contains("123:abc"));
    }
}
