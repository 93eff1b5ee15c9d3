// src/config.rs

use crate::errors::{BotError, Result};
use dotenvy::dotenv;
use poise::serenity_prelude::{ChannelId, RoleId};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_ESIM_ROLE_ID: u64 = 1303016685699203122;
pub const DEFAULT_ESIM_CHANNEL_ID: u64 = 1324351256709431336;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

#[derive(Clone)]
pub struct DatabaseConfig {
  pub host: String,
  pub port: u16,
  pub user: String,
  pub password: String,
  pub name: String,
  pub max_connections: u32,
}

// Hand-written so the password never shows up in logs.
impl std::fmt::Debug for DatabaseConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DatabaseConfig")
      .field("host", &self.host)
      .field("port", &self.port)
      .field("user", &self.user)
      .field("password", &"[REDACTED]")
      .field("name", &self.name)
      .field("max_connections", &self.max_connections)
      .finish()
  }
}

#[derive(Clone)]
pub struct BotConfig {
  pub discord_token: String,
  pub database: DatabaseConfig,

  /// Role required to run `/esim`.
  pub esim_role_id: RoleId,
  /// The only channel `/esim` may be used in.
  pub esim_channel_id: ChannelId,
  /// Role allowed to press the ticket resolution buttons.
  pub staff_role_id: RoleId,
  /// Role granted by a successful `/verify`.
  pub verified_role_id: RoleId,

  /// When set, these ids identify the verify/welcome channels instead of
  /// their names.
  pub verify_channel_id: Option<ChannelId>,
  pub welcome_channel_id: Option<ChannelId>,

  pub activation_ttl: Duration,
  pub log_format: LogFormat,
}

impl std::fmt::Debug for BotConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BotConfig")
      .field("discord_token", &"[REDACTED]")
      .field("database", &self.database)
      .field("esim_role_id", &self.esim_role_id)
      .field("esim_channel_id", &self.esim_channel_id)
      .field("staff_role_id", &self.staff_role_id)
      .field("verified_role_id", &self.verified_role_id)
      .field("verify_channel_id", &self.verify_channel_id)
      .field("welcome_channel_id", &self.welcome_channel_id)
      .field("activation_ttl", &self.activation_ttl)
      .field("log_format", &self.log_format)
      .finish()
  }
}

impl BotConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|key| env::var(key).ok())
  }

  /// Builds the config from any key lookup; `from_env` passes the process
  /// environment.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let required = |key: &str| {
      lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| BotError::Config(format!("Missing environment variable '{}'", key)))
    };

    let discord_token = required("DISCORD_BOT_TOKEN")?;
    let database = DatabaseConfig {
      host: required("DB_HOST")?,
      port: parse_or(&lookup, "DB_PORT", 3306)?,
      user: required("DB_USER")?,
      password: required("DB_PASS")?,
      name: required("DB_NAME")?,
      max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
    };
    if database.max_connections == 0 {
      return Err(BotError::Config("DB_MAX_CONNECTIONS must be at least 1".to_string()));
    }

    let esim_role_id = RoleId::new(parse_id(&lookup, "ESIM_ROLE_ID")?.unwrap_or(DEFAULT_ESIM_ROLE_ID));
    let esim_channel_id = ChannelId::new(parse_id(&lookup, "ESIM_CHANNEL_ID")?.unwrap_or(DEFAULT_ESIM_CHANNEL_ID));
    let staff_role_id = parse_id(&lookup, "STAFF_ROLE_ID")?.map(RoleId::new).unwrap_or(esim_role_id);
    let verified_role_id = parse_id(&lookup, "VERIFIED_ROLE_ID")?
      .map(RoleId::new)
      .ok_or_else(|| BotError::Config("Missing environment variable 'VERIFIED_ROLE_ID'".to_string()))?;

    let verify_channel_id = parse_id(&lookup, "VERIFY_CHANNEL_ID")?.map(ChannelId::new);
    let welcome_channel_id = parse_id(&lookup, "WELCOME_CHANNEL_ID")?.map(ChannelId::new);

    let activation_ttl = Duration::from_secs(parse_or(&lookup, "ACTIVATION_TTL_SECS", 900)?);

    let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
      None | Some("") | Some("pretty") => LogFormat::Pretty,
      Some("json") => LogFormat::Json,
      Some(other) => {
        return Err(BotError::Config(format!(
          "Invalid LOG_FORMAT '{}': expected 'pretty' or 'json'",
          other
        )))
      }
    };

    Ok(Self {
      discord_token,
      database,
      esim_role_id,
      esim_channel_id,
      staff_role_id,
      verified_role_id,
      verify_channel_id,
      welcome_channel_id,
      activation_ttl,
      log_format,
    })
  }

  /// Logs the non-secret identifiers. Call once tracing is installed.
  pub fn log_summary(&self) {
    tracing::info!(
      esim_channel_id = %self.esim_channel_id,
      esim_role_id = %self.esim_role_id,
      staff_role_id = %self.staff_role_id,
      log_format = ?self.log_format,
      "Bot configuration loaded."
    );
  }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match lookup(key).filter(|v| !v.trim().is_empty()) {
    None => Ok(default),
    Some(raw) => raw
      .trim()
      .parse::<T>()
      .map_err(|e| BotError::Config(format!("Invalid {}: {}", key, e))),
  }
}

/// Discord snowflakes are non-zero; zero is rejected here rather than
/// panicking inside the id constructors.
fn parse_id(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
  match lookup(key).filter(|v| !v.trim().is_empty()) {
    None => Ok(None),
    Some(raw) => match raw.trim().parse::<u64>() {
      Ok(0) => Err(BotError::Config(format!("Invalid {}: id must be non-zero", key))),
      Ok(id) => Ok(Some(id)),
      Err(e) => Err(BotError::Config(format!("Invalid {}: {}", key, e))),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key| map.get(key).cloned()
  }

  const MINIMAL: &[(&str, &str)] = &[
    ("DISCORD_BOT_TOKEN", "token"),
    ("DB_HOST", "db.internal"),
    ("DB_USER", "bot"),
    ("DB_PASS", "hunter2"),
    ("DB_NAME", "shop"),
    ("VERIFIED_ROLE_ID", "42"),
  ];

  #[test]
  fn minimal_environment_uses_defaults() {
    let cfg = BotConfig::from_lookup(lookup_from(MINIMAL)).unwrap();
    assert_eq!(cfg.database.port, 3306);
    assert_eq!(cfg.database.max_connections, 10);
    assert_eq!(cfg.esim_role_id, RoleId::new(DEFAULT_ESIM_ROLE_ID));
    assert_eq!(cfg.esim_channel_id, ChannelId::new(DEFAULT_ESIM_CHANNEL_ID));
    assert_eq!(cfg.staff_role_id, cfg.esim_role_id);
    assert_eq!(cfg.verified_role_id, RoleId::new(42));
    assert_eq!(cfg.verify_channel_id, None);
    assert_eq!(cfg.activation_ttl, Duration::from_secs(900));
    assert_eq!(cfg.log_format, LogFormat::Pretty);
  }

  #[test]
  fn overrides_are_applied() {
    let mut pairs = MINIMAL.to_vec();
    pairs.extend_from_slice(&[
      ("DB_PORT", "3307"),
      ("ESIM_ROLE_ID", "7"),
      ("ESIM_CHANNEL_ID", "8"),
      ("STAFF_ROLE_ID", "9"),
      ("VERIFY_CHANNEL_ID", "10"),
      ("ACTIVATION_TTL_SECS", "60"),
      ("LOG_FORMAT", "json"),
    ]);
    let cfg = BotConfig::from_lookup(lookup_from(&pairs)).unwrap();
    assert_eq!(cfg.database.port, 3307);
    assert_eq!(cfg.esim_role_id, RoleId::new(7));
    assert_eq!(cfg.esim_channel_id, ChannelId::new(8));
    assert_eq!(cfg.staff_role_id, RoleId::new(9));
    assert_eq!(cfg.verify_channel_id, Some(ChannelId::new(10)));
    assert_eq!(cfg.activation_ttl, Duration::from_secs(60));
    assert_eq!(cfg.log_format, LogFormat::Json);
  }

  #[test]
  fn missing_secret_names_the_variable() {
    let pairs: Vec<_> = MINIMAL.iter().copied().filter(|(k, _)| *k != "DB_PASS").collect();
    match BotConfig::from_lookup(lookup_from(&pairs)) {
      Err(BotError::Config(msg)) => assert!(msg.contains("DB_PASS")),
      other => panic!("expected config error, got {:?}", other.map(|_| ())),
    }
  }

  #[test]
  fn zero_and_garbage_ids_are_rejected() {
    for bad in ["0", "not-a-number"] {
      let mut pairs = MINIMAL.to_vec();
      pairs.push(("ESIM_CHANNEL_ID", bad));
      assert!(matches!(
        BotConfig::from_lookup(lookup_from(&pairs)),
        Err(BotError::Config(msg)) if msg.contains("ESIM_CHANNEL_ID")
      ));
    }
  }

  #[test]
  fn debug_output_redacts_secrets() {
    let cfg = BotConfig::from_lookup(lookup_from(MINIMAL)).unwrap();
    let rendered = format!("{:?}", cfg);
    assert!(!rendered.contains("hunter2"));
    assert!(!rendered.contains("token\""));
    assert!(rendered.contains("[REDACTED]"));
  }

  #[derive(Clone, Default)]
  struct CapturedLogs(std::sync::Arc<parking_lot::Mutex<Vec<u8>>>);

  impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
      self.0.lock().extend_from_slice(buf);
      Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
      Ok(())
    }
  }

  #[test]
  fn summary_is_logged_on_request_not_while_loading() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
      .with_writer(move || writer.clone())
      .with_ansi(false)
      .finish();

    tracing::subscriber::with_default(subscriber, || {
      let cfg = BotConfig::from_lookup(lookup_from(MINIMAL)).unwrap();
      assert!(logs.0.lock().is_empty());
      cfg.log_summary();
    });

    let output = String::from_utf8(logs.0.lock().clone()).unwrap();
    assert!(output.contains("Bot configuration loaded."));
    assert!(!output.contains("hunter2"));
  }
}
