//! Configuration loading and validation.
//!
//! Configuration is a TOML file read once at startup: an optional `[smtp]`
//! table for the transport, an optional channel capacity, and one
//! `[watch.<name>]` table per rule — the table key becomes the rule name.
//!
//! ```toml
//! [smtp]
//! host = "localhost"
//! port = 25
//! tls = false
//!
//! channel-capacity = 1000
//!
//! [watch.uploads]
//! path = "/srv/uploads"
//! events = "create, delete"
//! recurse = true
//! ignore = '^\.'
//! mailfrom = "watcher@example.com"
//! mailto = "ops@example.com"
//! subject = "${maskname}: ${name}"
//! body = "${pathname} changed"
//! type = "plain"
//! ```
//!
//! Every field of every rule is validated at load time — unknown event
//! kinds, invalid ignore patterns, unparseable mail addresses, bad body
//! subtypes and relative paths are all fatal before the watch loop starts.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::mailer;
use crate::rule::{EventMask, WatchRule};

/// Default SMTP host, the classic local-relay setup.
const DEFAULT_SMTP_HOST: &str = "localhost";

/// Default event channel capacity.
const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or is missing required fields.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration defines no watch rules at all.
    #[error("configuration defines no watch rules")]
    NoRules,

    /// `channel-capacity` is zero.
    #[error("channel-capacity must be greater than 0")]
    ZeroCapacity,

    /// A watch rule field failed validation.
    #[error("invalid '{field}' in watch rule '{rule}': {message}")]
    InvalidField {
        /// Name of the offending rule.
        rule: String,
        /// Field that failed validation.
        field: &'static str,
        /// Validation detail.
        message: String,
    },
}

/// SMTP transport settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SmtpConfig {
    /// SMTP server hostname.
    #[serde(default = "default_smtp_host")]
    pub host: String,

    /// SMTP port. Defaults to 25; 465 selects implicit TLS.
    #[serde(default)]
    pub port: Option<u16>,

    /// Use STARTTLS when connecting.
    #[serde(default)]
    pub tls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: None,
            tls: false,
        }
    }
}

fn default_smtp_host() -> String {
    DEFAULT_SMTP_HOST.to_string()
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

/// Raw on-disk shape, before validation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    smtp: SmtpConfig,

    #[serde(default = "default_channel_capacity", rename = "channel-capacity")]
    channel_capacity: usize,

    #[serde(default)]
    watch: BTreeMap<String, RawRule>,
}

/// One `[watch.<name>]` table, before validation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    path: String,
    events: String,
    recurse: bool,
    #[serde(default)]
    ignore: Option<String>,
    mailfrom: String,
    mailto: String,
    subject: String,
    body: String,
    #[serde(rename = "type")]
    body_type: String,
}

/// Validated configuration for the whole process.
#[derive(Debug, Clone)]
pub struct Config {
    /// SMTP transport settings.
    pub smtp: SmtpConfig,

    /// Event channel capacity.
    pub channel_capacity: usize,

    /// Validated watch rules, in rule-name order.
    pub rules: Vec<WatchRule>,
}

impl Config {
    /// Loads and validates the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, is not valid
    /// TOML, defines no rules, or any rule field fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`], minus the file read.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;

        if raw.channel_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if raw.watch.is_empty() {
            return Err(ConfigError::NoRules);
        }

        let mut rules = Vec::with_capacity(raw.watch.len());
        for (name, raw_rule) in raw.watch {
            rules.push(build_rule(name, raw_rule)?);
        }

        Ok(Self {
            smtp: raw.smtp,
            channel_capacity: raw.channel_capacity,
            rules,
        })
    }
}

/// Validates one raw rule into a [`WatchRule`].
fn build_rule(name: String, raw: RawRule) -> Result<WatchRule, ConfigError> {
    let invalid = |field: &'static str, message: String| ConfigError::InvalidField {
        rule: name.clone(),
        field,
        message,
    };

    let path = PathBuf::from(&raw.path);
    if !path.is_absolute() {
        return Err(invalid(
            "path",
            format!("'{}' is not an absolute path", raw.path),
        ));
    }

    let mask = EventMask::parse(&raw.events).map_err(|e| invalid("events", e.to_string()))?;

    let ignore = raw
        .ignore
        .map(|pattern| Regex::new(&pattern))
        .transpose()
        .map_err(|e| invalid("ignore", e.to_string()))?;

    mailer::parse_mailbox(&raw.mailfrom).map_err(|e| invalid("mailfrom", e.to_string()))?;
    mailer::parse_mailbox(&raw.mailto).map_err(|e| invalid("mailto", e.to_string()))?;
    mailer::parse_body_type(&raw.body_type).map_err(|e| invalid("type", e.to_string()))?;

    Ok(WatchRule {
        name,
        path,
        mask,
        recursive: raw.recurse,
        ignore,
        mail_from: raw.mailfrom,
        mail_to: raw.mailto,
        subject: raw.subject,
        body: raw.body,
        body_type: raw.body_type,
    })
}
