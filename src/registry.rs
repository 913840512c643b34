//! Rule registry: resolves an event path to the owning watch rule.
//!
//! The registry is built once at startup and is immutable afterwards. Rule
//! paths are unique; registering the same path twice is a configuration error
//! surfaced before the watch loop starts.
//!
//! # Prefix semantics
//!
//! Resolution matches the configured path as a *literal byte prefix* of the
//! event path, not a path-segment-aligned one: a rule for `/var/foo` also
//! matches events under `/var/foobar`. When several rules' paths are prefixes
//! of the same event path (nested watches), the longest one wins, which makes
//! resolution deterministic for overlapping configurations.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::rule::WatchRule;

/// Errors produced by the rule registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Two rules were registered with the identical watch path.
    #[error("duplicate watch path: {}", .path.display())]
    DuplicatePath {
        /// The path configured more than once.
        path: PathBuf,
    },

    /// No rule's path is a prefix of the event path.
    ///
    /// The watcher only reports paths under registered watches, so hitting
    /// this during dispatch signals a registry/config inconsistency rather
    /// than an ordinary miss.
    #[error("no watch rule matches path: {}", .path.display())]
    NoMatch {
        /// The event path that failed to resolve.
        path: PathBuf,
    },
}

/// Holds all configured watch rules and resolves event paths against them.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: Vec<WatchRule>,
}

impl RuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a whole configuration's rules.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicatePath`] if two rules share a path.
    pub fn from_rules<I>(rules: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = WatchRule>,
    {
        let mut registry = Self::new();
        for rule in rules {
            registry.register(rule)?;
        }
        Ok(registry)
    }

    /// Inserts a rule.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicatePath`] if a rule with the identical
    /// path is already present.
    pub fn register(&mut self, rule: WatchRule) -> Result<(), RegistryError> {
        if self.rules.iter().any(|r| r.path == rule.path) {
            return Err(RegistryError::DuplicatePath { path: rule.path });
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Finds the rule owning `event_path`.
    ///
    /// Among all rules whose configured path is a literal prefix of
    /// `event_path`, the one with the longest path wins.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoMatch`] when no rule's path prefixes the
    /// event path.
    pub fn resolve(&self, event_path: &Path) -> Result<&WatchRule, RegistryError> {
        let event_bytes = event_path.as_os_str().as_encoded_bytes();

        self.rules
            .iter()
            .filter(|rule| event_bytes.starts_with(rule.path.as_os_str().as_encoded_bytes()))
            .max_by_key(|rule| rule.path.as_os_str().len())
            .ok_or_else(|| RegistryError::NoMatch {
                path: event_path.to_path_buf(),
            })
    }

    /// Iterates over the registered rules in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &WatchRule> {
        self.rules.iter()
    }

    /// Returns the number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
