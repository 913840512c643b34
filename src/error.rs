//! Crate-level error type.
//!
//! Each module defines its own focused error enum; this aggregates them for
//! callers that cross module boundaries, such as the dispatcher and the
//! binary's startup path. Startup errors abort before the watch loop begins;
//! per-event errors are isolated to the event they occurred on.

use thiserror::Error;

use crate::config::ConfigError;
use crate::mailer::MailerError;
use crate::registry::RegistryError;
use crate::template::TemplateError;
use crate::watcher::WatcherError;

/// Errors that can occur during mailwatch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation failed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Rule registration or resolution failed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Filesystem watch setup failed.
    #[error("watch error: {0}")]
    Watch(#[from] WatcherError),

    /// Template rendering failed.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// Message building or delivery failed.
    #[error("mail error: {0}")]
    Mail(#[from] MailerError),

    /// Filesystem I/O outside the watcher, such as PID-file handling.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for mailwatch operations.
pub type Result<T> = std::result::Result<T, Error>;
