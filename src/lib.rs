//! mailwatch - filesystem change notifications by email.
//!
//! This crate watches a configured set of directory subtrees for filesystem
//! change events and, for each event matching a watch rule, sends a
//! notification email whose subject and body are templated from event
//! fields.
//!
//! # Overview
//!
//! Configuration is loaded once at startup and defines a set of watch rules:
//! a directory path, the change kinds to subscribe to, an optional ignore
//! pattern, and the notification template and addressing. A single event
//! loop consumes filesystem events in arrival order; for each event the
//! dispatcher resolves the owning rule by longest path prefix, applies the
//! rule's filters, renders the templates and delivers the mail over SMTP.
//!
//! # Modules
//!
//! - [`rule`]: Watch rule data model and event-kind vocabulary
//! - [`registry`]: Path-prefix resolution of events to rules
//! - [`dispatch`]: The event-to-notification decision core
//! - [`template`]: `${field}` placeholder rendering
//! - [`watcher`]: Filesystem watch registration and event conversion
//! - [`mailer`]: Mail transport trait and SMTP implementation
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: Crate-level error type

pub mod config;
pub mod dispatch;
pub mod error;
pub mod mailer;
pub mod registry;
pub mod rule;
pub mod template;
pub mod watcher;

pub use config::{Config, ConfigError, SmtpConfig};
pub use dispatch::{DispatchOutcome, EventDispatcher};
pub use error::{Error, Result};
pub use mailer::{Mailer, MailerError, OutgoingMail, SmtpMailer};
pub use registry::{RegistryError, RuleRegistry};
pub use rule::{ChangeKind, EventMask, WatchRule};
pub use template::TemplateError;
pub use watcher::{DirWatcher, FsEvent, WatcherError};
