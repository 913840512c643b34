//! Event dispatch: the decision core of mailwatch.
//!
//! For each observed filesystem event the dispatcher resolves the owning
//! watch rule, applies the rule's event-mask and ignore filters, renders the
//! notification templates from an explicit field map, and hands the result
//! to the mail transport.
//!
//! # Substitution fields
//!
//! The field map exposed to templates is enumerated here — events are never
//! introspected at render time:
//!
//! | field       | value                                      |
//! |-------------|--------------------------------------------|
//! | `path`      | directory containing the change            |
//! | `name`      | base name of the affected entry            |
//! | `pathname`  | full path of the affected entry            |
//! | `maskname`  | event kind name (`create`, `modify`, …)    |
//! | `rule`      | name of the matched watch rule             |
//! | `hostname`  | hostname of the reporting machine          |
//! | `timestamp` | RFC 3339 UTC time the event was dispatched |

use std::collections::HashMap;

use chrono::{SecondsFormat, Utc};
use tracing::{debug, trace};

use crate::error::Result;
use crate::mailer::{Mailer, OutgoingMail};
use crate::registry::RuleRegistry;
use crate::rule::WatchRule;
use crate::template;
use crate::watcher::FsEvent;

/// What the dispatcher did with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A notification was rendered and delivered.
    Delivered,

    /// The event kind is outside the rule's event mask.
    MaskFiltered,

    /// The entry name matched the rule's ignore pattern.
    Ignored,
}

/// Consumes filesystem events and turns matching ones into notifications.
#[derive(Debug)]
pub struct EventDispatcher<M> {
    registry: RuleRegistry,
    mailer: M,
    hostname: String,
}

impl<M: Mailer> EventDispatcher<M> {
    /// Creates a dispatcher over an immutable registry and a mail transport.
    pub fn new(registry: RuleRegistry, mailer: M) -> Self {
        Self {
            registry,
            mailer,
            hostname: hostname(),
        }
    }

    /// Returns the underlying mail transport.
    #[must_use]
    pub fn mailer(&self) -> &M {
        &self.mailer
    }

    /// Handles one event.
    ///
    /// # Errors
    ///
    /// Fails with a registry error when the event path matches no rule
    /// (a config/watch inconsistency — the watcher only reports registered
    /// paths), a template error when a placeholder is unresolved, or a mail
    /// error when delivery fails. All are scoped to this single event.
    pub async fn handle(&self, event: &FsEvent) -> Result<DispatchOutcome> {
        debug!(
            kind = %event.kind,
            path = %event.path.display(),
            name = %event.name,
            "observed event"
        );

        let rule = self.registry.resolve(&event.path)?;

        if !rule.mask.contains(event.kind.mask()) {
            trace!(rule = %rule.name, kind = %event.kind, "event kind outside rule mask");
            return Ok(DispatchOutcome::MaskFiltered);
        }

        if let Some(ignore) = &rule.ignore {
            if ignore.is_match(&event.name) {
                debug!(rule = %rule.name, name = %event.name, "entry matches ignore pattern");
                return Ok(DispatchOutcome::Ignored);
            }
        }

        let fields = self.substitution_fields(rule, event);
        let subject = template::render(&rule.subject, &fields)?;
        let body = template::render(&rule.body, &fields)?;

        let mail = OutgoingMail {
            from: rule.mail_from.clone(),
            to: rule.mail_to.clone(),
            subject,
            body,
            body_type: rule.body_type.clone(),
        };
        self.mailer.send(&mail).await?;

        Ok(DispatchOutcome::Delivered)
    }

    /// Assembles the enumerated substitution field map for one event.
    fn substitution_fields(&self, rule: &WatchRule, event: &FsEvent) -> HashMap<String, String> {
        HashMap::from([
            ("path".to_string(), event.path.display().to_string()),
            ("name".to_string(), event.name.clone()),
            ("pathname".to_string(), event.pathname.display().to_string()),
            ("maskname".to_string(), event.kind.name().to_string()),
            ("rule".to_string(), rule.name.clone()),
            ("hostname".to_string(), self.hostname.clone()),
            (
                "timestamp".to_string(),
                Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        ])
    }
}

/// Hostname of the reporting machine, `unknown` when it cannot be determined.
fn hostname() -> String {
    gethostname::gethostname()
        .into_string()
        .unwrap_or_else(|_| "unknown".to_string())
}
