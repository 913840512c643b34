//! Watch rule data model.
//!
//! A [`WatchRule`] is one configured watch directive: a directory path, the
//! set of change kinds it subscribes to, an optional ignore filter, and the
//! notification template and addressing used when an event matches. Rules are
//! built once at startup from configuration and are immutable afterwards.

use std::fmt;
use std::path::PathBuf;

use bitflags::bitflags;
use regex::Regex;
use thiserror::Error;

bitflags! {
    /// Set of change kinds a watch rule subscribes to.
    ///
    /// Parsed from a comma-separated list of kind names in the configuration,
    /// e.g. `"create, delete"`. The special name `all` selects every kind.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EventMask: u8 {
        /// An entry was created.
        const CREATE = 1 << 0;
        /// An entry's content was modified.
        const MODIFY = 1 << 1;
        /// An entry was deleted.
        const DELETE = 1 << 2;
        /// An entry was renamed or moved.
        const MOVE = 1 << 3;
        /// An entry's metadata (permissions, ownership, times) changed.
        const ATTRIB = 1 << 4;
    }
}

/// Errors that can occur while parsing an event-kind list.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MaskError {
    /// A name in the list is not a recognized event kind.
    #[error("unknown event kind '{0}' (expected create, modify, delete, move, attrib or all)")]
    UnknownKind(String),

    /// The list contains no event kinds at all.
    #[error("event list is empty")]
    Empty,
}

impl EventMask {
    /// Parses a comma-separated list of event-kind names into a mask.
    ///
    /// Names are case-insensitive and surrounding whitespace is ignored.
    /// An empty list is rejected: a rule that subscribes to nothing is a
    /// configuration mistake, not a valid rule.
    pub fn parse(list: &str) -> Result<Self, MaskError> {
        let mut mask = EventMask::empty();

        for name in list.split(',') {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            mask |= match name.to_ascii_lowercase().as_str() {
                "create" => EventMask::CREATE,
                "modify" => EventMask::MODIFY,
                "delete" => EventMask::DELETE,
                "move" => EventMask::MOVE,
                "attrib" => EventMask::ATTRIB,
                "all" => EventMask::all(),
                _ => return Err(MaskError::UnknownKind(name.to_string())),
            };
        }

        if mask.is_empty() {
            return Err(MaskError::Empty);
        }

        Ok(mask)
    }
}

/// The kind of a single observed filesystem change.
///
/// This is the vocabulary shared by the watcher (which maps raw backend
/// events onto it), the dispatcher (which checks it against a rule's
/// [`EventMask`]) and the templates (which expose its name as `${maskname}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// An entry was created.
    Create,
    /// An entry's content was modified.
    Modify,
    /// An entry was deleted.
    Delete,
    /// An entry was renamed or moved.
    Move,
    /// An entry's metadata changed.
    Attrib,
}

impl ChangeKind {
    /// Returns the mask bit corresponding to this kind.
    #[must_use]
    pub fn mask(self) -> EventMask {
        match self {
            ChangeKind::Create => EventMask::CREATE,
            ChangeKind::Modify => EventMask::MODIFY,
            ChangeKind::Delete => EventMask::DELETE,
            ChangeKind::Move => EventMask::MOVE,
            ChangeKind::Attrib => EventMask::ATTRIB,
        }
    }

    /// Returns the kind's name as used in configuration and templates.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ChangeKind::Create => "create",
            ChangeKind::Modify => "modify",
            ChangeKind::Delete => "delete",
            ChangeKind::Move => "move",
            ChangeKind::Attrib => "attrib",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One configured watch directive.
#[derive(Debug, Clone)]
pub struct WatchRule {
    /// Rule identifier, taken from the config table key. Informational only.
    pub name: String,

    /// Absolute directory path to watch. Unique key in the registry.
    pub path: PathBuf,

    /// Change kinds this rule subscribes to.
    pub mask: EventMask,

    /// Whether subdirectories are watched too.
    pub recursive: bool,

    /// Optional pattern tested against the changed entry's base name.
    /// When it matches, the event is suppressed. Anchoring is whatever the
    /// pattern itself specifies.
    pub ignore: Option<Regex>,

    /// Sender address for notifications.
    pub mail_from: String,

    /// Recipient address for notifications.
    pub mail_to: String,

    /// Subject template with `${field}` placeholders.
    pub subject: String,

    /// Body template with `${field}` placeholders.
    pub body: String,

    /// MIME text subtype for the message body, e.g. `plain` or `html`.
    pub body_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_kind() {
        assert_eq!(EventMask::parse("create").unwrap(), EventMask::CREATE);
        assert_eq!(EventMask::parse("attrib").unwrap(), EventMask::ATTRIB);
    }

    #[test]
    fn parse_kind_list() {
        let mask = EventMask::parse("create, delete,move").unwrap();
        assert!(mask.contains(EventMask::CREATE));
        assert!(mask.contains(EventMask::DELETE));
        assert!(mask.contains(EventMask::MOVE));
        assert!(!mask.contains(EventMask::MODIFY));
    }

    #[test]
    fn parse_is_case_insensitive() {
        let mask = EventMask::parse("Create, MODIFY").unwrap();
        assert!(mask.contains(EventMask::CREATE));
        assert!(mask.contains(EventMask::MODIFY));
    }

    #[test]
    fn parse_all_selects_every_kind() {
        assert_eq!(EventMask::parse("all").unwrap(), EventMask::all());
    }

    #[test]
    fn parse_skips_stray_commas() {
        let mask = EventMask::parse("create,,modify,").unwrap();
        assert!(mask.contains(EventMask::CREATE));
        assert!(mask.contains(EventMask::MODIFY));
    }

    #[test]
    fn parse_unknown_kind_is_rejected() {
        let err = EventMask::parse("create, explode").unwrap_err();
        assert_eq!(err, MaskError::UnknownKind("explode".to_string()));
        assert!(err.to_string().contains("explode"));
    }

    #[test]
    fn parse_empty_list_is_rejected() {
        assert_eq!(EventMask::parse("").unwrap_err(), MaskError::Empty);
        assert_eq!(EventMask::parse(" , ").unwrap_err(), MaskError::Empty);
    }

    #[test]
    fn change_kind_mask_bits_are_distinct() {
        let kinds = [
            ChangeKind::Create,
            ChangeKind::Modify,
            ChangeKind::Delete,
            ChangeKind::Move,
            ChangeKind::Attrib,
        ];

        let mut union = EventMask::empty();
        for kind in kinds {
            assert!(!union.intersects(kind.mask()), "{kind} overlaps another kind");
            union |= kind.mask();
        }
        assert_eq!(union, EventMask::all());
    }

    #[test]
    fn change_kind_names_round_trip_through_parse() {
        for kind in [
            ChangeKind::Create,
            ChangeKind::Modify,
            ChangeKind::Delete,
            ChangeKind::Move,
            ChangeKind::Attrib,
        ] {
            assert_eq!(EventMask::parse(kind.name()).unwrap(), kind.mask());
        }
    }

    #[test]
    fn change_kind_display_matches_name() {
        assert_eq!(ChangeKind::Move.to_string(), "move");
    }
}
