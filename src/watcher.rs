//! Filesystem watcher: adapts the [`notify`] backend to internal events.
//!
//! One watch is registered per configured rule, recursive or not as the rule
//! says. The notify callback is kept lightweight: it maps each raw backend
//! event onto a [`ChangeKind`], builds an [`FsEvent`] and `try_send`s it into
//! the dispatch channel. All filtering and delivery happens downstream in the
//! event loop, strictly one event at a time.

use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

use crate::rule::{ChangeKind, WatchRule};

/// One observed filesystem change, as consumed by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    /// Directory containing the change.
    pub path: PathBuf,

    /// Base name of the affected entry.
    pub name: String,

    /// Full path of the affected entry.
    pub pathname: PathBuf,

    /// The kind of change.
    pub kind: ChangeKind,
}

/// Errors that can occur while setting up filesystem watches.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// The underlying watcher could not be created or a watch could not be
    /// registered.
    #[error("failed to set up watcher: {0}")]
    Init(#[from] notify::Error),

    /// A configured watch path does not exist or is not a directory.
    #[error("watch path is not a directory: {}", .0.display())]
    DirectoryNotFound(PathBuf),
}

/// Watches the directories of all configured rules.
///
/// Dropping the watcher stops event delivery.
#[derive(Debug)]
pub struct DirWatcher {
    /// The underlying filesystem watcher.
    ///
    /// Kept alive to maintain the watch subscriptions.
    #[allow(dead_code)]
    watcher: RecommendedWatcher,
}

impl DirWatcher {
    /// Registers one watch per rule and starts delivering events on `tx`.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DirectoryNotFound`] if a rule's path is not an
    /// existing directory, or [`WatcherError::Init`] if the backend fails.
    pub fn new<'a, I>(rules: I, tx: mpsc::Sender<FsEvent>) -> Result<Self, WatcherError>
    where
        I: IntoIterator<Item = &'a WatchRule>,
    {
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                handle_notify_event(res, &tx);
            },
            Config::default(),
        )?;

        for rule in rules {
            if !rule.path.is_dir() {
                return Err(WatcherError::DirectoryNotFound(rule.path.clone()));
            }

            let mode = if rule.recursive {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            watcher.watch(&rule.path, mode)?;

            debug!(
                rule = %rule.name,
                path = %rule.path.display(),
                recursive = rule.recursive,
                "registered watch"
            );
        }

        Ok(Self { watcher })
    }
}

/// Callback invoked by the notify backend on its own thread.
///
/// Kept lightweight: convert, then hand off through the channel. A full
/// channel drops the event with a warning rather than blocking the backend.
fn handle_notify_event(res: Result<Event, notify::Error>, tx: &mpsc::Sender<FsEvent>) {
    let event = match res {
        Ok(event) => event,
        Err(e) => {
            error!(error = %e, "filesystem watcher error");
            return;
        }
    };

    let Some(kind) = map_change_kind(&event.kind) else {
        trace!(kind = ?event.kind, "discarding uninteresting event kind");
        return;
    };

    for path in &event.paths {
        let Some(fs_event) = to_fs_event(path, kind) else {
            trace!(path = %path.display(), "event path has no base name, skipping");
            continue;
        };

        if let Err(e) = tx.try_send(fs_event) {
            warn!(error = %e, "event channel full, dropping event");
        }
    }
}

/// Maps a raw backend event kind onto the rule vocabulary.
///
/// Access events and catch-all kinds carry no change we notify about and map
/// to `None`.
fn map_change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Create),
        EventKind::Remove(_) => Some(ChangeKind::Delete),
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Move),
        EventKind::Modify(ModifyKind::Metadata(_)) => Some(ChangeKind::Attrib),
        EventKind::Modify(_) => Some(ChangeKind::Modify),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}

/// Splits an affected path into the directory/base-name pair the dispatcher
/// and templates work with.
fn to_fs_event(path: &Path, kind: ChangeKind) -> Option<FsEvent> {
    let name = path.file_name()?.to_string_lossy().into_owned();
    let parent = path.parent().unwrap_or(path).to_path_buf();

    Some(FsEvent {
        path: parent,
        name,
        pathname: path.to_path_buf(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::EventMask;
    use notify::event::{
        AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind, RenameMode,
    };

    fn rule_for(path: &Path, recursive: bool) -> WatchRule {
        WatchRule {
            name: "test".to_string(),
            path: path.to_path_buf(),
            mask: EventMask::all(),
            recursive,
            ignore: None,
            mail_from: "watcher@example.com".to_string(),
            mail_to: "ops@example.com".to_string(),
            subject: "${name}".to_string(),
            body: "${pathname}".to_string(),
            body_type: "plain".to_string(),
        }
    }

    #[test]
    fn maps_create_and_remove() {
        assert_eq!(
            map_change_kind(&EventKind::Create(CreateKind::File)),
            Some(ChangeKind::Create)
        );
        assert_eq!(
            map_change_kind(&EventKind::Remove(RemoveKind::Any)),
            Some(ChangeKind::Delete)
        );
    }

    #[test]
    fn maps_modify_variants() {
        assert_eq!(
            map_change_kind(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(ChangeKind::Modify)
        );
        assert_eq!(
            map_change_kind(&EventKind::Modify(ModifyKind::Any)),
            Some(ChangeKind::Modify)
        );
        assert_eq!(
            map_change_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::Both))),
            Some(ChangeKind::Move)
        );
        assert_eq!(
            map_change_kind(&EventKind::Modify(ModifyKind::Metadata(
                MetadataKind::Permissions
            ))),
            Some(ChangeKind::Attrib)
        );
    }

    #[test]
    fn discards_access_and_catch_all_kinds() {
        assert_eq!(
            map_change_kind(&EventKind::Access(AccessKind::Read)),
            None
        );
        assert_eq!(map_change_kind(&EventKind::Any), None);
        assert_eq!(map_change_kind(&EventKind::Other), None);
    }

    #[test]
    fn splits_path_into_directory_and_name() {
        let event = to_fs_event(Path::new("/data/sub/f.txt"), ChangeKind::Create).unwrap();
        assert_eq!(event.path, Path::new("/data/sub"));
        assert_eq!(event.name, "f.txt");
        assert_eq!(event.pathname, Path::new("/data/sub/f.txt"));
        assert_eq!(event.kind, ChangeKind::Create);
    }

    #[test]
    fn root_path_has_no_base_name() {
        assert!(to_fs_event(Path::new("/"), ChangeKind::Modify).is_none());
    }

    #[tokio::test]
    async fn missing_directory_is_rejected() {
        let (tx, _rx) = mpsc::channel(8);
        let rule = rule_for(Path::new("/nonexistent/mailwatch-test"), true);

        let err = DirWatcher::new([&rule], tx).unwrap_err();
        assert!(matches!(err, WatcherError::DirectoryNotFound(_)));
    }

    #[tokio::test]
    async fn watches_existing_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).expect("create nested dir");

        let (tx, _rx) = mpsc::channel(8);
        let outer = rule_for(dir.path(), false);
        let inner = rule_for(&nested, true);

        assert!(DirWatcher::new([&outer, &inner], tx).is_ok());
    }
}
