// src/watch/filter.rs

//! Turns raw `notify` events into [`ChangeEvent`]s worth rebuilding for.

use std::path::Path;

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind};

use crate::types::{ChangeEvent, ChangeKind};

/// Map a `notify` event kind onto a [`ChangeKind`].
///
/// Returns `None` for kinds that never warrant a rebuild: reads/opens
/// (`Access`) and pure metadata changes such as chmod or touch-only
/// timestamp updates.
pub fn classify(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Create),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Rename),
        EventKind::Modify(_) => Some(ChangeKind::Write),
        EventKind::Remove(_) => Some(ChangeKind::Remove),
        EventKind::Access(_) => None,
        EventKind::Any | EventKind::Other => Some(ChangeKind::Other),
    }
}

/// True if `kind` may bring a new directory into a watched tree: a create,
/// or the arriving side of a rename. Some backends only report
/// `Create(Any)`, so callers still have to check the path.
pub fn may_create_dir(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(CreateKind::Folder | CreateKind::Any)
            | EventKind::Modify(ModifyKind::Name(
                RenameMode::To | RenameMode::Both | RenameMode::Any
            ))
    )
}

/// Source-file filter applied before anything reaches the debouncer.
#[derive(Debug, Clone)]
pub struct ChangeFilter {
    suffix: String,
}

impl ChangeFilter {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    pub fn matches_path(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| name.to_string_lossy().ends_with(&self.suffix))
            .unwrap_or(false)
    }

    /// Translate one `notify` event into zero or more change events, one per
    /// matching path.
    pub fn translate(&self, event: &Event) -> Vec<ChangeEvent> {
        let Some(kind) = classify(&event.kind) else {
            return Vec::new();
        };

        event
            .paths
            .iter()
            .filter(|p| self.matches_path(p))
            .map(|p| ChangeEvent::new(p.clone(), kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, DataChange, MetadataKind, RemoveKind};
    use std::path::PathBuf;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn chmod_only_events_are_dropped() {
        let filter = ChangeFilter::new(".go");
        let ev = event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            "./main.go",
        );
        assert!(filter.translate(&ev).is_empty());
    }

    #[test]
    fn content_writes_to_source_files_pass() {
        let filter = ChangeFilter::new(".go");
        let ev = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            "./internal/util.go",
        );
        assert_eq!(
            filter.translate(&ev),
            vec![ChangeEvent::new("./internal/util.go", ChangeKind::Write)]
        );
    }

    #[test]
    fn non_source_files_are_ignored() {
        let filter = ChangeFilter::new(".go");
        let ev = event(EventKind::Create(CreateKind::File), "./README.md");
        assert!(filter.translate(&ev).is_empty());

        // A suffix match on a directory component alone does not count.
        let ev = event(EventKind::Create(CreateKind::File), "./pkg.go/notes.txt");
        assert!(filter.translate(&ev).is_empty());
    }

    #[test]
    fn renames_keep_only_matching_paths() {
        let filter = ChangeFilter::new(".go");
        let ev = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from("./old.go~"))
            .add_path(PathBuf::from("./old.go"));
        let out = filter.translate(&ev);
        assert_eq!(out, vec![ChangeEvent::new("./old.go", ChangeKind::Rename)]);
    }

    #[test]
    fn access_events_never_trigger() {
        assert_eq!(classify(&EventKind::Access(AccessKind::Any)), None);
        assert_eq!(
            classify(&EventKind::Remove(RemoveKind::File)),
            Some(ChangeKind::Remove)
        );
    }

    #[test]
    fn directories_moved_into_the_tree_count_as_new() {
        assert!(may_create_dir(&EventKind::Create(CreateKind::Folder)));
        assert!(may_create_dir(&EventKind::Create(CreateKind::Any)));
        assert!(may_create_dir(&EventKind::Modify(ModifyKind::Name(RenameMode::To))));
        assert!(may_create_dir(&EventKind::Modify(ModifyKind::Name(RenameMode::Both))));

        assert!(!may_create_dir(&EventKind::Create(CreateKind::File)));
        assert!(!may_create_dir(&EventKind::Modify(ModifyKind::Name(RenameMode::From))));
        assert!(!may_create_dir(&EventKind::Modify(ModifyKind::Data(DataChange::Content))));
    }
}
