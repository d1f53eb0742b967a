//! Document watcher — turns on-disk edits into reload requests.
//!
//! Editors usually replace a file by writing a sibling and renaming it into
//! place, so the parent directories are watched rather than the documents
//! themselves and events are filtered by file name. A short debounce window
//! collapses the burst of events a single save produces.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use lamella_app::config::DocumentPaths;
use lamella_app::coordinator::ReloadRequest;
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Watch both documents and send [`ReloadRequest::ConfigChanged`] when one
/// of them changes on disk.
///
/// The returned watcher must stay alive for events to keep flowing; dropping
/// it also ends the forwarding thread.
///
/// # Errors
///
/// Returns an error when the watcher cannot be created or a parent
/// directory cannot be watched.
pub fn spawn(
    paths: &DocumentPaths,
    debounce: Duration,
    reload_tx: mpsc::Sender<ReloadRequest>,
) -> anyhow::Result<RecommendedWatcher> {
    let (tx, rx) = std::sync::mpsc::channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |result: Result<Event, notify::Error>| match result {
            Ok(event)
                if matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) =>
            {
                let _ = tx.send(event);
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "document watcher error"),
        },
        NotifyConfig::default(),
    )
    .context("create document watcher")?;

    let mut watched = HashSet::new();
    for path in [&paths.shutters, &paths.schedule] {
        let dir = parent_dir(path);
        if watched.insert(dir.to_path_buf()) {
            watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .with_context(|| format!("watch {}", dir.display()))?;
        }
    }

    let names: Vec<OsString> = [&paths.shutters, &paths.schedule]
        .into_iter()
        .filter_map(|path| path.file_name().map(ToOwned::to_owned))
        .collect();

    thread::spawn(move || {
        let mut last_reload: Option<Instant> = None;
        for event in &rx {
            if !matches_documents(&event, &names) {
                continue;
            }
            if last_reload.is_some_and(|at| at.elapsed() < debounce) {
                debug!(paths = ?event.paths, "change within debounce window");
                continue;
            }
            last_reload = Some(Instant::now());
            info!(paths = ?event.paths, "document changed on disk");
            if reload_tx.blocking_send(ReloadRequest::ConfigChanged).is_err() {
                // Coordinator is gone, nothing left to notify.
                break;
            }
        }
    });

    Ok(watcher)
}

/// Directory to watch for changes to `path`.
fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

/// Whether any of the event's paths names one of the documents.
fn matches_documents(event: &Event, names: &[OsString]) -> bool {
    event.paths.iter().any(|path| {
        path.file_name()
            .is_some_and(|name| names.iter().any(|wanted| wanted == name))
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use notify::event::{CreateKind, ModifyKind};

    use super::*;

    fn names() -> Vec<OsString> {
        vec![OsString::from("shutters.toml"), OsString::from("schedule.toml")]
    }

    #[test]
    fn should_match_events_touching_a_document() {
        let event = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/etc/lamella/shutters.toml"));
        assert!(matches_documents(&event, &names()));
    }

    #[test]
    fn should_ignore_events_for_other_files() {
        let event = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/etc/lamella/shutters.toml.swp"));
        assert!(!matches_documents(&event, &names()));
    }

    #[test]
    fn should_match_renames_by_either_path() {
        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/etc/lamella/.schedule.toml.tmp"))
            .add_path(PathBuf::from("/etc/lamella/schedule.toml"));
        assert!(matches_documents(&event, &names()));
    }

    #[test]
    fn should_watch_current_dir_for_bare_file_names() {
        assert_eq!(parent_dir(Path::new("shutters.toml")), Path::new("."));
    }

    #[test]
    fn should_watch_parent_dir_for_absolute_paths() {
        assert_eq!(
            parent_dir(Path::new("/etc/lamella/shutters.toml")),
            Path::new("/etc/lamella")
        );
    }

    #[tokio::test]
    async fn should_request_reload_when_document_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DocumentPaths {
            shutters: dir.path().join("shutters.toml"),
            schedule: dir.path().join("schedule.toml"),
        };
        std::fs::write(&paths.shutters, "[items]\n").unwrap();
        std::fs::write(&paths.schedule, "").unwrap();

        let (reload_tx, mut reload_rx) = mpsc::channel(8);
        let _watcher = spawn(&paths, Duration::from_millis(50), reload_tx).unwrap();

        std::fs::write(&paths.shutters, "[items]\n# touched\n").unwrap();

        let request = tokio::time::timeout(Duration::from_secs(5), reload_rx.recv())
            .await
            .expect("watcher should report the change");
        assert_eq!(request, Some(ReloadRequest::ConfigChanged));
    }
}
