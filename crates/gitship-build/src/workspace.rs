use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use gitship_core::{PushEvent, WorkspaceConfig};

/// Hands out a checkout directory per run.
///
/// Paths combine the repository name, commit SHA, process id and a
/// counter, so two runs never share a directory even when they target the
/// same repository and commit.
#[derive(Debug)]
pub struct WorkspaceAllocator {
    root: PathBuf,
    next: AtomicU64,
}

impl WorkspaceAllocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            next: AtomicU64::new(0),
        }
    }

    /// `[workspace].root`, or `<tmp>/gitship` when unset.
    pub fn from_config(config: &WorkspaceConfig) -> Self {
        let root = config
            .root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("gitship"));
        Self::new(root)
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    pub fn allocate(&self, event: &PushEvent) -> PathBuf {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        let sha: String = event.sha().chars().take(12).collect();
        let dir = format!(
            "{repo}-{sha}-{pid}-{n}",
            repo = sanitize(event.repo_name()),
            sha = sanitize(&sha),
            pid = std::process::id(),
        );
        self.root.join(dir)
    }
}

fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
