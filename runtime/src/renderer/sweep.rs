// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Removes temp files headless browsers leave behind.
//!
//! Repeated launches otherwise fill the temp filesystem until Chromium
//! refuses to start. Profile directories claimed by running renders are
//! never touched. While any render is running, other leftovers are only
//! removed once they are older than the minimum age.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

/// File-name patterns (single `*` wildcard) of browser leftovers.
pub const DEFAULT_PATTERNS: &[&str] = &[
    ".org.chromium.*",
    ".com.google.Chrome.*",
    "chromium*",
    "chromiumoxide-runner*",
    "playwright*",
    "newsparse-chromium-*",
    ".X*-lock",
    "core.*",
];

/// Prefix of per-launch profile directories.
pub const PROFILE_PREFIX: &str = "newsparse-chromium-";

/// Age after which a leftover is removed even while renders are running.
/// Longer than any single render attempt.
pub const DEFAULT_MIN_AGE: Duration = Duration::from_secs(300);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub failed: usize,
    /// Too fresh to remove while other renders are running.
    pub skipped: usize,
}

/// Deletes entries in one directory whose names match known patterns.
///
/// Clones share the set of claimed profile directories.
#[derive(Debug, Clone)]
pub struct TempSweeper {
    root: PathBuf,
    patterns: Vec<String>,
    min_age: Duration,
    live: Arc<Mutex<HashSet<PathBuf>>>,
}

impl TempSweeper {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            patterns: DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect(),
            min_age: DEFAULT_MIN_AGE,
            live: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_min_age(mut self, min_age: Duration) -> Self {
        self.min_age = min_age;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fresh profile directory path for one browser launch (not created).
    /// Sweeps leave it alone until [`release_profile`](Self::release_profile).
    pub fn claim_profile(&self) -> PathBuf {
        let dir = self
            .root
            .join(format!("{PROFILE_PREFIX}{}", uuid::Uuid::new_v4().simple()));
        self.live().insert(dir.clone());
        dir
    }

    /// Delete a claimed profile directory and stop protecting it.
    pub fn release_profile(&self, dir: &Path) -> std::io::Result<()> {
        let removed = remove_path(dir);
        self.live().remove(dir);
        removed
    }

    /// Profile directories currently claimed.
    pub fn live_profiles(&self) -> usize {
        self.live().len()
    }

    fn live(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Entries directly under the root whose names match a pattern.
    pub fn matching(&self) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(e) => e,
            Err(e) => {
                debug!(root = %self.root.display(), error = %e, "temp root unreadable");
                return Vec::new();
            }
        };

        entries
            .flatten()
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| self.patterns.iter().any(|p| glob_match(p, name)))
            })
            .map(|entry| entry.path())
            .collect()
    }

    /// Remove matching entries directly under the root, except claimed
    /// profiles and, while any profile is claimed, entries younger than
    /// the minimum age.
    pub fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();
        for path in self.matching() {
            {
                let live = self.live();
                if live.contains(&path) {
                    continue;
                }
                if !live.is_empty() && !older_than(&path, self.min_age) {
                    report.skipped += 1;
                    continue;
                }
            }
            match remove_path(&path) {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "could not remove temp entry");
                    report.failed += 1;
                }
            }
        }

        if report.removed > 0 {
            info!(
                root = %self.root.display(),
                removed = report.removed,
                skipped = report.skipped,
                "swept browser temp files"
            );
        }
        report
    }
}

/// Unknown modification times count as fresh.
fn older_than(path: &Path, min_age: Duration) -> bool {
    std::fs::symlink_metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age >= min_age)
}

/// Remove a file or a directory tree. Missing paths are fine.
pub fn remove_path(path: &Path) -> std::io::Result<()> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

/// Match `name` against a pattern with at most one `*`.
fn glob_match(pattern: &str, name: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == name,
        Some((prefix, suffix)) => {
            name.len() >= prefix.len() + suffix.len()
                && name.starts_with(prefix)
                && name.ends_with(suffix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match(".org.chromium.*", ".org.chromium.Chromium.abc"));
        assert!(glob_match(".X*-lock", ".X99-lock"));
        assert!(!glob_match(".X*-lock", ".X-loc"));
        assert!(glob_match("core.*", "core.1234"));
        assert!(!glob_match("core.*", "score.1"));
        assert!(glob_match("exact", "exact"));
    }

    #[test]
    fn test_sweep_removes_only_matching() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join(".org.chromium.Chromium.x1/sub")).unwrap();
        std::fs::write(root.join(".org.chromium.Chromium.x1/sub/f"), b"x").unwrap();
        std::fs::write(root.join("core.42"), b"dump").unwrap();
        std::fs::create_dir(root.join("newsparse-chromium-abc")).unwrap();
        std::fs::write(root.join("keep.txt"), b"keep").unwrap();
        std::fs::create_dir(root.join("my-project")).unwrap();

        let sweeper = TempSweeper::new(root);
        assert_eq!(sweeper.matching().len(), 3);
        let report = sweeper.sweep();
        assert_eq!(
            report,
            SweepReport {
                removed: 3,
                failed: 0,
                skipped: 0
            }
        );
        assert!(root.join("keep.txt").exists());
        assert!(root.join("my-project").exists());
        assert!(!root.join("core.42").exists());
    }

    #[test]
    fn test_sweep_missing_root_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let report = TempSweeper::new(dir.path().join("nope")).sweep();
        assert_eq!(report, SweepReport::default());
    }

    #[test]
    fn test_claimed_profiles_are_unique_and_survive_sweeps() {
        let dir = tempfile::tempdir().unwrap();
        let sweeper = TempSweeper::new(dir.path()).with_patterns([format!("{PROFILE_PREFIX}*")]);
        let a = sweeper.claim_profile();
        let b = sweeper.claim_profile();
        assert_ne!(a, b);
        std::fs::create_dir(&a).unwrap();
        assert_eq!(sweeper.live_profiles(), 2);

        assert_eq!(sweeper.sweep().removed, 0);
        assert!(a.exists());

        sweeper.release_profile(&a).unwrap();
        assert!(!a.exists());
        // Never created, releasing is still fine.
        sweeper.release_profile(&b).unwrap();
        assert_eq!(sweeper.live_profiles(), 0);
    }

    #[test]
    fn test_fresh_leftovers_wait_while_renders_run() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join(".org.chromium.Chromium.live"), b"shm").unwrap();

        let sweeper = TempSweeper::new(root);
        let running = sweeper.claim_profile();
        std::fs::create_dir(&running).unwrap();

        let report = sweeper.sweep();
        assert_eq!(report.removed, 0);
        assert_eq!(report.skipped, 1);
        assert!(root.join(".org.chromium.Chromium.live").exists());

        // Aged out: removed even though a render is still running.
        let report = sweeper.clone().with_min_age(Duration::ZERO).sweep();
        assert_eq!(report.removed, 1);
        assert!(running.exists());

        sweeper.release_profile(&running).unwrap();
    }

    #[test]
    fn test_idle_sweep_ignores_age() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("core.7"), b"dump").unwrap();
        let report = TempSweeper::new(dir.path()).sweep();
        assert_eq!(report.removed, 1);
        assert_eq!(report.skipped, 0);
    }
}
