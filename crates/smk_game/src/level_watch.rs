use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Polls a level file's modification time so edits on disk trigger a reload.
pub struct LevelWatcher {
    level_path: PathBuf,
    last_seen_modified: Option<SystemTime>,
}

impl LevelWatcher {
    pub fn new(level_path: PathBuf) -> Self {
        let last_seen_modified = modified_time(&level_path);
        Self {
            level_path,
            last_seen_modified,
        }
    }

    /// True once per observed change. A file that disappears does not
    /// trigger; its reappearance does.
    pub fn should_reload(&mut self) -> bool {
        let current = modified_time(&self.level_path);
        match (self.last_seen_modified, current) {
            (Some(old), Some(now)) if now > old => {
                self.last_seen_modified = Some(now);
                true
            }
            (None, Some(now)) => {
                self.last_seen_modified = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Record the current state as seen, e.g. after a manual reload.
    pub fn mark_seen(&mut self) {
        self.last_seen_modified = modified_time(&self.level_path);
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}
