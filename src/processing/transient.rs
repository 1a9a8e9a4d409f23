use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use tracing::warn;

use crate::error::Result;

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// A temporary file path owned by one pipeline invocation
///
/// The file itself is created by whichever tool writes to the path. When the
/// guard goes out of scope the file is removed, on every exit path.
#[derive(Debug)]
pub struct TransientFile {
    path: PathBuf,
    armed: bool,
}

impl TransientFile {
    /// Reserve `<dir>/<prefix><scope><token>.jpg`, creating `dir` if needed
    pub fn reserve<P: AsRef<Path>>(dir: P, prefix: &str, scope: &str) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let token: u64 = rand::thread_rng().gen();
        let sequence = COUNTER.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}{}{:016x}{:x}.jpg", prefix, scope, token, sequence);

        Ok(Self {
            path: dir.join(name),
            armed: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Disarm the guard and hand out the path
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if !self.armed || !self.path.exists() {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove transient file {:?}: {}", self.path, e);
        }
    }
}
