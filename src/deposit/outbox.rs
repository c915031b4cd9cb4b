use super::model::State;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("I/O error moving {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("target already exists: {0}")]
    TargetExists(PathBuf),

    #[error("deposit in state {0} cannot be moved to an outbox")]
    NotTerminal(State),

    #[error("not a deposit directory: {0}")]
    InvalidSource(PathBuf),
}

pub type Result<T> = std::result::Result<T, OutboxError>;

/// Destination for deposits that left the inbox
pub trait Outbox: Send + Sync {
    /// Move the deposit directory to the location for `state`, returning its new path
    fn move_deposit(&self, path: &Path, state: State) -> Result<PathBuf>;

    fn move_accepted(&self, path: &Path) -> Result<PathBuf> {
        self.move_deposit(path, State::Accepted)
    }

    fn move_rejected(&self, path: &Path, reason: &str) -> Result<PathBuf> {
        info!(path = %path.display(), reason, "Rejecting deposit");
        self.move_deposit(path, State::Rejected)
    }

    fn move_failed(&self, path: &Path, reason: &str) -> Result<PathBuf> {
        info!(path = %path.display(), reason, "Failing deposit");
        self.move_deposit(path, State::Failed)
    }
}

/// Outbox laid out as `processed/`, `rejected/` and `failed/` subdirectories
#[derive(Debug, Clone)]
pub struct DirectoryOutbox {
    root: PathBuf,
}

impl DirectoryOutbox {
    pub const PROCESSED: &'static str = "processed";
    pub const REJECTED: &'static str = "rejected";
    pub const FAILED: &'static str = "failed";

    /// Create the outbox, making its subdirectories if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for sub in [Self::PROCESSED, Self::REJECTED, Self::FAILED] {
            let dir = root.join(sub);
            fs::create_dir_all(&dir).map_err(|source| OutboxError::Io { path: dir, source })?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir_for(&self, state: State) -> Result<PathBuf> {
        let sub = match state {
            State::Accepted => Self::PROCESSED,
            State::Rejected => Self::REJECTED,
            State::Failed => Self::FAILED,
            State::Pending => return Err(OutboxError::NotTerminal(state)),
        };
        Ok(self.root.join(sub))
    }
}

impl Outbox for DirectoryOutbox {
    fn move_deposit(&self, path: &Path, state: State) -> Result<PathBuf> {
        let name = path
            .file_name()
            .ok_or_else(|| OutboxError::InvalidSource(path.to_path_buf()))?;
        let target = self.dir_for(state)?.join(name);

        if target.exists() {
            return Err(OutboxError::TargetExists(target));
        }

        fs::rename(path, &target).map_err(|source| OutboxError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!(from = %path.display(), to = %target.display(), %state, "Deposit moved to outbox");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_layout() {
        let temp_dir = TempDir::new().unwrap();
        let outbox = DirectoryOutbox::new(temp_dir.path().join("outbox")).unwrap();

        for sub in ["processed", "rejected", "failed"] {
            assert!(outbox.root().join(sub).is_dir());
        }
    }

    #[test]
    fn test_move_per_state() {
        let temp_dir = TempDir::new().unwrap();
        let inbox = temp_dir.path().join("inbox");
        let outbox = DirectoryOutbox::new(temp_dir.path().join("outbox")).unwrap();

        for (name, state, sub) in [
            ("a", State::Accepted, "processed"),
            ("b", State::Rejected, "rejected"),
            ("c", State::Failed, "failed"),
        ] {
            let deposit = inbox.join(name);
            fs::create_dir_all(&deposit).unwrap();
            fs::write(deposit.join("deposit.properties"), "x=y").unwrap();

            let moved = outbox.move_deposit(&deposit, state).unwrap();
            assert_eq!(moved, outbox.root().join(sub).join(name));
            assert!(!deposit.exists());
            assert!(moved.join("deposit.properties").is_file());
        }
    }

    #[test]
    fn test_existing_target_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let outbox = DirectoryOutbox::new(temp_dir.path().join("outbox")).unwrap();
        let deposit = temp_dir.path().join("inbox").join("dup");
        fs::create_dir_all(&deposit).unwrap();
        fs::create_dir_all(outbox.root().join("failed").join("dup")).unwrap();

        let result = outbox.move_failed(&deposit, "disk full");
        assert!(matches!(result, Err(OutboxError::TargetExists(_))));
        assert!(deposit.exists());
    }

    #[test]
    fn test_pending_cannot_be_moved() {
        let temp_dir = TempDir::new().unwrap();
        let outbox = DirectoryOutbox::new(temp_dir.path()).unwrap();
        let result = outbox.move_deposit(temp_dir.path(), State::Pending);
        assert!(matches!(result, Err(OutboxError::NotTerminal(State::Pending))));
    }
}
