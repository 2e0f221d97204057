//! Domain configuration files on disk: one file per domain-scoped
//! rule. Writes snapshot the previous content so a failed daemon test
//! can roll the file back to the last accepted state.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::{ProxymanError, Result};

/// Previous state of a configuration file, captured before a write.
#[derive(Debug)]
pub struct WriteSnapshot {
    path: PathBuf,
    /// `None` when the file did not exist before the write
    previous: Option<String>,
}

pub struct ConfigWriter {
    config_dir: PathBuf,
}

impl ConfigWriter {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// File name for a rule's domain configuration. Every
    /// non-alphanumeric character of the domain becomes an underscore,
    /// so the name is filesystem-safe and deterministic.
    pub fn file_name(rule_id: &str, domain: &str) -> String {
        let sanitized: String = domain
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("{}-{}.conf", rule_id, sanitized)
    }

    pub fn file_path(&self, rule_id: &str, domain: &str) -> PathBuf {
        self.config_dir.join(Self::file_name(rule_id, domain))
    }

    /// Write a rule's compiled configuration, returning a snapshot of
    /// what the file held before.
    pub async fn write(&self, rule_id: &str, domain: &str, content: &str) -> Result<WriteSnapshot> {
        fs::create_dir_all(&self.config_dir)
            .await
            .map_err(|e| ProxymanError::io("failed to create configuration directory", e))?;

        let path = self.file_path(rule_id, domain);
        let previous = match fs::read_to_string(&path).await {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(ProxymanError::io(
                    "failed to read previous domain configuration",
                    e,
                ))
            }
        };

        fs::write(&path, content)
            .await
            .map_err(|e| ProxymanError::io("failed to write domain configuration", e))?;
        debug!(path = %path.display(), "wrote domain configuration");

        Ok(WriteSnapshot { path, previous })
    }

    /// Put a file back to its snapshotted state. A file that did not
    /// exist before the write is removed again.
    pub async fn restore(&self, snapshot: WriteSnapshot) -> Result<()> {
        match snapshot.previous {
            Some(content) => fs::write(&snapshot.path, content)
                .await
                .map_err(|e| ProxymanError::io("failed to restore domain configuration", e)),
            None => remove_if_present(&snapshot.path).await,
        }
    }

    /// Delete a rule's domain configuration. Deleting an absent file is
    /// success, not an error.
    pub async fn remove(&self, rule_id: &str, domain: &str) -> Result<()> {
        let path = self.file_path(rule_id, domain);
        remove_if_present(&path).await
    }
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "removed domain configuration");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ProxymanError::io(
            "failed to remove domain configuration",
            e,
        )),
    }
}
