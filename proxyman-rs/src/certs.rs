//! Certificate material on disk: one subdirectory per certificate name
//! holding `certificate.pem`, `private.key` and an optional
//! `chain.pem`.

use serde::Serialize;
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

use crate::error::{ProxymanError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct CertificatePaths {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub chain_path: Option<PathBuf>,
}

pub struct CertificateStore {
    ssl_dir: PathBuf,
}

impl CertificateStore {
    pub fn new(ssl_dir: impl Into<PathBuf>) -> Self {
        Self {
            ssl_dir: ssl_dir.into(),
        }
    }

    fn cert_dir(&self, name: &str) -> PathBuf {
        let sanitized: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.ssl_dir.join(sanitized)
    }

    /// Write certificate material under the store, returning the paths
    /// a rule should reference.
    pub async fn store(
        &self,
        name: &str,
        certificate: &str,
        private_key: &str,
        chain: Option<&str>,
    ) -> Result<CertificatePaths> {
        let dir = self.cert_dir(name);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| ProxymanError::io("failed to create certificate directory", e))?;

        let cert_path = dir.join("certificate.pem");
        let key_path = dir.join("private.key");

        fs::write(&cert_path, certificate)
            .await
            .map_err(|e| ProxymanError::io("failed to store SSL certificate", e))?;
        fs::write(&key_path, private_key)
            .await
            .map_err(|e| ProxymanError::io("failed to store SSL private key", e))?;

        let chain_path = match chain {
            Some(chain) => {
                let path = dir.join("chain.pem");
                fs::write(&path, chain)
                    .await
                    .map_err(|e| ProxymanError::io("failed to store SSL chain", e))?;
                Some(path)
            }
            None => None,
        };

        info!(name, "stored certificate material");
        Ok(CertificatePaths {
            cert_path,
            key_path,
            chain_path,
        })
    }

    /// Resolve the on-disk paths for a stored certificate, or NotFound
    /// if the store has no such name.
    pub async fn resolve(&self, name: &str) -> Result<CertificatePaths> {
        let dir = self.cert_dir(name);
        let cert_path = dir.join("certificate.pem");
        let key_path = dir.join("private.key");

        let exists = fs::try_exists(&cert_path)
            .await
            .map_err(|e| ProxymanError::io("failed to probe certificate", e))?;
        if !exists {
            return Err(ProxymanError::NotFound(format!("certificate '{}'", name)));
        }

        let chain = dir.join("chain.pem");
        let chain_path = match fs::try_exists(&chain).await {
            Ok(true) => Some(chain),
            _ => None,
        };

        Ok(CertificatePaths {
            cert_path,
            key_path,
            chain_path,
        })
    }

    /// Remove a certificate's directory. Removing an absent name is
    /// success.
    pub async fn remove(&self, name: &str) -> Result<()> {
        match fs::remove_dir_all(self.cert_dir(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ProxymanError::io("failed to remove certificate", e)),
        }
    }
}
