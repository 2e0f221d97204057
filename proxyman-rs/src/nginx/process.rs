//! Gateway to the external nginx process. All daemon interaction goes
//! through a small command-execution trait so tests can substitute a
//! scripted fake instead of spawning real processes.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{ProxymanError, Result};

/// Captured outcome of one external command invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes an external command and captures its output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}

/// Real runner backed by `tokio::process::Command`.
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        debug!(program, ?args, "running external command");
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| ProxymanError::io(format!("failed to run {}", program), e))?;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Result of asking the daemon to validate its configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigTestResult {
    pub valid: bool,
    pub message: String,
}

/// Daemon process status, best-effort.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonStatus {
    pub running: bool,
    pub version: Option<String>,
}

/// Invokes the daemon's test, reload and version commands.
pub struct NginxProcess {
    runner: Arc<dyn CommandRunner>,
    binary: String,
}

impl NginxProcess {
    pub fn new(runner: Arc<dyn CommandRunner>, binary: impl Into<String>) -> Self {
        Self {
            runner,
            binary: binary.into(),
        }
    }

    /// Run `nginx -t`. A non-zero exit means the configuration is
    /// invalid; that is a normal outcome, not an error.
    pub async fn test_configuration(&self) -> Result<ConfigTestResult> {
        let output = self.runner.run(&self.binary, &["-t"]).await?;

        // nginx prints test diagnostics on stderr
        let message = if output.stderr.trim().is_empty() {
            output.stdout.trim().to_string()
        } else {
            output.stderr.trim().to_string()
        };

        Ok(ConfigTestResult {
            valid: output.success(),
            message,
        })
    }

    /// Run `nginx -s reload`. Non-zero exit is an error carrying the
    /// daemon's diagnostics.
    pub async fn reload(&self) -> Result<()> {
        let output = self.runner.run(&self.binary, &["-s", "reload"]).await?;

        if !output.success() {
            return Err(ProxymanError::Reload(output.stderr.trim().to_string()));
        }

        Ok(())
    }

    /// Best-effort status probe via `nginx -v`. Transport failures
    /// degrade to "not running" instead of propagating.
    pub async fn status(&self) -> DaemonStatus {
        match self.runner.run(&self.binary, &["-v"]).await {
            Ok(output) if output.success() => {
                // version string lands on stderr, e.g. "nginx version: nginx/1.25.3"
                let version = output
                    .stderr
                    .trim()
                    .rsplit('/')
                    .next()
                    .filter(|v| !v.is_empty())
                    .map(|v| v.to_string());
                DaemonStatus {
                    running: true,
                    version,
                }
            }
            Ok(_) => DaemonStatus {
                running: false,
                version: None,
            },
            Err(e) => {
                warn!("daemon status probe failed: {}", e);
                DaemonStatus {
                    running: false,
                    version: None,
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedRunner;
    use super::*;

    #[tokio::test]
    async fn test_configuration_valid() {
        let runner = Arc::new(ScriptedRunner::new(vec![CommandOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: "nginx: configuration file /etc/nginx/nginx.conf test is successful"
                .to_string(),
        }]));
        let process = NginxProcess::new(runner, "nginx");

        let result = process.test_configuration().await.unwrap();
        assert!(result.valid);
        assert!(result.message.contains("test is successful"));
    }

    #[tokio::test]
    async fn test_configuration_invalid_is_not_an_error() {
        let runner = Arc::new(ScriptedRunner::new(vec![ScriptedRunner::fail(
            "nginx: [emerg] unexpected end of file",
        )]));
        let process = NginxProcess::new(runner, "nginx");

        let result = process.test_configuration().await.unwrap();
        assert!(!result.valid);
        assert!(result.message.contains("[emerg]"));
    }

    #[tokio::test]
    async fn test_reload_failure_carries_stderr() {
        let runner = Arc::new(ScriptedRunner::new(vec![ScriptedRunner::fail(
            "nginx: [error] invalid PID",
        )]));
        let process = NginxProcess::new(runner, "nginx");

        match process.reload().await {
            Err(ProxymanError::Reload(msg)) => assert!(msg.contains("invalid PID")),
            other => panic!("expected Reload error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_parses_version() {
        let runner = Arc::new(ScriptedRunner::new(vec![CommandOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: "nginx version: nginx/1.25.3".to_string(),
        }]));
        let process = NginxProcess::new(runner, "nginx");

        let status = process.status().await;
        assert!(status.running);
        assert_eq!(status.version.as_deref(), Some("1.25.3"));
    }

    #[tokio::test]
    async fn test_status_degrades_on_failure() {
        let runner = Arc::new(ScriptedRunner::new(vec![ScriptedRunner::fail("no binary")]));
        let process = NginxProcess::new(runner, "nginx");

        let status = process.status().await;
        assert!(!status.running);
        assert!(status.version.is_none());
    }

    #[tokio::test]
    async fn test_invocation_arguments() {
        let runner = Arc::new(ScriptedRunner::new(vec![]));
        let process = NginxProcess::new(runner.clone(), "/usr/sbin/nginx");

        process.test_configuration().await.unwrap();
        process.reload().await.unwrap();

        let calls = runner.calls.lock().await;
        assert_eq!(calls[0], vec!["/usr/sbin/nginx", "-t"]);
        assert_eq!(calls[1], vec!["/usr/sbin/nginx", "-s", "reload"]);
    }
}
