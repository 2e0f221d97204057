//! proxyman-rs: reverse-proxy rule manager
//!
//! Manages routing rules for containerized services and compiles them
//! into nginx configuration. Rule changes are validated, compiled,
//! written to disk, then applied through a test-then-reload cycle
//! against the nginx daemon. Per-rule traffic and error telemetry is
//! kept in bounded in-memory buffers.
//!
//! # Example
//!
//! ```no_run
//! use proxyman_rs::config::Config;
//! use proxyman_rs::nginx::{ConfigWriter, NginxProcess, ReloadCoordinator, TokioCommandRunner};
//! use proxyman_rs::rules::RuleManager;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() {
//! let config = Config::default();
//! let runner = Arc::new(TokioCommandRunner);
//! let process = Arc::new(NginxProcess::new(runner, config.nginx.binary.clone()));
//! let coordinator = Arc::new(ReloadCoordinator::new(
//!     process.clone(),
//!     Duration::from_secs(config.nginx.reload_timeout_secs),
//! ));
//! let writer = Arc::new(ConfigWriter::new(config.nginx.config_dir.clone()));
//! let rules = RuleManager::new(writer, coordinator, process, config.rules.max_rules);
//! # }
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration management
//! - [`error`]: Error types and handling
//! - [`rules`]: Rule model, validation and lifecycle
//! - [`nginx`]: Configuration compilation, file writing, daemon control
//! - [`certs`]: Certificate material on disk
//! - [`telemetry`]: Bounded traffic/error telemetry
//! - [`api`]: HTTP API

pub mod api;
pub mod certs;
pub mod config;
pub mod error;
pub mod nginx;
pub mod rules;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{ProxymanError, Result};
