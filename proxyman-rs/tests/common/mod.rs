//! Shared helpers: a scripted command runner standing in for the nginx
//! binary, and wiring for a full manager stack over temp directories.

use async_trait::async_trait;
use proxyman_rs::error::Result;
use proxyman_rs::nginx::process::{CommandOutput, CommandRunner, NginxProcess};
use proxyman_rs::nginx::{ConfigWriter, ReloadCoordinator};
use proxyman_rs::rules::RuleManager;
use proxyman_rs::rules::types::{CreateRuleRequest, Protocol};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Pops pre-seeded outputs in order; defaults to success once the
/// script runs out. Records every invocation.
pub struct FakeRunner {
    outputs: Mutex<Vec<CommandOutput>>,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl FakeRunner {
    pub fn new(outputs: Vec<CommandOutput>) -> Self {
        Self {
            outputs: Mutex::new(outputs),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn ok() -> CommandOutput {
        CommandOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn fail(stderr: &str) -> CommandOutput {
        CommandOutput {
            exit_code: 1,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    /// Queue an output for the next invocation.
    pub async fn seed(&self, output: CommandOutput) {
        self.outputs.lock().await.push(output);
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().map(|a| a.to_string()));
        self.calls.lock().await.push(call);

        let mut outputs = self.outputs.lock().await;
        if outputs.is_empty() {
            Ok(FakeRunner::ok())
        } else {
            Ok(outputs.remove(0))
        }
    }
}

pub struct TestStack {
    pub manager: Arc<RuleManager>,
    pub runner: Arc<FakeRunner>,
    pub process: Arc<NginxProcess>,
}

pub fn stack(config_dir: &Path, outputs: Vec<CommandOutput>) -> TestStack {
    let runner = Arc::new(FakeRunner::new(outputs));
    let process = Arc::new(NginxProcess::new(runner.clone(), "nginx"));
    let coordinator = Arc::new(ReloadCoordinator::new(
        process.clone(),
        Duration::from_secs(5),
    ));
    let writer = Arc::new(ConfigWriter::new(config_dir));
    let manager = Arc::new(RuleManager::new(
        writer,
        coordinator,
        process.clone(),
        100,
    ));
    TestStack {
        manager,
        runner,
        process,
    }
}

pub fn http_rule(domain: &str) -> CreateRuleRequest {
    CreateRuleRequest {
        domain: Some(domain.to_string()),
        source_path: "/api".to_string(),
        protocol: Protocol::Http,
        target_container: "api-service".to_string(),
        target_port: 8080,
        ssl_enabled: false,
        ssl_cert_path: None,
        ssl_key_path: None,
        lets_encrypt_enabled: false,
        request_headers: Default::default(),
        response_headers: Default::default(),
        health_check: None,
        load_balancing: None,
        advanced: None,
        custom_config: None,
        enabled: true,
    }
}
