//! Rule store and lifecycle orchestration: validate, compile, write,
//! test-then-reload, commit. The manager owns the in-memory rule map;
//! all mutations go through it.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ProxymanError, Result};
use crate::nginx::compiler;
use crate::nginx::process::NginxProcess;
use crate::nginx::reload::ReloadCoordinator;
use crate::nginx::writer::ConfigWriter;
use crate::rules::types::{CreateRuleRequest, ProxyRule, UpdateRuleRequest};
use crate::rules::validator;

/// Outcome of a dry-run configuration test. Invalid configuration is a
/// normal outcome here, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct TestOutcome {
    pub success: bool,
    pub message: String,
}

pub struct RuleManager {
    rules: Arc<RwLock<HashMap<String, ProxyRule>>>,
    writer: Arc<ConfigWriter>,
    coordinator: Arc<ReloadCoordinator>,
    process: Arc<NginxProcess>,
    max_rules: usize,
}

impl RuleManager {
    pub fn new(
        writer: Arc<ConfigWriter>,
        coordinator: Arc<ReloadCoordinator>,
        process: Arc<NginxProcess>,
        max_rules: usize,
    ) -> Self {
        Self {
            rules: Arc::new(RwLock::new(HashMap::new())),
            writer,
            coordinator,
            process,
            max_rules,
        }
    }

    /// Create a rule. Validation failures happen before any side
    /// effect. If the daemon rejects or fails to pick up the new
    /// configuration the rule stays stored and the error is returned;
    /// the on-disk file is rolled back on a failed configuration test.
    pub async fn create(&self, request: CreateRuleRequest) -> Result<ProxyRule> {
        let now = Utc::now();
        let rule = ProxyRule {
            id: Uuid::new_v4().to_string(),
            domain: request.domain,
            source_path: request.source_path,
            protocol: request.protocol,
            target_container: request.target_container,
            target_port: request.target_port,
            ssl_enabled: request.ssl_enabled,
            ssl_cert_path: request.ssl_cert_path,
            ssl_key_path: request.ssl_key_path,
            lets_encrypt_enabled: request.lets_encrypt_enabled,
            request_headers: request.request_headers,
            response_headers: request.response_headers,
            health_check: request.health_check,
            load_balancing: request.load_balancing,
            advanced: request.advanced,
            custom_config: request.custom_config,
            enabled: request.enabled,
            created_at: now,
            updated_at: now,
        };

        validator::validate_rule(&rule)?;

        {
            let mut rules = self.rules.write().await;
            validator::validate_rule_count(rules.len(), self.max_rules)?;
            rules.insert(rule.id.clone(), rule.clone());
        }
        info!(rule_id = %rule.id, domain = ?rule.domain, "rule created");

        self.write_and_reload(&rule).await?;
        Ok(rule)
    }

    /// Apply a partial update. When the domain changes, the prior
    /// domain's file is deleted before the new one is written so the
    /// two are never on disk together.
    pub async fn update(&self, id: &str, request: UpdateRuleRequest) -> Result<ProxyRule> {
        let prior = self.get(id).await?;

        let mut merged = prior.clone();
        merged.apply_update(request);
        merged.updated_at = Utc::now();
        validator::validate_rule(&merged)?;

        {
            let mut rules = self.rules.write().await;
            rules.insert(id.to_string(), merged.clone());
        }
        info!(rule_id = %id, "rule updated");

        let domain_changed = prior.domain != merged.domain;
        if domain_changed {
            if let Some(old_domain) = &prior.domain {
                self.writer.remove(id, old_domain).await?;
            }
        }

        if merged.domain.is_some() {
            self.write_and_reload(&merged).await?;
        } else if domain_changed {
            // Domain removed: the file is gone, the daemon still needs
            // to drop the route.
            self.coordinator.request_reload().await?;
        }

        Ok(merged)
    }

    /// Remove a rule and its configuration file. Telemetry buffers for
    /// the id are intentionally left alone.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let removed = {
            let mut rules = self.rules.write().await;
            rules
                .remove(id)
                .ok_or_else(|| ProxymanError::NotFound(format!("rule '{}'", id)))?
        };
        info!(rule_id = %id, "rule deleted");

        if let Some(domain) = &removed.domain {
            self.writer.remove(id, domain).await?;
            self.coordinator.request_reload().await?;
        }

        Ok(())
    }

    /// Flip a rule's enabled flag. A disabled rule keeps its file; the
    /// compiled output stops routing instead.
    pub async fn toggle(&self, id: &str) -> Result<ProxyRule> {
        let toggled = {
            let mut rules = self.rules.write().await;
            let rule = rules
                .get_mut(id)
                .ok_or_else(|| ProxymanError::NotFound(format!("rule '{}'", id)))?;
            rule.enabled = !rule.enabled;
            rule.updated_at = Utc::now();
            rule.clone()
        };
        info!(rule_id = %id, enabled = toggled.enabled, "rule toggled");

        self.write_and_reload(&toggled).await?;
        Ok(toggled)
    }

    /// Dry-run a candidate rule: compile it and ask the daemon to
    /// validate, persisting nothing. Only transport failures are
    /// errors.
    pub async fn test(&self, request: CreateRuleRequest) -> Result<TestOutcome> {
        let now = Utc::now();
        let candidate = ProxyRule {
            id: format!("test-{}", Uuid::new_v4()),
            domain: request.domain,
            source_path: request.source_path,
            protocol: request.protocol,
            target_container: request.target_container,
            target_port: request.target_port,
            ssl_enabled: request.ssl_enabled,
            ssl_cert_path: request.ssl_cert_path,
            ssl_key_path: request.ssl_key_path,
            lets_encrypt_enabled: request.lets_encrypt_enabled,
            request_headers: request.request_headers,
            response_headers: request.response_headers,
            health_check: request.health_check,
            load_balancing: request.load_balancing,
            advanced: request.advanced,
            custom_config: request.custom_config,
            enabled: request.enabled,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = validator::validate_rule(&candidate) {
            return Ok(TestOutcome {
                success: false,
                message: e.to_string(),
            });
        }
        if let Err(e) = compiler::compile(&candidate) {
            return Ok(TestOutcome {
                success: false,
                message: e.to_string(),
            });
        }

        let result = self.process.test_configuration().await?;
        Ok(TestOutcome {
            success: result.valid,
            message: result.message,
        })
    }

    pub async fn get(&self, id: &str) -> Result<ProxyRule> {
        let rules = self.rules.read().await;
        rules
            .get(id)
            .cloned()
            .ok_or_else(|| ProxymanError::NotFound(format!("rule '{}'", id)))
    }

    /// All rules, oldest first.
    pub async fn list(&self) -> Vec<ProxyRule> {
        let rules = self.rules.read().await;
        let mut list: Vec<ProxyRule> = rules.values().cloned().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        list
    }

    pub async fn count(&self) -> usize {
        self.rules.read().await.len()
    }

    /// Compile and write the rule's domain configuration, then ask the
    /// daemon to pick it up. On a failed configuration test the file is
    /// restored to its previous state; the daemon keeps running the
    /// configuration it last accepted.
    async fn write_and_reload(&self, rule: &ProxyRule) -> Result<()> {
        let domain = match &rule.domain {
            Some(domain) => domain,
            None => return Ok(()),
        };

        let content = compiler::compile(rule)?;
        let snapshot = self.writer.write(&rule.id, domain, &content).await?;

        match self.coordinator.request_reload().await {
            Ok(()) => Ok(()),
            Err(e @ ProxymanError::ConfigTestFailed(_)) => {
                warn!(rule_id = %rule.id, "configuration test failed, rolling back file");
                if let Err(restore_err) = self.writer.restore(snapshot).await {
                    warn!(rule_id = %rule.id, "rollback failed: {}", restore_err);
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nginx::process::testing::ScriptedRunner;
    use crate::nginx::process::CommandOutput;
    use crate::rules::types::Protocol;
    use std::time::Duration;
    use tempfile::TempDir;

    fn manager_with(outputs: Vec<CommandOutput>) -> (RuleManager, Arc<ScriptedRunner>, TempDir) {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(ScriptedRunner::new(outputs));
        let process = Arc::new(NginxProcess::new(runner.clone(), "nginx"));
        let coordinator = Arc::new(ReloadCoordinator::new(
            process.clone(),
            Duration::from_secs(5),
        ));
        let writer = Arc::new(ConfigWriter::new(dir.path()));
        let manager = RuleManager::new(writer, coordinator, process, 100);
        (manager, runner, dir)
    }

    fn request(domain: Option<&str>) -> CreateRuleRequest {
        CreateRuleRequest {
            domain: domain.map(|d| d.to_string()),
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

    #[tokio::test]
    async fn test_create_writes_file_and_reloads() {
        let (manager, runner, dir) = manager_with(vec![]);

        let rule = manager.create(request(Some("example.com"))).await.unwrap();

        let path = dir
            .path()
            .join(format!("{}-example_com.conf", rule.id));
        assert!(path.exists());

        let calls = runner.calls.lock().await;
        assert_eq!(calls.len(), 2); // test + reload
    }

    #[tokio::test]
    async fn test_create_without_domain_touches_nothing() {
        let (manager, runner, dir) = manager_with(vec![]);

        manager.create(request(None)).await.unwrap();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(runner.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_invalid_domain_has_no_side_effects() {
        let (manager, runner, dir) = manager_with(vec![]);

        let result = manager.create(request(Some("invalid domain"))).await;
        assert!(matches!(result, Err(ProxymanError::Validation(_))));

        assert_eq!(manager.count().await, 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(runner.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_rolls_back_file_on_failed_config_test() {
        let (manager, runner, dir) = manager_with(vec![ScriptedRunner::fail(
            "nginx: [emerg] invalid directive",
        )]);

        let result = manager.create(request(Some("example.com"))).await;
        assert!(matches!(result, Err(ProxymanError::ConfigTestFailed(_))));

        // File rolled back to its pre-write state (absent), rule kept.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(manager.count().await, 1);
        assert_eq!(runner.calls.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_rule_ceiling() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(ScriptedRunner::new(vec![]));
        let process = Arc::new(NginxProcess::new(runner.clone(), "nginx"));
        let coordinator = Arc::new(ReloadCoordinator::new(
            process.clone(),
            Duration::from_secs(5),
        ));
        let writer = Arc::new(ConfigWriter::new(dir.path()));
        let manager = RuleManager::new(writer, coordinator, process, 1);

        manager.create(request(None)).await.unwrap();
        let result = manager.create(request(None)).await;
        assert!(matches!(result, Err(ProxymanError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_domain_change_swaps_files() {
        let (manager, _runner, dir) = manager_with(vec![]);

        let rule = manager.create(request(Some("a.com"))).await.unwrap();
        let old_path = dir.path().join(format!("{}-a_com.conf", rule.id));
        assert!(old_path.exists());

        manager
            .update(
                &rule.id,
                UpdateRuleRequest {
                    domain: Some(Some("b.com".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let new_path = dir.path().join(format!("{}-b_com.conf", rule.id));
        assert!(!old_path.exists());
        assert!(new_path.exists());
    }

    #[tokio::test]
    async fn test_update_clearing_domain_removes_file() {
        let (manager, _runner, dir) = manager_with(vec![]);

        let rule = manager.create(request(Some("a.com"))).await.unwrap();
        manager
            .update(
                &rule.id,
                UpdateRuleRequest {
                    domain: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(manager.get(&rule.id).await.unwrap().domain.is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_rule() {
        let (manager, _runner, _dir) = manager_with(vec![]);
        let result = manager.update("nope", UpdateRuleRequest::default()).await;
        assert!(matches!(result, Err(ProxymanError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_removes_rule_and_file() {
        let (manager, _runner, dir) = manager_with(vec![]);

        let rule = manager.create(request(Some("a.com"))).await.unwrap();
        manager.delete(&rule.id).await.unwrap();

        assert_eq!(manager.count().await, 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        let result = manager.delete(&rule.id).await;
        assert!(matches!(result, Err(ProxymanError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_toggle_involution() {
        let (manager, _runner, _dir) = manager_with(vec![]);

        let rule = manager.create(request(Some("a.com"))).await.unwrap();
        assert!(rule.enabled);

        let once = manager.toggle(&rule.id).await.unwrap();
        assert!(!once.enabled);
        let twice = manager.toggle(&rule.id).await.unwrap();
        assert!(twice.enabled);
    }

    #[tokio::test]
    async fn test_toggle_rewrites_file() {
        let (manager, _runner, dir) = manager_with(vec![]);

        let rule = manager.create(request(Some("a.com"))).await.unwrap();
        let path = dir.path().join(format!("{}-a_com.conf", rule.id));

        let enabled_content = std::fs::read_to_string(&path).unwrap();
        assert!(enabled_content.contains("proxy_pass"));

        manager.toggle(&rule.id).await.unwrap();
        let disabled_content = std::fs::read_to_string(&path).unwrap();
        assert!(disabled_content.contains("return 503;"));
    }

    #[tokio::test]
    async fn test_dry_run_does_not_persist() {
        let (manager, runner, dir) = manager_with(vec![CommandOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: "syntax is ok".to_string(),
        }]);

        let outcome = manager.test(request(Some("a.com"))).await.unwrap();
        assert!(outcome.success);

        assert_eq!(manager.count().await, 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(runner.calls.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_validation_failure_is_not_an_error() {
        let (manager, runner, _dir) = manager_with(vec![]);

        let outcome = manager.test(request(Some("bad domain"))).await.unwrap();
        assert!(!outcome.success);
        assert!(runner.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_is_ordered() {
        let (manager, _runner, _dir) = manager_with(vec![]);

        let a = manager.create(request(None)).await.unwrap();
        let b = manager.create(request(None)).await.unwrap();

        let listed = manager.list().await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, a.id);
        assert_eq!(listed[1].id, b.id);
    }
}
