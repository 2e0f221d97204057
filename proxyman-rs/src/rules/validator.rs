//! Pure rule validation. No side effects; callers reject a rule before
//! touching the store or the filesystem.

use crate::error::{ProxymanError, Result};
use crate::rules::types::{HealthCheck, LoadBalancing, ProxyRule};

/// Validate a fully merged rule. Runs on create and on the merged
/// result of an update.
pub fn validate_rule(rule: &ProxyRule) -> Result<()> {
    if let Some(domain) = &rule.domain {
        validate_domain(domain)?;
    }

    validate_source_path(&rule.source_path)?;
    validate_port(rule.target_port)?;

    if rule.target_container.trim().is_empty() {
        return Err(ProxymanError::Validation(
            "Target container cannot be empty".to_string(),
        ));
    }

    if rule.ssl_enabled {
        if rule.lets_encrypt_enabled {
            // Certificate material is issued by the ACME flow
        } else if rule.ssl_cert_path.is_none() || rule.ssl_key_path.is_none() {
            return Err(ProxymanError::Validation(
                "SSL is enabled but certificate or key path is missing".to_string(),
            ));
        }
    }

    if let Some(health_check) = &rule.health_check {
        validate_health_check(health_check)?;
    }

    if let Some(load_balancing) = &rule.load_balancing {
        validate_load_balancing(load_balancing)?;
    }

    Ok(())
}

/// Syntactic domain check: dot-separated alphanumeric labels with
/// hyphens allowed inside a label.
pub fn validate_domain(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(ProxymanError::Validation("Domain is empty".to_string()));
    }

    if domain.len() > 253 {
        return Err(ProxymanError::Validation(format!(
            "Domain '{}' exceeds 253 characters",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ProxymanError::Validation(format!(
            "Domain '{}' must contain a dot",
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(ProxymanError::Validation(format!(
                "Domain '{}' has an empty label",
                domain
            )));
        }
        if label.len() > 63 {
            return Err(ProxymanError::Validation(format!(
                "Domain label '{}' exceeds 63 characters",
                label
            )));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(ProxymanError::Validation(format!(
                "Domain label '{}' cannot start or end with a hyphen",
                label
            )));
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ProxymanError::Validation(format!(
                "Domain '{}' contains invalid characters",
                domain
            )));
        }
    }

    Ok(())
}

pub fn validate_source_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ProxymanError::Validation(
            "Source path is empty".to_string(),
        ));
    }

    if !path.starts_with('/') {
        return Err(ProxymanError::Validation(format!(
            "Source path '{}' must start with /",
            path
        )));
    }

    if path.chars().any(char::is_whitespace) {
        return Err(ProxymanError::Validation(format!(
            "Source path '{}' contains whitespace",
            path
        )));
    }

    Ok(())
}

pub fn validate_port(port: u16) -> Result<()> {
    if port == 0 {
        return Err(ProxymanError::Validation(
            "Target port must be between 1 and 65535".to_string(),
        ));
    }
    Ok(())
}

fn validate_health_check(health_check: &HealthCheck) -> Result<()> {
    if !health_check.path.starts_with('/') {
        return Err(ProxymanError::Validation(format!(
            "Health check path '{}' must start with /",
            health_check.path
        )));
    }
    if health_check.interval_secs == 0 {
        return Err(ProxymanError::Validation(
            "Health check interval must be positive".to_string(),
        ));
    }
    if health_check.timeout_secs == 0 {
        return Err(ProxymanError::Validation(
            "Health check timeout must be positive".to_string(),
        ));
    }
    if health_check.timeout_secs >= health_check.interval_secs {
        return Err(ProxymanError::Validation(
            "Health check timeout must be shorter than the interval".to_string(),
        ));
    }
    if health_check.success_codes.is_empty() {
        return Err(ProxymanError::Validation(
            "Health check needs at least one success code".to_string(),
        ));
    }
    Ok(())
}

fn validate_load_balancing(load_balancing: &LoadBalancing) -> Result<()> {
    if load_balancing.targets.is_empty() {
        return Err(ProxymanError::Validation(
            "Load balancing needs at least one target".to_string(),
        ));
    }
    for target in &load_balancing.targets {
        if target.container.trim().is_empty() {
            return Err(ProxymanError::Validation(
                "Load balancing target container cannot be empty".to_string(),
            ));
        }
        validate_port(target.port)?;
        if target.weight == 0 {
            return Err(ProxymanError::Validation(
                "Load balancing target weight must be positive".to_string(),
            ));
        }
    }
    if load_balancing.sticky && load_balancing.cookie_name.is_none() {
        return Err(ProxymanError::Validation(
            "Sticky sessions require a cookie name".to_string(),
        ));
    }
    Ok(())
}

/// Enforce the configured ceiling on stored rules.
pub fn validate_rule_count(current: usize, max_rules: usize) -> Result<()> {
    if current >= max_rules {
        return Err(ProxymanError::Validation(format!(
            "Rule limit reached ({} rules maximum)",
            max_rules
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::types::{BalancingMethod, Protocol, UpstreamTarget};
    use chrono::Utc;
    use indexmap::IndexMap;

    fn base_rule() -> ProxyRule {
        ProxyRule {
            id: "r1".to_string(),
            domain: Some("example.com".to_string()),
            source_path: "/".to_string(),
            protocol: Protocol::Http,
            target_container: "api-service".to_string(),
            target_port: 8080,
            ssl_enabled: false,
            ssl_cert_path: None,
            ssl_key_path: None,
            lets_encrypt_enabled: false,
            request_headers: IndexMap::new(),
            response_headers: IndexMap::new(),
            health_check: None,
            load_balancing: None,
            advanced: None,
            custom_config: None,
            enabled: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_valid_domains() {
        assert!(validate_domain("example.com").is_ok());
        assert!(validate_domain("sub.example.co.uk").is_ok());
        assert!(validate_domain("my-app.internal.lan").is_ok());
    }

    #[test]
    fn test_invalid_domains() {
        assert!(validate_domain("").is_err());
        assert!(validate_domain("nodot").is_err());
        assert!(validate_domain("invalid domain").is_err());
        assert!(validate_domain("double..dot.com").is_err());
        assert!(validate_domain("-leading.example.com").is_err());
        assert!(validate_domain("trailing-.example.com").is_err());
        assert!(validate_domain("bad_char.example.com").is_err());
    }

    #[test]
    fn test_source_path() {
        assert!(validate_source_path("/").is_ok());
        assert!(validate_source_path("/api/v1").is_ok());
        assert!(validate_source_path("").is_err());
        assert!(validate_source_path("api").is_err());
        assert!(validate_source_path("/has space").is_err());
    }

    #[test]
    fn test_port_range() {
        assert!(validate_port(1).is_ok());
        assert!(validate_port(65535).is_ok());
        assert!(validate_port(0).is_err());
    }

    #[test]
    fn test_ssl_requires_cert_paths() {
        let mut rule = base_rule();
        rule.ssl_enabled = true;
        assert!(validate_rule(&rule).is_err());

        rule.ssl_cert_path = Some("/certs/c.crt".to_string());
        assert!(validate_rule(&rule).is_err());

        rule.ssl_key_path = Some("/certs/k.key".to_string());
        assert!(validate_rule(&rule).is_ok());
    }

    #[test]
    fn test_ssl_with_lets_encrypt_needs_no_paths() {
        let mut rule = base_rule();
        rule.ssl_enabled = true;
        rule.lets_encrypt_enabled = true;
        assert!(validate_rule(&rule).is_ok());
    }

    #[test]
    fn test_health_check_sanity() {
        let mut rule = base_rule();
        rule.health_check = Some(HealthCheck {
            path: "/healthz".to_string(),
            interval_secs: 10,
            timeout_secs: 2,
            retries: 3,
            success_codes: vec![200],
        });
        assert!(validate_rule(&rule).is_ok());

        rule.health_check = Some(HealthCheck {
            path: "healthz".to_string(),
            interval_secs: 10,
            timeout_secs: 2,
            retries: 3,
            success_codes: vec![200],
        });
        assert!(validate_rule(&rule).is_err());

        rule.health_check = Some(HealthCheck {
            path: "/healthz".to_string(),
            interval_secs: 2,
            timeout_secs: 10,
            retries: 3,
            success_codes: vec![200],
        });
        assert!(validate_rule(&rule).is_err());
    }

    #[test]
    fn test_load_balancing_sanity() {
        let mut rule = base_rule();
        rule.load_balancing = Some(LoadBalancing {
            method: BalancingMethod::RoundRobin,
            sticky: false,
            cookie_name: None,
            cookie_expiry_secs: None,
            targets: vec![UpstreamTarget {
                container: "api-1".to_string(),
                port: 8080,
                weight: 1,
            }],
        });
        assert!(validate_rule(&rule).is_ok());

        rule.load_balancing = Some(LoadBalancing {
            method: BalancingMethod::RoundRobin,
            sticky: true,
            cookie_name: None,
            cookie_expiry_secs: None,
            targets: vec![UpstreamTarget {
                container: "api-1".to_string(),
                port: 8080,
                weight: 1,
            }],
        });
        assert!(validate_rule(&rule).is_err());

        rule.load_balancing = Some(LoadBalancing {
            method: BalancingMethod::LeastConn,
            sticky: false,
            cookie_name: None,
            cookie_expiry_secs: None,
            targets: vec![],
        });
        assert!(validate_rule(&rule).is_err());
    }

    #[test]
    fn test_rule_count_ceiling() {
        assert!(validate_rule_count(99, 100).is_ok());
        assert!(validate_rule_count(100, 100).is_err());
    }
}
