//! Proxy rule data model: the stored rule entity plus the request
//! payloads used to create and update rules.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Transport protocol a rule routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
    Tcp,
    Udp,
}

impl Protocol {
    /// TCP and UDP rules compile to a stream listener instead of an
    /// HTTP server block.
    pub fn is_stream(&self) -> bool {
        matches!(self, Protocol::Tcp | Protocol::Udp)
    }
}

/// Active health probing for a rule's upstream.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HealthCheck {
    /// Path probed on the upstream, e.g. `/healthz`
    pub path: String,
    pub interval_secs: u64,
    pub timeout_secs: u64,
    /// Consecutive failures before the upstream is marked down
    pub retries: u32,
    /// HTTP status codes treated as healthy
    pub success_codes: Vec<u16>,
}

/// Upstream selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancingMethod {
    RoundRobin,
    LeastConn,
    IpHash,
}

/// One backend in a load-balanced upstream group.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UpstreamTarget {
    pub container: String,
    pub port: u16,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

/// Load balancing across multiple backend targets.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoadBalancing {
    pub method: BalancingMethod,
    /// Pin clients to one backend via a cookie
    #[serde(default)]
    pub sticky: bool,
    pub cookie_name: Option<String>,
    pub cookie_expiry_secs: Option<u64>,
    /// Ordered backend list; order is preserved in the compiled upstream
    pub targets: Vec<UpstreamTarget>,
}

/// Cross-origin settings emitted into the compiled location block.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CorsSettings {
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub allowed_methods: Vec<String>,
    #[serde(default)]
    pub allowed_headers: Vec<String>,
    #[serde(default)]
    pub allow_credentials: bool,
}

/// Request rate ceiling for a rule.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RateLimitSettings {
    pub requests_per_second: u32,
    pub burst: u32,
}

/// A single rewrite directive, applied in input order.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RewriteRule {
    pub pattern: String,
    pub replacement: String,
    /// Rewrite flag such as `last`, `break`, `redirect`, `permanent`
    pub flag: Option<String>,
}

/// Web-application-firewall engagement level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WafMode {
    Off,
    Detect,
    Block,
}

/// WAF directives referencing externally managed rulesets.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WafSettings {
    pub mode: WafMode,
    #[serde(default)]
    pub rulesets: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IpAction {
    Allow,
    Deny,
}

/// One allow/deny entry, applied in input order.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IpAccessRule {
    pub action: IpAction,
    /// Address or CIDR block, e.g. `10.0.0.0/8`
    pub source: String,
}

/// Tuning knobs beyond the basic proxy pass. Absent means the compiled
/// output carries no advanced section at all.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AdvancedOptions {
    pub connect_timeout_secs: Option<u64>,
    pub send_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    /// Per-buffer size, e.g. `8k`
    pub buffer_size: Option<String>,
    pub buffer_count: Option<u32>,
    /// Client body size limit, e.g. `50m`
    pub max_body_size: Option<String>,
    #[serde(default)]
    pub cache_enabled: bool,
    pub cache_duration_secs: Option<u64>,
    pub cors: Option<CorsSettings>,
    pub rate_limit: Option<RateLimitSettings>,
    #[serde(default)]
    pub rewrites: Vec<RewriteRule>,
    #[serde(default)]
    pub security_headers: bool,
    pub waf: Option<WafSettings>,
    #[serde(default)]
    pub ip_rules: Vec<IpAccessRule>,
}

impl AdvancedOptions {
    /// True when no field would emit any compiled directive.
    pub fn is_empty(&self) -> bool {
        self == &AdvancedOptions::default()
    }
}

/// A routing rule mapping an external domain/path to a container target.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyRule {
    /// Unique identifier, assigned at creation
    pub id: String,
    /// Presence triggers a file-backed daemon configuration
    pub domain: Option<String>,
    /// Location path, must start with `/`
    pub source_path: String,
    pub protocol: Protocol,
    /// Logical service name resolved by the container network
    pub target_container: String,
    pub target_port: u16,
    #[serde(default)]
    pub ssl_enabled: bool,
    pub ssl_cert_path: Option<String>,
    pub ssl_key_path: Option<String>,
    #[serde(default)]
    pub lets_encrypt_enabled: bool,
    /// Headers set on the proxied request, in input order
    #[serde(default)]
    pub request_headers: IndexMap<String, String>,
    /// Headers added to the response, in input order
    #[serde(default)]
    pub response_headers: IndexMap<String, String>,
    pub health_check: Option<HealthCheck>,
    pub load_balancing: Option<LoadBalancing>,
    pub advanced: Option<AdvancedOptions>,
    /// Verbatim daemon directives appended after all generated sections
    pub custom_config: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a new rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateRuleRequest {
    pub domain: Option<String>,
    pub source_path: String,
    pub protocol: Protocol,
    pub target_container: String,
    pub target_port: u16,
    #[serde(default)]
    pub ssl_enabled: bool,
    pub ssl_cert_path: Option<String>,
    pub ssl_key_path: Option<String>,
    #[serde(default)]
    pub lets_encrypt_enabled: bool,
    #[serde(default)]
    pub request_headers: IndexMap<String, String>,
    #[serde(default)]
    pub response_headers: IndexMap<String, String>,
    pub health_check: Option<HealthCheck>,
    pub load_balancing: Option<LoadBalancing>,
    pub advanced: Option<AdvancedOptions>,
    pub custom_config: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Wraps the deserialized value in `Some` so an explicit `null` comes
/// through as `Some(None)` rather than collapsing into field-absent.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Partial update for an existing rule. Plain `Option` fields replace
/// the stored value when present; double-`Option` fields distinguish
/// "leave unchanged" (absent) from "clear" (explicit null).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UpdateRuleRequest {
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub domain: Option<Option<String>>,
    pub source_path: Option<String>,
    pub protocol: Option<Protocol>,
    pub target_container: Option<String>,
    pub target_port: Option<u16>,
    pub ssl_enabled: Option<bool>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub ssl_cert_path: Option<Option<String>>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub ssl_key_path: Option<Option<String>>,
    pub lets_encrypt_enabled: Option<bool>,
    pub request_headers: Option<IndexMap<String, String>>,
    pub response_headers: Option<IndexMap<String, String>>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub health_check: Option<Option<HealthCheck>>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub load_balancing: Option<Option<LoadBalancing>>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub advanced: Option<Option<AdvancedOptions>>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub custom_config: Option<Option<String>>,
    pub enabled: Option<bool>,
}

impl ProxyRule {
    /// Apply a partial update in place. Timestamps are the caller's
    /// responsibility.
    pub fn apply_update(&mut self, update: UpdateRuleRequest) {
        if let Some(domain) = update.domain {
            self.domain = domain;
        }
        if let Some(source_path) = update.source_path {
            self.source_path = source_path;
        }
        if let Some(protocol) = update.protocol {
            self.protocol = protocol;
        }
        if let Some(target_container) = update.target_container {
            self.target_container = target_container;
        }
        if let Some(target_port) = update.target_port {
            self.target_port = target_port;
        }
        if let Some(ssl_enabled) = update.ssl_enabled {
            self.ssl_enabled = ssl_enabled;
        }
        if let Some(ssl_cert_path) = update.ssl_cert_path {
            self.ssl_cert_path = ssl_cert_path;
        }
        if let Some(ssl_key_path) = update.ssl_key_path {
            self.ssl_key_path = ssl_key_path;
        }
        if let Some(lets_encrypt_enabled) = update.lets_encrypt_enabled {
            self.lets_encrypt_enabled = lets_encrypt_enabled;
        }
        if let Some(request_headers) = update.request_headers {
            self.request_headers = request_headers;
        }
        if let Some(response_headers) = update.response_headers {
            self.response_headers = response_headers;
        }
        if let Some(health_check) = update.health_check {
            self.health_check = health_check;
        }
        if let Some(load_balancing) = update.load_balancing {
            self.load_balancing = load_balancing;
        }
        if let Some(advanced) = update.advanced {
            self.advanced = advanced;
        }
        if let Some(custom_config) = update.custom_config {
            self.custom_config = custom_config;
        }
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn test_apply_update_replaces_present_fields() {
        let mut rule = base_rule();
        rule.apply_update(UpdateRuleRequest {
            target_port: Some(9090),
            enabled: Some(false),
            ..Default::default()
        });
        assert_eq!(rule.target_port, 9090);
        assert!(!rule.enabled);
        assert_eq!(rule.domain.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_apply_update_clears_domain_with_explicit_null() {
        let mut rule = base_rule();
        rule.apply_update(UpdateRuleRequest {
            domain: Some(None),
            ..Default::default()
        });
        assert!(rule.domain.is_none());
    }

    #[test]
    fn test_update_request_absent_domain_leaves_value() {
        let mut rule = base_rule();
        let update: UpdateRuleRequest =
            serde_json::from_str(r#"{"target_port": 3000}"#).unwrap();
        assert!(update.domain.is_none());
        rule.apply_update(update);
        assert_eq!(rule.domain.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_update_request_null_domain_clears_value() {
        let update: UpdateRuleRequest =
            serde_json::from_str(r#"{"domain": null}"#).unwrap();
        assert_eq!(update.domain, Some(None));
    }

    #[test]
    fn test_stream_protocols() {
        assert!(Protocol::Tcp.is_stream());
        assert!(Protocol::Udp.is_stream());
        assert!(!Protocol::Http.is_stream());
        assert!(!Protocol::Https.is_stream());
    }

    #[test]
    fn test_advanced_options_empty_default() {
        assert!(AdvancedOptions::default().is_empty());
        let advanced = AdvancedOptions {
            max_body_size: Some("50m".to_string()),
            ..Default::default()
        };
        assert!(!advanced.is_empty());
    }
}
