//! Deterministic compilation of a proxy rule into nginx configuration
//! text. Pure string assembly: identical input yields byte-identical
//! output, so writes are idempotent and tests can compare verbatim.
//!
//! Section order is fixed regardless of which optional parts a rule
//! carries: listen/server_name, ACME challenge, TLS, primary location
//! with forwarding headers, custom request/response headers, health
//! check, advanced directives, then verbatim custom config.

use crate::error::{ProxymanError, Result};
use crate::rules::types::{
    AdvancedOptions, BalancingMethod, IpAction, LoadBalancing, Protocol, ProxyRule, WafMode,
};

/// Compile a domain-scoped rule into daemon configuration text.
///
/// The rule must carry a domain; callers writing domain configuration
/// are expected to guard this, and the compiler refuses otherwise.
pub fn compile(rule: &ProxyRule) -> Result<String> {
    let domain = rule
        .domain
        .as_deref()
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ProxymanError::MissingDomain(rule.id.clone()))?;

    if rule.protocol.is_stream() {
        Ok(compile_stream(rule))
    } else {
        Ok(compile_http(rule, domain))
    }
}

fn protocol_label(protocol: Protocol) -> &'static str {
    match protocol {
        Protocol::Http => "http",
        Protocol::Https => "https",
        Protocol::Tcp => "tcp",
        Protocol::Udp => "udp",
    }
}

/// Upstream group name derived from the rule id. Non-alphanumeric
/// characters become underscores so the name is always a valid token.
fn upstream_name(rule: &ProxyRule) -> String {
    let sanitized: String = rule
        .id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("upstream_{}", sanitized)
}

fn file_header(rule: &ProxyRule) -> String {
    format!(
        "# Managed by proxyman - rule {} ({}). Do not edit by hand.\n",
        rule.id,
        protocol_label(rule.protocol)
    )
}

/// TCP/UDP rules compile to a transport-level stanza: listener and
/// target only. HTTP concerns (headers, TLS sections) do not apply.
fn compile_stream(rule: &ProxyRule) -> String {
    let mut out = file_header(rule);

    if !rule.enabled {
        out.push_str("# rule disabled\n");
        return out;
    }

    let target = if let Some(lb) = balanced(rule) {
        let name = upstream_name(rule);
        out.push_str(&render_upstream(&name, lb));
        name
    } else {
        format!("{}:{}", rule.target_container, rule.target_port)
    };

    out.push_str("server {\n");
    match rule.protocol {
        Protocol::Udp => out.push_str(&format!("    listen {} udp;\n", rule.target_port)),
        _ => out.push_str(&format!("    listen {};\n", rule.target_port)),
    }
    out.push_str(&format!("    proxy_pass {};\n", target));
    out.push_str("}\n");
    out
}

fn balanced(rule: &ProxyRule) -> Option<&LoadBalancing> {
    rule.load_balancing
        .as_ref()
        .filter(|lb| !lb.targets.is_empty())
}

fn render_upstream(name: &str, lb: &LoadBalancing) -> String {
    let mut out = format!("upstream {} {{\n", name);
    match lb.method {
        BalancingMethod::RoundRobin => {}
        BalancingMethod::LeastConn => out.push_str("    least_conn;\n"),
        BalancingMethod::IpHash => out.push_str("    ip_hash;\n"),
    }
    if lb.sticky {
        if let Some(cookie) = &lb.cookie_name {
            out.push_str(&format!("    hash $cookie_{} consistent;\n", cookie));
        }
    }
    for target in &lb.targets {
        out.push_str(&format!(
            "    server {}:{} weight={};\n",
            target.container, target.port, target.weight
        ));
    }
    out.push_str("}\n");
    out
}

fn compile_http(rule: &ProxyRule, domain: &str) -> String {
    let mut out = file_header(rule);

    let target = if let Some(lb) = balanced(rule) {
        let name = upstream_name(rule);
        out.push_str(&render_upstream(&name, lb));
        name
    } else {
        format!("{}:{}", rule.target_container, rule.target_port)
    };

    // limit_req zones live at http scope, so they sit above the server
    // block in the generated file.
    let rate_limit = rule
        .advanced
        .as_ref()
        .and_then(|advanced| advanced.rate_limit.as_ref());
    if rule.enabled {
        if let Some(limit) = rate_limit {
            out.push_str(&format!(
                "limit_req_zone $binary_remote_addr zone={}:10m rate={}r/s;\n",
                zone_name(rule),
                limit.requests_per_second
            ));
        }
    }

    out.push_str("server {\n");

    // 1. listen / server_name
    out.push_str("    listen 80;\n");
    if rule.protocol == Protocol::Https {
        out.push_str("    listen 443 ssl;\n");
    }
    out.push_str(&format!("    server_name {};\n", domain));

    // Disabled rules keep the domain claimed but serve nothing.
    if !rule.enabled {
        out.push_str("\n    return 503;\n");
        out.push_str("}\n");
        return out;
    }

    // 2. ACME challenge
    if rule.lets_encrypt_enabled {
        out.push_str("\n    location /.well-known/acme-challenge/ {\n");
        out.push_str("        root /var/www/acme;\n");
        out.push_str("        default_type \"text/plain\";\n");
        out.push_str("    }\n");
    }

    // 3. TLS directives
    if rule.ssl_enabled {
        if let (Some(cert), Some(key)) = (&rule.ssl_cert_path, &rule.ssl_key_path) {
            out.push('\n');
            out.push_str(&format!("    ssl_certificate {};\n", cert));
            out.push_str(&format!("    ssl_certificate_key {};\n", key));
            out.push_str("    ssl_session_cache shared:SSL:10m;\n");
            out.push_str("    ssl_session_timeout 10m;\n");
            out.push_str("    ssl_protocols TLSv1.2 TLSv1.3;\n");
            out.push_str(
                "    add_header Strict-Transport-Security \"max-age=31536000\" always;\n",
            );
        }
    }

    // 4. primary location
    out.push_str(&format!("\n    location {} {{\n", rule.source_path));
    out.push_str(&format!("        proxy_pass http://{};\n", target));
    out.push_str("        proxy_set_header Host $host;\n");
    out.push_str("        proxy_set_header X-Real-IP $remote_addr;\n");
    out.push_str("        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;\n");
    out.push_str("        proxy_set_header X-Forwarded-Proto $scheme;\n");

    // 5. custom request then response headers, input order
    for (name, value) in &rule.request_headers {
        out.push_str(&format!(
            "        proxy_set_header {} \"{}\";\n",
            name, value
        ));
    }
    for (name, value) in &rule.response_headers {
        out.push_str(&format!("        add_header {} \"{}\";\n", name, value));
    }

    // 6. health check
    if let Some(hc) = &rule.health_check {
        let codes = hc
            .success_codes
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        out.push_str(&format!(
            "\n        # health check: {} every {}s, timeout {}s, expect {}\n",
            hc.path, hc.interval_secs, hc.timeout_secs, codes
        ));
        out.push_str("        proxy_next_upstream error timeout;\n");
        out.push_str(&format!(
            "        proxy_next_upstream_tries {};\n",
            hc.retries
        ));
    }

    // 7. advanced directives
    if let Some(advanced) = &rule.advanced {
        out.push_str(&render_advanced(rule, advanced));
    }

    out.push_str("    }\n");

    // 8. verbatim custom config
    if let Some(custom) = &rule.custom_config {
        out.push('\n');
        out.push_str(custom);
        if !custom.ends_with('\n') {
            out.push('\n');
        }
    }

    out.push_str("}\n");
    out
}

fn zone_name(rule: &ProxyRule) -> String {
    let sanitized: String = rule
        .id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("zone_{}", sanitized)
}

/// Ordered advanced section: timeouts, buffers, body size, cache, CORS,
/// rate limiting, rewrites, security headers, WAF, IP access rules.
fn render_advanced(rule: &ProxyRule, advanced: &AdvancedOptions) -> String {
    let mut out = String::new();

    if advanced.connect_timeout_secs.is_some()
        || advanced.send_timeout_secs.is_some()
        || advanced.read_timeout_secs.is_some()
    {
        out.push('\n');
        if let Some(secs) = advanced.connect_timeout_secs {
            out.push_str(&format!("        proxy_connect_timeout {}s;\n", secs));
        }
        if let Some(secs) = advanced.send_timeout_secs {
            out.push_str(&format!("        proxy_send_timeout {}s;\n", secs));
        }
        if let Some(secs) = advanced.read_timeout_secs {
            out.push_str(&format!("        proxy_read_timeout {}s;\n", secs));
        }
    }

    if let Some(size) = &advanced.buffer_size {
        out.push_str(&format!("        proxy_buffer_size {};\n", size));
        if let Some(count) = advanced.buffer_count {
            out.push_str(&format!("        proxy_buffers {} {};\n", count, size));
        }
    }

    if let Some(size) = &advanced.max_body_size {
        out.push_str(&format!("        client_max_body_size {};\n", size));
    }

    if advanced.cache_enabled {
        let duration = advanced.cache_duration_secs.unwrap_or(60);
        out.push_str(&format!(
            "        proxy_cache_valid 200 {}s;\n",
            duration
        ));
    }

    if let Some(cors) = &advanced.cors {
        out.push_str(&format!(
            "        add_header Access-Control-Allow-Origin \"{}\" always;\n",
            cors.allowed_origins.join(" ")
        ));
        if !cors.allowed_methods.is_empty() {
            out.push_str(&format!(
                "        add_header Access-Control-Allow-Methods \"{}\" always;\n",
                cors.allowed_methods.join(", ")
            ));
        }
        if !cors.allowed_headers.is_empty() {
            out.push_str(&format!(
                "        add_header Access-Control-Allow-Headers \"{}\" always;\n",
                cors.allowed_headers.join(", ")
            ));
        }
        if cors.allow_credentials {
            out.push_str(
                "        add_header Access-Control-Allow-Credentials \"true\" always;\n",
            );
        }
    }

    if let Some(limit) = &advanced.rate_limit {
        out.push_str(&format!(
            "        limit_req zone={} burst={} nodelay;\n",
            zone_name(rule),
            limit.burst
        ));
    }

    for rewrite in &advanced.rewrites {
        match &rewrite.flag {
            Some(flag) => out.push_str(&format!(
                "        rewrite {} {} {};\n",
                rewrite.pattern, rewrite.replacement, flag
            )),
            None => out.push_str(&format!(
                "        rewrite {} {};\n",
                rewrite.pattern, rewrite.replacement
            )),
        }
    }

    if advanced.security_headers {
        out.push_str("        add_header X-Frame-Options \"SAMEORIGIN\" always;\n");
        out.push_str("        add_header X-Content-Type-Options \"nosniff\" always;\n");
        out.push_str("        add_header X-XSS-Protection \"1; mode=block\" always;\n");
        out.push_str(
            "        add_header Referrer-Policy \"strict-origin-when-cross-origin\" always;\n",
        );
    }

    if let Some(waf) = &advanced.waf {
        match waf.mode {
            WafMode::Off => {}
            WafMode::Detect => {
                out.push_str("        modsecurity on;\n");
                out.push_str(
                    "        modsecurity_rules \"SecRuleEngine DetectionOnly\";\n",
                );
                for ruleset in &waf.rulesets {
                    out.push_str(&format!(
                        "        modsecurity_rules_file {};\n",
                        ruleset
                    ));
                }
            }
            WafMode::Block => {
                out.push_str("        modsecurity on;\n");
                for ruleset in &waf.rulesets {
                    out.push_str(&format!(
                        "        modsecurity_rules_file {};\n",
                        ruleset
                    ));
                }
            }
        }
    }

    for ip_rule in &advanced.ip_rules {
        match ip_rule.action {
            IpAction::Allow => out.push_str(&format!("        allow {};\n", ip_rule.source)),
            IpAction::Deny => out.push_str(&format!("        deny {};\n", ip_rule.source)),
        }
    }

    out
}
