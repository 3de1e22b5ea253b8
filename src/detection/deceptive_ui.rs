//! Deceptive-UI detector.
//!
//! Flags clickjacking overlays and credential-capture forms — UI tricks
//! designed to fool a human, but which an agent reading bounding boxes
//! and attributes can catch mechanically.

use std::time::Instant;

use crate::dom::DomTree;
use crate::pipeline::outcome::Severity;

use super::{DetectionResult, ThreatKind};

const OPAQUE_OVERLAY_SCORE: f32 = 45.0;
const INVISIBLE_OVERLAY_SCORE: f32 = 55.0;
const CREDENTIAL_FORM_SCORE: f32 = 60.0;
const SUSPICIOUS_INPUT_SCORE: f32 = 50.0;

const CREDENTIAL_TOKENS: &[&str] = &["capture", "steal", "exfil"];
const SENSITIVE_INPUT_TYPES: &[&str] = &["password", "email", "text"];

fn parse_z_index(style: &str) -> Option<i64> {
    let idx = style.to_lowercase().find("z-index")?;
    let rest = &style[idx..];
    let colon = rest.find(':')?;
    let value_str: String = rest[colon + 1..]
        .chars()
        .skip_while(|c| c.is_whitespace())
        .take_while(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    value_str.parse().ok()
}

fn is_fixed_or_absolute(style: &str) -> bool {
    let lower = style.to_lowercase();
    lower.contains("position:fixed")
        || lower.contains("position: fixed")
        || lower.contains("position:absolute")
        || lower.contains("position: absolute")
}

fn has_opacity_below(style: &str, threshold: f64) -> bool {
    let lower = style.to_lowercase();
    if let Some(idx) = lower.find("opacity") {
        let rest = &lower[idx..];
        if let Some(colon) = rest.find(':') {
            let value: String = rest[colon + 1..]
                .chars()
                .skip_while(|c| c.is_whitespace())
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if let Ok(v) = value.parse::<f64>() {
                return v < threshold;
            }
        }
    }
    false
}

/// Scan a DOM tree for deceptive overlays and credential-capture
/// surfaces. Returns the maximum score across all findings; severity is
/// derived from that score.
#[must_use]
pub fn detect(tree: &DomTree) -> DetectionResult {
    let start = Instant::now();
    let mut max_score = 0.0f32;
    let mut findings = Vec::new();

    tree.walk(|node, _depth| {
        let area = node.bounding_box.as_ref().map_or(0.0, |b| b.area());

        // Opaque overlay: fixed position, large z-index, large area.
        if is_fixed_or_absolute(&node.style) {
            if let Some(z) = parse_z_index(&node.style) {
                if z > 9999 && area > 200.0 * 200.0 {
                    max_score = max_score.max(OPAQUE_OVERLAY_SCORE);
                    findings.push(format!("opaque overlay on <{}>", node.tag));
                }
            }
            // Invisible overlay: near-zero opacity, large area.
            if has_opacity_below(&node.style, 0.1) && area > 100.0 * 100.0 {
                max_score = max_score.max(INVISIBLE_OVERLAY_SCORE);
                findings.push(format!("invisible overlay on <{}>", node.tag));
            }
        }

        if node.tag == "form" {
            if let Some(action) = node.attributes.get("action") {
                let lower = action.to_lowercase();
                if CREDENTIAL_TOKENS.iter().any(|t| lower.contains(t)) {
                    max_score = max_score.max(CREDENTIAL_FORM_SCORE);
                    findings.push(format!("suspicious form action: {action}"));
                }
            }
        }

        if node.tag == "input" {
            let input_type = node
                .attributes
                .get("type")
                .map(|s| s.to_lowercase())
                .unwrap_or_default();
            if SENSITIVE_INPUT_TYPES.contains(&input_type.as_str()) {
                let suspicious = node
                    .attributes
                    .values()
                    .any(|v| CREDENTIAL_TOKENS.iter().any(|t| v.to_lowercase().contains(t)));
                if suspicious {
                    max_score = max_score.max(SUSPICIOUS_INPUT_SCORE);
                    findings.push(format!("suspicious {input_type} input attributes"));
                }
            }
        }
    });

    DetectionResult {
        detected: max_score > 0.0,
        score: max_score,
        severity: Severity::from_score(max_score),
        threat_kind: ThreatKind::DeceptiveUi,
        matches: findings,
        details: std::collections::HashMap::new(),
        latency: start.elapsed(),
    }
    .cap_matches(5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{BoundingBox, DomNode};

    #[test]
    fn clean_tree_not_detected() {
        let tree = DomTree::new(
            vec![DomNode {
                tag: "div".into(),
                ..Default::default()
            }],
            0,
        );
        assert!(!detect(&tree).detected);
    }

    #[test]
    fn opaque_overlay_detected() {
        let node = DomNode {
            tag: "div".into(),
            style: "position:fixed; z-index:99999".into(),
            bounding_box: Some(BoundingBox {
                x: 0.0,
                y: 0.0,
                width: 500.0,
                height: 500.0,
            }),
            ..Default::default()
        };
        let tree = DomTree::new(vec![node], 0);
        let result = detect(&tree);
        assert!(result.detected);
        assert!(result.score >= OPAQUE_OVERLAY_SCORE);
    }

    #[test]
    fn credential_form_detected() {
        let mut attrs = std::collections::HashMap::new();
        attrs.insert("action".to_string(), "https://evil.example/exfil".to_string());
        let node = DomNode {
            tag: "form".into(),
            attributes: attrs,
            ..Default::default()
        };
        let tree = DomTree::new(vec![node], 0);
        assert!(detect(&tree).detected);
    }

    #[test]
    fn suspicious_password_input_detected() {
        let mut attrs = std::collections::HashMap::new();
        attrs.insert("type".to_string(), "password".to_string());
        attrs.insert("data-sync".to_string(), "steal-creds".to_string());
        let node = DomNode {
            tag: "input".into(),
            attributes: attrs,
            ..Default::default()
        };
        let tree = DomTree::new(vec![node], 0);
        assert!(detect(&tree).detected);
    }
}
