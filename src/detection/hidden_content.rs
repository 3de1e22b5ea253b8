//! Hidden-content detector.
//!
//! Walks a [`DomTree`] looking for nodes hidden via CSS tricks that carry
//! meaningful text — a classic vector for smuggling instructions a human
//! would never see but an agent reading the DOM would.

use std::time::Instant;

use crate::dom::DomTree;

use super::{DetectionResult, ThreatKind};

/// Inline-style substrings indicating a node is hidden from view.
const HIDDEN_STYLE_PATTERNS: &[&str] = &[
    "display:none",
    "display: none",
    "visibility:hidden",
    "visibility: hidden",
    "opacity:0",
    "opacity: 0",
    "opacity:0.0",
    "font-size:0",
    "font-size: 0",
    "width:0",
    "height:0",
    "clip:rect(0",
    "text-indent:-",
];

/// Class-name tokens commonly used for visually-hidden-but-DOM-present
/// content.
const HIDDEN_CLASS_TOKENS: &[&str] = &["hidden", "invisible", "sr-only", "visually-hidden", "offscreen"];

/// Minimum text length for a hidden node to be considered a real threat
/// rather than incidental markup (a `display:none` spinner, say).
const MIN_FLAGGED_TEXT_LEN: usize = 10;

/// Far off-screen positioning, another common hiding technique.
fn is_far_offscreen(style: &str) -> bool {
    let positioned = style.contains("position:absolute") || style.contains("position: absolute");
    let far_off = style.contains("left:-9999") || style.contains("left: -9999") || style.contains("top:-9999");
    positioned && far_off
}

fn node_is_hidden(style: &str, classes: &[String]) -> bool {
    let lower = style.to_lowercase();
    HIDDEN_STYLE_PATTERNS.iter().any(|p| lower.contains(p))
        || is_far_offscreen(&lower)
        || classes
            .iter()
            .any(|c| HIDDEN_CLASS_TOKENS.contains(&c.to_lowercase().as_str()))
}

/// Scan a DOM tree (bounded at [`crate::dom::MAX_WALK_DEPTH`]) for
/// hidden nodes carrying suspicious text.
///
/// Flagged text is additionally scanned by the prompt-injection
/// detector and scored up; this function returns the maximum node score
/// observed across the walk, plus a preview of up to five flagged
/// texts.
#[must_use]
pub fn detect(tree: &DomTree, injection: &super::injection::HeuristicDetector) -> DetectionResult {
    let start = Instant::now();
    let mut max_score = 0.0f32;
    let mut previews = Vec::new();

    tree.walk(|node, _depth| {
        if node.text.trim().len() <= MIN_FLAGGED_TEXT_LEN {
            return;
        }
        if !node_is_hidden(&node.style, &node.classes) {
            return;
        }

        let base_score = 40.0;
        let injection_result = injection.detect(&node.text);
        let node_score = (base_score + injection_result.score * 0.6).min(100.0);

        if node_score > max_score {
            max_score = node_score;
        }
        if previews.len() < 5 {
            previews.push(node.text.chars().take(80).collect());
        }
    });

    let severity = crate::pipeline::outcome::Severity::from_score(max_score);
    DetectionResult {
        detected: max_score > 0.0,
        score: max_score,
        severity,
        threat_kind: ThreatKind::HiddenContent,
        matches: previews,
        details: std::collections::HashMap::new(),
        latency: start.elapsed(),
    }
}
