//! Hallucination check.
//!
//! Verifies that an element the agent claims to be acting on actually
//! exists in the current DOM, is visible, and matches the agent's
//! claimed text and element type.

use std::time::Instant;

use crate::dom::{DomNode, DomTree};

/// The result of checking one claimed element against the DOM.
#[derive(Debug, Clone)]
pub struct HallucinationCheck {
    /// Whether a matching node was located at all.
    pub exists: bool,
    /// Whether the located node is visible (non-zero area, not
    /// CSS-hidden).
    pub visible: bool,
    /// Whether claimed text matches the node's text (exact, substring,
    /// or fuzzy word-overlap ≥ 0.6).
    pub text_match: bool,
    /// Whether the claimed element type matches the node's tag, allowing
    /// known synonyms.
    pub type_match: bool,
    /// Word-overlap similarity between claimed and actual text, 0.0–1.0.
    pub similarity: f32,
}

impl HallucinationCheck {
    /// `true` if this check should be flagged as a hallucination: the
    /// element is absent, the text diverges badly (similarity < 0.3),
    /// or the element type does not match.
    #[must_use]
    pub fn is_hallucination(&self) -> bool {
        !self.exists || self.similarity < 0.3 || !self.type_match
    }
}

fn node_matches_selector(node: &DomNode, selector: &str) -> bool {
    if let Some(id) = selector.strip_prefix('#') {
        return node.id.as_deref() == Some(id);
    }
    if let Some(class) = selector.strip_prefix('.') {
        return node.has_class_matching(&[class]);
    }
    node.tag.eq_ignore_ascii_case(selector)
        || node.attributes.values().any(|v| v == selector)
}

fn word_overlap(a: &str, b: &str) -> f32 {
    let words_a: std::collections::HashSet<&str> = a.split_whitespace().collect();
    let words_b: std::collections::HashSet<&str> = b.split_whitespace().collect();
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }
    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

fn types_compatible(tag: &str, claimed_type: &str) -> bool {
    let tag = tag.to_lowercase();
    let claimed = claimed_type.to_lowercase();
    if tag == claimed {
        return true;
    }
    matches!(
        (tag.as_str(), claimed.as_str()),
        ("button", "a") | ("a", "button") | ("input", "button") | ("button", "input")
            | ("a", "link") | ("link", "a")
            | ("textarea", "input") | ("input", "textarea")
    )
}

/// Locate `selector` in `tree` (bounded recursion) and check it against
/// the agent's claims.
#[must_use]
pub fn check(
    tree: &DomTree,
    selector: &str,
    claimed_text: Option<&str>,
    claimed_type: Option<&str>,
) -> HallucinationCheck {
    let _start = Instant::now();
    let found = tree.find(|node| node_matches_selector(node, selector));

    let Some(node) = found else {
        return HallucinationCheck {
            exists: false,
            visible: false,
            text_match: false,
            type_match: false,
            similarity: 0.0,
        };
    };

    let visible = node
        .bounding_box
        .as_ref()
        .is_none_or(|b| !b.is_degenerate());

    let similarity = claimed_text.map_or(1.0, |claimed| {
        if node.text.trim() == claimed.trim() {
            1.0
        } else if node.text.contains(claimed) || claimed.contains(node.text.as_str()) {
            0.8
        } else {
            word_overlap(&node.text, claimed)
        }
    });
    let text_match = claimed_text.is_none() || similarity >= 0.6;

    let type_match = claimed_type.is_none_or(|claimed| types_compatible(&node.tag, claimed));

    HallucinationCheck {
        exists: true,
        visible,
        text_match,
        type_match,
        similarity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::BoundingBox;

    fn tree_with(node: DomNode) -> DomTree {
        DomTree::new(vec![node], 0)
    }

    #[test]
    fn missing_element_is_hallucination() {
        let tree = tree_with(DomNode {
            tag: "div".into(),
            ..Default::default()
        });
        let check = check(&tree, "#does-not-exist", None, None);
        assert!(check.is_hallucination());
        assert!(!check.exists);
    }

    #[test]
    fn matching_element_is_not_hallucination() {
        let tree = tree_with(DomNode {
            tag: "button".into(),
            id: Some("submit".into()),
            text: "Submit order".into(),
            bounding_box: Some(BoundingBox {
                x: 0.0,
                y: 0.0,
                width: 80.0,
                height: 30.0,
            }),
            ..Default::default()
        });
        let check = check(&tree, "#submit", Some("Submit order"), Some("button"));
        assert!(!check.is_hallucination());
        assert!(check.visible);
        assert!(check.text_match);
    }

    #[test]
    fn type_mismatch_flagged() {
        let tree = tree_with(DomNode {
            tag: "div".into(),
            id: Some("thing".into()),
            ..Default::default()
        });
        let check = check(&tree, "#thing", None, Some("button"));
        assert!(check.is_hallucination());
        assert!(!check.type_match);
    }

    #[test]
    fn type_synonym_accepted() {
        let tree = tree_with(DomNode {
            tag: "a".into(),
            id: Some("link".into()),
            ..Default::default()
        });
        let check = check(&tree, "#link", None, Some("button"));
        assert!(check.type_match);
    }

    #[test]
    fn low_text_similarity_flagged() {
        let tree = tree_with(DomNode {
            tag: "span".into(),
            id: Some("a".into()),
            text: "completely unrelated content".into(),
            ..Default::default()
        });
        let check = check(&tree, "#a", Some("buy now"), None);
        assert!(check.is_hallucination());
    }
}
