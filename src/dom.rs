//! A flat, arena-backed DOM snapshot.
//!
//! The driver hands the core a tree of nodes on every extraction. Rather
//! than modeling that as owned parent/child pointers (which in Rust means
//! `Rc<RefCell<_>>` cycles for a mutable tree, or awkward lifetimes for a
//! borrowed one), nodes live flat in a `Vec` and reference each other by
//! index. Traversal is then an explicit, bounded-depth stack walk instead
//! of recursion through smart pointers — see [`DomTree::walk`].

use serde::{Deserialize, Serialize};

/// Maximum recursion depth detectors will walk into a [`DomTree`].
///
/// Matches the hidden-content and hallucination detectors' bounded-depth
/// requirement; pages with deeper nesting are still walked, just
/// truncated at this depth.
pub const MAX_WALK_DEPTH: usize = 50;

/// Index of a node within a [`DomTree`]'s arena.
pub type NodeId = usize;

/// A bounding box in page coordinates, as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X offset from the page origin.
    pub x: f64,
    /// Y offset from the page origin.
    pub y: f64,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl BoundingBox {
    /// Area in square pixels.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Zero-area or negative-dimension box — a common signal of an
    /// intentionally collapsed hidden element.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// A single DOM node, as reported by the driver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomNode {
    /// Lowercase tag name, e.g. `"div"`, `"input"`.
    pub tag: String,
    /// `id` attribute, if present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Space-separated `class` tokens.
    #[serde(default)]
    pub classes: Vec<String>,
    /// Rendered text content directly owned by this node (not children).
    #[serde(default)]
    pub text: String,
    /// Raw inline `style` attribute string, unparsed.
    #[serde(default)]
    pub style: String,
    /// All other attributes, name to value.
    #[serde(default)]
    pub attributes: std::collections::HashMap<String, String>,
    /// Bounding box, if the driver computed layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    /// Indices of this node's children in the owning [`DomTree`]'s arena.
    #[serde(default)]
    pub children: Vec<NodeId>,
    /// Index of this node's shadow root, if any, as its own subtree root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow_root: Option<NodeId>,
}

impl DomNode {
    /// A node contains a class token matching one of `needles`
    /// (case-sensitive, exact token match).
    #[must_use]
    pub fn has_class_matching(&self, needles: &[&str]) -> bool {
        self.classes
            .iter()
            .any(|c| needles.contains(&c.as_str()))
    }
}

/// A DOM snapshot: a flat arena of nodes plus the root index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomTree {
    /// All nodes, indexed by [`NodeId`].
    pub nodes: Vec<DomNode>,
    /// Index of the document root node.
    pub root: NodeId,
}

impl DomTree {
    /// Build a tree from a pre-populated arena and root index.
    #[must_use]
    pub fn new(nodes: Vec<DomNode>, root: NodeId) -> Self {
        Self { nodes, root }
    }

    /// A tree containing only an empty root `<html>` node.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            nodes: vec![DomNode {
                tag: "html".to_string(),
                ..Default::default()
            }],
            root: 0,
        }
    }

    /// Look up a node by id.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&DomNode> {
        self.nodes.get(id)
    }

    /// Depth-first pre-order walk from the root, including shadow-root
    /// subtrees, bounded at [`MAX_WALK_DEPTH`]. `visit` receives each
    /// node and its depth; nodes beyond the depth bound are skipped
    /// along with their children.
    pub fn walk(&self, mut visit: impl FnMut(&DomNode, usize)) {
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            if depth > MAX_WALK_DEPTH {
                continue;
            }
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            visit(node, depth);
            for &child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
            if let Some(shadow) = node.shadow_root {
                stack.push((shadow, depth + 1));
            }
        }
    }

    /// Find the first node matching `predicate` in pre-order.
    #[must_use]
    pub fn find(&self, predicate: impl Fn(&DomNode) -> bool) -> Option<&DomNode> {
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            if depth > MAX_WALK_DEPTH {
                continue;
            }
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if predicate(node) {
                return Some(node);
            }
            for &child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
            if let Some(shadow) = node.shadow_root {
                stack.push((shadow, depth + 1));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> DomTree {
        let root = DomNode {
            tag: "html".into(),
            children: vec![1, 2],
            ..Default::default()
        };
        let child_a = DomNode {
            tag: "div".into(),
            id: Some("main".into()),
            text: "hello".into(),
            ..Default::default()
        };
        let child_b = DomNode {
            tag: "span".into(),
            classes: vec!["hidden".into()],
            text: "secret instructions here".into(),
            ..Default::default()
        };
        DomTree::new(vec![root, child_a, child_b], 0)
    }

    #[test]
    fn walk_visits_all_nodes() {
        let tree = sample_tree();
        let mut tags = Vec::new();
        tree.walk(|node, _depth| tags.push(node.tag.clone()));
        assert_eq!(tags.len(), 3);
        assert!(tags.contains(&"div".to_string()));
        assert!(tags.contains(&"span".to_string()));
    }

    #[test]
    fn find_by_id() {
        let tree = sample_tree();
        let found = tree.find(|n| n.id.as_deref() == Some("main"));
        assert!(found.is_some());
        assert_eq!(found.unwrap().text, "hello");
    }

    #[test]
    fn find_by_class() {
        let tree = sample_tree();
        let found = tree.find(|n| n.has_class_matching(&["hidden"]));
        assert!(found.is_some());
    }

    #[test]
    fn bounding_box_area_and_degenerate() {
        let box_ = BoundingBox {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 10.0,
        };
        assert_eq!(box_.area(), 0.0);
        assert!(box_.is_degenerate());
    }

    #[test]
    fn depth_bound_truncates_walk() {
        // Build a chain longer than MAX_WALK_DEPTH.
        let mut nodes = Vec::new();
        for i in 0..(MAX_WALK_DEPTH + 10) {
            nodes.push(DomNode {
                tag: "div".into(),
                children: if i + 1 < MAX_WALK_DEPTH + 10 {
                    vec![i + 1]
                } else {
                    vec![]
                },
                ..Default::default()
            });
        }
        let tree = DomTree::new(nodes, 0);
        let mut count = 0;
        tree.walk(|_, _| count += 1);
        assert!(count <= MAX_WALK_DEPTH + 1);
    }
}
