//! Export utilities for the thought network
//!
//! Provides Graphviz DOT rendering of a snapshot.

use crate::error::GhostError;
use crate::index::{Snapshot, DEFAULT_RELATIONSHIP, EVOLVED_TO};
use crate::thought::ThoughtStatus;
use std::fmt::Write;
use std::str::FromStr;

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Full snapshot serialization
    Json,
    /// Graphviz directed graph
    Dot,
}

impl FromStr for ExportFormat {
    type Err = GhostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "dot" => Ok(ExportFormat::Dot),
            other => Err(GhostError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Configuration for DOT export
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Title for the graph
    pub title: Option<String>,
    /// Orientation: "TB" (top-bottom), "LR" (left-right)
    pub rankdir: Option<String>,
    /// Maximum characters of the intent shown in a node label
    pub label_width: usize,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            title: None,
            rankdir: None,
            label_width: 30,
        }
    }
}

/// Get the fill color for a thought status
fn status_color(status: ThoughtStatus) -> &'static str {
    match status {
        ThoughtStatus::New => "lightblue",
        ThoughtStatus::Processing => "yellow",
        ThoughtStatus::Complete => "lightgreen",
        ThoughtStatus::Evolving => "orange",
    }
}

/// Edge style for the relationship types that are drawn; others are left out
fn edge_style(kind: &str) -> Option<&'static str> {
    match kind {
        EVOLVED_TO => Some("solid"),
        DEFAULT_RELATIONSHIP => Some("dashed"),
        _ => None,
    }
}

/// Escape a string for DOT labels
fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// First `max_chars` characters of a string
fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Convert a snapshot to DOT format.
///
/// One node per thought, colored by status; `evolved_to` edges are solid and
/// `related` links dashed. Reverse and custom link types are not drawn.
pub fn snapshot_to_dot(snapshot: &Snapshot, config: &DotConfig) -> String {
    let mut dot = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(dot, "digraph ThoughtNetwork {{");
    if let Some(rankdir) = &config.rankdir {
        let _ = writeln!(dot, "  rankdir={};", rankdir);
    }
    if let Some(title) = &config.title {
        let _ = writeln!(dot, "  label=\"{}\";", escape_dot(title));
        let _ = writeln!(dot, "  labelloc=t;");
    }
    let _ = writeln!(dot, "  node [shape=box];");

    for (id, thought) in &snapshot.thoughts {
        let _ = writeln!(
            dot,
            "  \"{}\" [label=\"{}\" fillcolor=\"{}\" style=\"filled\"];",
            escape_dot(id),
            escape_dot(&truncate(&thought.intent, config.label_width)),
            status_color(thought.status)
        );
    }

    for (from, edges) in &snapshot.relationships {
        for edge in edges {
            if let Some(style) = edge_style(&edge.kind) {
                let _ = writeln!(
                    dot,
                    "  \"{}\" -> \"{}\" [style=\"{}\"];",
                    escape_dot(from),
                    escape_dot(&edge.to),
                    style
                );
            }
        }
    }

    dot.push('}');
    dot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Edge;
    use crate::thought::{ContentFormat, ThoughtNode};

    fn sample_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::default();
        let intent = "A \"quoted\" guide to everything under the sun";
        let guide = ThoughtNode::new("h", intent, 5, "", ContentFormat::Markdown).with_id("g1");
        let next = guide.evolve(None, None).with_id("g2");
        let notes = ThoughtNode::new("h", "notes", 5, "", ContentFormat::Markdown)
            .with_id("n1")
            .with_status(ThoughtStatus::Complete);
        for t in [guide, next, notes] {
            snapshot.thoughts.insert(t.id.clone().unwrap(), t);
        }

        let edge = |to: &str, kind: &str| Edge {
            to: to.to_string(),
            kind: kind.to_string(),
            created_at: "2025-01-01T00:00:00Z".to_string(),
        };
        snapshot.relationships.insert(
            "g1".into(),
            vec![edge("g2", EVOLVED_TO), edge("n1", "related"), edge("n1", "cites")],
        );
        snapshot
            .relationships
            .insert("g2".into(), vec![edge("g1", "evolved_from")]);
        snapshot.relationships.insert(
            "n1".into(),
            vec![edge("g1", "reverse_related"), edge("g1", "reverse_cites")],
        );
        snapshot
    }

    #[test]
    fn test_snapshot_to_dot() {
        let dot = snapshot_to_dot(&sample_snapshot(), &DotConfig::default());

        assert!(dot.starts_with("digraph ThoughtNetwork {"));
        assert!(dot.ends_with('}'));
        assert!(dot.contains("node [shape=box];"));
        assert!(dot.contains("\"g1\" -> \"g2\" [style=\"solid\"];"));
        assert!(dot.contains("\"g1\" -> \"n1\" [style=\"dashed\"];"));
        assert!(dot.contains("fillcolor=\"orange\""));
        assert!(dot.contains("fillcolor=\"lightgreen\""));
        assert!(dot.contains("fillcolor=\"lightblue\""));
        // Reverse, lineage back-links and custom types are not drawn
        assert!(!dot.contains("\"g2\" -> \"g1\""));
        assert!(!dot.contains("\"n1\" -> \"g1\""));
        assert_eq!(dot.matches("->").count(), 2);
    }

    #[test]
    fn test_labels_truncated_and_escaped() {
        let dot = snapshot_to_dot(&sample_snapshot(), &DotConfig::default());
        assert!(dot.contains("label=\"A \\\"quoted\\\" guide to everything\""));
    }

    #[test]
    fn test_title_and_rankdir() {
        let config = DotConfig {
            title: Some("My network".to_string()),
            rankdir: Some("LR".to_string()),
            ..DotConfig::default()
        };
        let dot = snapshot_to_dot(&Snapshot::default(), &config);
        assert!(dot.contains("rankdir=LR;"));
        assert!(dot.contains("label=\"My network\";"));
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("dot".parse::<ExportFormat>().unwrap(), ExportFormat::Dot);
        assert!(matches!("csv".parse::<ExportFormat>(), Err(GhostError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("héllo wörld", 7), "héllo w");
        assert_eq!(truncate("short", 30), "short");
    }
}
