//! `handshake slice` command implementation.

use std::collections::BTreeMap;

use anyhow::Result;
use colored::Colorize;
use handshake::{CallContext, Slice, SliceEdge, UserId};
use serde::Serialize;

use super::GlobalOpts;
use super::display::{depth_label, print_bullets, print_json};

/// Edges listed in text output before cutting off.
const MAX_EDGES: usize = 50;

/// A slice node annotated with its total connection count.
#[derive(Debug, Serialize)]
struct NodeView<'a> {
    id: &'a UserId,
    depth: u32,
    connections: u64,
}

#[derive(Debug, Serialize)]
struct SliceView<'a> {
    nodes: Vec<NodeView<'a>>,
    edges: &'a [SliceEdge],
    truncated: bool,
}

/// Run the slice command.
pub async fn run(global: &GlobalOpts, user: &str, depth: u32) -> Result<()> {
    let engine = global.engine().await?;
    let root = UserId::new(user);

    let slice = engine.slice(&CallContext::new(), &root, depth).await?;

    let ids: Vec<UserId> = slice.nodes.iter().map(|n| n.id.clone()).collect();
    let counts = engine.store().connection_counts(&ids).await?;
    let view = annotate(&slice, &counts);

    if global.json {
        return print_json(&view);
    }
    print_slice(&root, &view);
    Ok(())
}

fn annotate<'a>(slice: &'a Slice, counts: &BTreeMap<UserId, u64>) -> SliceView<'a> {
    SliceView {
        nodes: slice
            .nodes
            .iter()
            .map(|n| NodeView {
                id: &n.id,
                depth: n.depth,
                connections: counts.get(&n.id).copied().unwrap_or(0),
            })
            .collect(),
        edges: &slice.edges,
        truncated: slice.truncated,
    }
}

fn print_slice(root: &UserId, view: &SliceView<'_>) {
    println!(
        "{} around \"{}\": {} users, {} connections",
        "Neighborhood".white().bold(),
        root.as_str().cyan().bold(),
        view.nodes.len().to_string().green(),
        view.edges.len().to_string().green()
    );
    println!();

    let mut current = None;
    for node in &view.nodes {
        if current != Some(node.depth) {
            println!("  {}:", depth_label(node.depth).yellow());
            current = Some(node.depth);
        }
        println!(
            "    {} {} {}",
            "•".dimmed(),
            node.id.as_str().white(),
            format!("({} connections)", node.connections).dimmed()
        );
    }

    if !view.edges.is_empty() {
        println!();
        println!("  {}:", "Connections".yellow());
        print_bullets(
            view.edges.iter().map(edge_label),
            view.edges.len(),
            MAX_EDGES,
        );
    }

    if view.truncated {
        println!();
        println!(
            "  {}: neighborhood capped at the configured node limit",
            "Note".yellow().bold()
        );
    }
}

fn edge_label(edge: &SliceEdge) -> String {
    format!("{} <-> {}", edge.from, edge.to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use handshake::SliceNode;

    #[test]
    fn annotate_defaults_missing_counts_to_zero() {
        let slice = Slice {
            nodes: vec![
                SliceNode {
                    id: "a".into(),
                    depth: 0,
                },
                SliceNode {
                    id: "b".into(),
                    depth: 1,
                },
            ],
            edges: vec![SliceEdge {
                from: "a".into(),
                to: "b".into(),
            }],
            truncated: false,
        };
        let counts = BTreeMap::from([(UserId::new("a"), 4)]);

        let view = annotate(&slice, &counts);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["nodes"][0]["connections"], 4);
        assert_eq!(json["nodes"][1]["connections"], 0);
        assert_eq!(json["edges"][0]["from"], "a");
    }

    #[test]
    fn edge_labels_are_plain_ascii() {
        let edge = SliceEdge {
            from: "amy".into(),
            to: "bo".into(),
        };
        assert_eq!(edge_label(&edge), "amy <-> bo");
    }
}
