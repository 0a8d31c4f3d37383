use std::fmt::Write;

use vdl_tree::{NodeKind, NodeView, TreeSnapshot};

/// Plain-text dump of a snapshot, one node per line.
pub(crate) fn render_snapshot(snapshot: &TreeSnapshot) -> String {
    let mut out = String::new();
    out.push_str("locals:\n");
    for local in &snapshot.locals {
        render_node(&mut out, local, 1);
    }
    if !snapshot.watches.is_empty() {
        out.push_str("watches:\n");
        for watch in &snapshot.watches {
            let _ = write!(out, "  #{} ", watch.watch_id);
            render_line(&mut out, &watch.node);
            render_children(&mut out, &watch.node, 2);
        }
    }
    if snapshot.pending_chases > 0 {
        let _ = writeln!(out, "({} chases pending)", snapshot.pending_chases);
    }
    out
}

fn render_node(out: &mut String, node: &NodeView, depth: usize) {
    out.push_str(&"  ".repeat(depth));
    render_line(out, node);
    render_children(out, node, depth + 1);
}

fn render_children(out: &mut String, node: &NodeView, depth: usize) {
    for child in &node.children {
        render_node(out, child, depth);
    }
}

fn render_line(out: &mut String, node: &NodeView) {
    let marker = match (node.is_leaf, node.expanded) {
        (true, _) => ' ',
        (false, true) => '-',
        (false, false) => '+',
    };
    let _ = write!(out, "{marker} {} = {}", node.name, node.value);
    if !node.type_name.is_empty() {
        let _ = write!(out, " : {}", node.type_name);
    }
    if node.delta {
        out.push_str(" *");
    }
    if let NodeKind::Pointer { chased: false } = node.kind {
        out.push_str(" ->");
    }
    out.push('\n');
}
