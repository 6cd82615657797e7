//! Contains the logic to print the channel tree to the terminal.

use termimad::print_inline;

use crate::channel::{ChannelNode, NodeKind};

/// Appends the markdown of the given node and its children at the given depth.
fn write_node(node: &ChannelNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match node.kind {
        NodeKind::Channel => out.push_str(&format!("# {}\n", node.title)),
        NodeKind::Topic | NodeKind::SubTopic => out.push_str(&format!(
            "{}* **{}** ({} lessons)\n",
            indent,
            node.title,
            node.num_leaves()
        )),
        NodeKind::Leaf => out.push_str(&format!(
            "{}* {} `{}`\n",
            indent, node.title, node.source_id
        )),
    }

    // Topics hang from the channel at depth zero.
    let child_depth = if node.kind == NodeKind::Channel {
        0
    } else {
        depth + 1
    };
    for child in &node.children {
        write_node(child, child_depth, out);
    }
}

/// Returns the channel tree as a markdown list.
pub fn tree_markdown(channel: &ChannelNode) -> String {
    let mut out = String::new();
    write_node(channel, 0, &mut out);
    out
}

/// Prints the channel tree to the terminal.
pub fn print_tree(channel: &ChannelNode) {
    print_inline(&tree_markdown(channel));
    println!();
}
