use html5ever::{QualName, local_name, namespace_url, ns};
use kuchiki::{NodeData, NodeRef};

use crate::state::DocumentState;

enum WalkStep {
    Enter(NodeRef),
    Exit(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct WalkCounts {
    pub elements: u64,
    pub text_nodes: u64,
    pub max_depth: usize,
}

fn attributes_of(node: &NodeRef) -> Vec<(String, String)> {
    let Some(element) = node.as_element() else {
        return Vec::new();
    };
    let attrs = element.attributes.borrow();
    attrs
        .map
        .iter()
        .map(|(name, attr)| (name.local.to_string(), attr.value.clone()))
        .collect()
}

fn push_children(stack: &mut Vec<WalkStep>, node: &NodeRef) {
    let children: Vec<NodeRef> = node.children().collect();
    stack.extend(children.into_iter().rev().map(WalkStep::Enter));
}

/// Depth-first walk of `root` driving `state`. Uses an explicit stack, so
/// nesting depth is bounded by memory rather than the call stack.
pub(crate) fn walk(root: &NodeRef, state: &mut DocumentState<'_>) -> WalkCounts {
    let mut counts = WalkCounts::default();
    let mut stack = vec![WalkStep::Enter(root.clone())];
    while let Some(step) = stack.pop() {
        match step {
            WalkStep::Enter(node) => match node.data() {
                NodeData::Element(element) => {
                    let tag = element.name.local.to_string().to_ascii_lowercase();
                    let attributes = attributes_of(&node);
                    state.enter(&tag, &attributes);
                    counts.elements += 1;
                    counts.max_depth = counts.max_depth.max(state.depth());
                    stack.push(WalkStep::Exit(tag));
                    push_children(&mut stack, &node);
                }
                NodeData::Text(text) => {
                    counts.text_nodes += 1;
                    state.write_text(&text.borrow());
                }
                NodeData::Document(_) | NodeData::DocumentFragment => {
                    push_children(&mut stack, &node);
                }
                _ => {}
            },
            WalkStep::Exit(tag) => state.exit(&tag),
        }
    }
    counts
}

fn is_table(node: &NodeRef) -> bool {
    node.as_element()
        .map(|element| (&*element.name.local).eq_ignore_ascii_case("table"))
        .unwrap_or(false)
}

/// Tables not nested inside another table, in document order.
pub(crate) fn outermost_tables(document: &NodeRef) -> Vec<NodeRef> {
    document
        .descendants()
        .filter(is_table)
        .filter(|node| !node.ancestors().any(|ancestor| is_table(&ancestor)))
        .collect()
}

/// Swaps `table` for a `<pre>` element holding `text`.
pub(crate) fn replace_with_pre(table: &NodeRef, text: &str) {
    let pre = NodeRef::new_element(QualName::new(None, ns!(html), local_name!("pre")), None);
    pre.append(NodeRef::new_text(text));
    table.insert_before(pre);
    table.detach();
}
