//! Structured parser output and its Markdown rendering.
//!
//! EasyDoc returns typed blocks (`Title`, `Text`, `Table`, `Figure`) in one
//! of two shapes:
//!
//! * `nodes`: a flat list with `id` / `parent_id` pointers. The hierarchy is
//!   rebuilt as a forest rooted at the sentinel [`ROOT_PARENT`] and rendered
//!   depth-first, so a title nested two levels deep becomes `##`.
//! * `blocks`: an already linear list. Rendered in order, every title at
//!   `#`.
//!
//! Tables and figures become fenced blocks labelled `table` / `figure`. The
//! tree renderer prefers the service's `vlm_understanding` description (only
//! filled in `premium` mode) over the raw OCR text.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// `parent_id` of top-level nodes.
pub const ROOT_PARENT: i64 = -1;

/// Block type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Title,
    Text,
    Table,
    Figure,
    /// Any type this crate does not render (headers, footers, formulas…).
    #[serde(other)]
    Other,
}

impl BlockKind {
    /// Fence label for table/figure blocks.
    fn fence_label(&self) -> Option<&'static str> {
        match self {
            BlockKind::Table => Some("table"),
            BlockKind::Figure => Some("figure"),
            _ => None,
        }
    }
}

/// One block of parser output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredBlock {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlm_understanding: Option<String>,
}

impl StructuredBlock {
    /// Body for a fenced block in the tree renderer.
    fn rich_body(&self) -> &str {
        match self.vlm_understanding.as_deref() {
            Some(v) if !v.trim().is_empty() => v,
            _ => &self.text,
        }
    }
}

/// The `task_result` payload of a finished parse task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskResult {
    #[serde(default)]
    pub nodes: Option<Vec<StructuredBlock>>,
    #[serde(default)]
    pub blocks: Option<Vec<StructuredBlock>>,
}

impl TaskResult {
    /// Render whichever shape the service populated. `nodes` wins when both
    /// are present; `None` when neither is.
    pub fn render(&self) -> Option<String> {
        if let Some(nodes) = &self.nodes {
            return Some(render_tree(&build_forest(nodes)));
        }
        self.blocks.as_deref().map(render_flat)
    }
}

/// A block with its children attached.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockNode<'a> {
    pub block: &'a StructuredBlock,
    pub children: Vec<BlockNode<'a>>,
}

impl BlockNode<'_> {
    /// Number of blocks in this subtree, including the root.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(BlockNode::len).sum::<usize>()
    }
}

/// Rebuild the hierarchy of a flat parent-pointer list.
///
/// Children keep their input order. A block whose `parent_id` does not match
/// any block is promoted to a root rather than dropped. Blocks only reachable
/// through a cycle are skipped with a warning.
pub fn build_forest(blocks: &[StructuredBlock]) -> Vec<BlockNode<'_>> {
    let ids: HashSet<i64> = blocks.iter().filter_map(|b| b.id).collect();

    let mut by_parent: HashMap<i64, Vec<usize>> = HashMap::new();
    let mut roots = Vec::new();
    for (i, block) in blocks.iter().enumerate() {
        match block.parent_id {
            Some(p) if p != ROOT_PARENT && ids.contains(&p) => {
                by_parent.entry(p).or_default().push(i)
            }
            Some(p) if p != ROOT_PARENT => {
                warn!("Block {:?} has unknown parent {p}; treating as top-level", block.id);
                roots.push(i);
            }
            _ => roots.push(i),
        }
    }

    let mut visited = HashSet::with_capacity(blocks.len());
    let forest: Vec<BlockNode<'_>> = roots
        .into_iter()
        .filter_map(|i| attach(i, blocks, &by_parent, &mut visited))
        .collect();

    let placed: usize = forest.iter().map(BlockNode::len).sum();
    if placed < blocks.len() {
        warn!(
            "{} block(s) are unreachable from the root (cyclic parent pointers); skipped",
            blocks.len() - placed
        );
    }
    forest
}

fn attach<'a>(
    index: usize,
    blocks: &'a [StructuredBlock],
    by_parent: &HashMap<i64, Vec<usize>>,
    visited: &mut HashSet<usize>,
) -> Option<BlockNode<'a>> {
    if !visited.insert(index) {
        return None;
    }
    let block = &blocks[index];
    let children = block
        .id
        .and_then(|id| by_parent.get(&id))
        .map(|kids| {
            kids.iter()
                .filter_map(|&k| attach(k, blocks, by_parent, visited))
                .collect()
        })
        .unwrap_or_default();
    Some(BlockNode { block, children })
}

/// Render a forest depth-first starting at heading level 1.
pub fn render_tree(forest: &[BlockNode<'_>]) -> String {
    let mut out = String::new();
    for node in forest {
        render_node(node, 1, &mut out);
    }
    out
}

fn render_node(node: &BlockNode<'_>, depth: usize, out: &mut String) {
    let block = node.block;
    match &block.kind {
        BlockKind::Title => {
            out.push('\n');
            out.push_str(&"#".repeat(depth));
            out.push(' ');
            out.push_str(&block.text);
            out.push_str("\n\n");
        }
        BlockKind::Text => {
            out.push('\n');
            out.push_str(&block.text);
            out.push_str("\n\n");
        }
        kind @ (BlockKind::Table | BlockKind::Figure) => {
            let label = kind.fence_label().unwrap_or_default();
            out.push_str(&format!("\n```{label}\n{}\n```\n\n", block.rich_body()));
        }
        BlockKind::Other => debug!("Skipping unrendered block {:?}", block.id),
    }
    for child in &node.children {
        render_node(child, depth + 1, out);
    }
}

/// Render an already linear block list. Titles are always level 1 and
/// tables/figures use the raw text only.
pub fn render_flat(blocks: &[StructuredBlock]) -> String {
    let mut out = String::new();
    for block in blocks {
        match &block.kind {
            BlockKind::Title => out.push_str(&format!("\n# {}\n", block.text)),
            BlockKind::Text => out.push_str(&format!("\n{}\n", block.text)),
            kind @ (BlockKind::Table | BlockKind::Figure) => {
                let label = kind.fence_label().unwrap_or_default();
                out.push_str(&format!("\n```{label}\n{}\n```\n", block.text));
            }
            BlockKind::Other => debug!("Skipping unrendered block {:?}", block.id),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: i64, parent: i64, kind: BlockKind, text: &str) -> StructuredBlock {
        StructuredBlock {
            id: Some(id),
            parent_id: Some(parent),
            kind,
            text: text.to_string(),
            vlm_understanding: None,
        }
    }

    #[test]
    fn two_block_example() {
        let blocks = vec![
            block(1, -1, BlockKind::Title, "A"),
            block(2, 1, BlockKind::Text, "B"),
        ];
        assert_eq!(render_tree(&build_forest(&blocks)), "\n# A\n\n\nB\n\n");
    }

    #[test]
    fn heading_level_tracks_nesting_depth() {
        let blocks = vec![
            block(1, -1, BlockKind::Title, "Paper"),
            block(2, 1, BlockKind::Title, "Method"),
            block(3, 2, BlockKind::Title, "Sampling"),
            block(4, 3, BlockKind::Text, "We sampled."),
            block(5, 1, BlockKind::Title, "Results"),
            block(6, -1, BlockKind::Title, "Appendix"),
        ];
        let md = render_tree(&build_forest(&blocks));
        let headings: Vec<&str> = md.lines().filter(|l| l.starts_with('#')).collect();
        assert_eq!(
            headings,
            vec![
                "# Paper",
                "## Method",
                "### Sampling",
                "## Results",
                "# Appendix"
            ]
        );
    }

    #[test]
    fn forest_preserves_every_block_once() {
        // children listed before their parents, siblings interleaved
        let blocks = vec![
            block(4, 2, BlockKind::Text, "d"),
            block(2, 1, BlockKind::Title, "b"),
            block(1, -1, BlockKind::Title, "a"),
            block(5, -1, BlockKind::Text, "e"),
            block(3, 1, BlockKind::Text, "c"),
        ];
        let forest = build_forest(&blocks);
        assert_eq!(forest.iter().map(BlockNode::len).sum::<usize>(), blocks.len());

        let md = render_tree(&forest);
        // a, then b with its child d, then c, then e
        let order: Vec<&str> = md.lines().filter(|l| !l.is_empty()).collect();
        assert_eq!(order, vec!["# a", "## b", "d", "c", "e"]);
    }

    #[test]
    fn orphans_are_promoted_and_cycles_skipped() {
        let blocks = vec![
            block(1, 99, BlockKind::Text, "orphan"),
            block(2, 3, BlockKind::Text, "cycle-a"),
            block(3, 2, BlockKind::Text, "cycle-b"),
        ];
        let forest = build_forest(&blocks);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].block.text, "orphan");
    }

    #[test]
    fn self_parented_root_does_not_loop() {
        let blocks = vec![block(-1, -1, BlockKind::Text, "x")];
        let forest = build_forest(&blocks);
        assert_eq!(forest.len(), 1);
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn tree_tables_prefer_vlm_understanding() {
        let mut table = block(1, -1, BlockKind::Table, "a|b");
        table.vlm_understanding = Some("Two columns a and b".into());
        let figure = block(2, -1, BlockKind::Figure, "fig 1");
        let md = render_tree(&build_forest(&[table, figure]));
        assert_eq!(
            md,
            "\n```table\nTwo columns a and b\n```\n\n\n```figure\nfig 1\n```\n\n"
        );
    }

    #[test]
    fn flat_rendering_uses_level_one_and_raw_text() {
        let mut table = block(3, 1, BlockKind::Table, "a|b");
        table.vlm_understanding = Some("ignored".into());
        let blocks = vec![
            block(1, -1, BlockKind::Title, "Intro"),
            block(2, 1, BlockKind::Title, "Nested"),
            table,
            block(4, 1, BlockKind::Text, "Body"),
        ];
        assert_eq!(
            render_flat(&blocks),
            "\n# Intro\n\n# Nested\n\n```table\na|b\n```\n\nBody\n"
        );
    }

    #[test]
    fn unknown_types_are_ignored() {
        let raw = r#"[
            {"type": "Header", "text": "Journal of X"},
            {"type": "Text", "text": "Body"}
        ]"#;
        let blocks: Vec<StructuredBlock> = serde_json::from_str(raw).unwrap();
        assert_eq!(blocks[0].kind, BlockKind::Other);
        assert_eq!(render_flat(&blocks), "\nBody\n");
    }

    #[test]
    fn task_result_prefers_nodes() {
        let raw = r#"{
            "nodes": [{"id": 1, "parent_id": -1, "type": "Title", "text": "T"}],
            "blocks": [{"type": "Text", "text": "flat"}]
        }"#;
        let result: TaskResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.render().unwrap(), "\n# T\n\n");

        let flat: TaskResult = serde_json::from_str(r#"{"blocks": []}"#).unwrap();
        assert_eq!(flat.render().unwrap(), "");

        let neither: TaskResult = serde_json::from_str("{}").unwrap();
        assert!(neither.render().is_none());
    }
}
