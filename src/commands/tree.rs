//! # Tree Command Implementation
//!
//! This module implements the `tree` subcommand, which displays the include
//! graph of the last load as a tree: the root document, then every document it
//! pulled in through `from`, in merge order.
//!
//! Documents skipped because they were already loaded through another branch
//! appear only under the branch that loaded them first.

use anyhow::Result;
use clap::Args;
use ptree::TreeItem;

use uniconf::engine::IncludeNode;
use uniconf::Uniconf;

use super::GlobalArgs;

/// Display the include tree
#[derive(Args, Debug, Default)]
pub struct TreeArgs {
    /// Maximum depth to display in the tree.
    ///
    /// If not specified, displays the full tree.
    /// Use 0 to show only the root documents, 1 to show their direct includes, etc.
    #[arg(long, value_name = "NUM")]
    pub depth: Option<usize>,
}

/// Render the include tree of a loaded configuration.
pub fn render(uniconf: &Uniconf, args: &TreeArgs) -> Result<String> {
    let max_depth = args.depth.unwrap_or(usize::MAX);
    let mut out = Vec::new();
    for root in uniconf.include_tree() {
        let node = build_tree_node(&root, max_depth, 0);
        ptree::write_tree(&node, &mut out)
            .map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Execute the `tree` command.
pub fn execute(args: TreeArgs, global: &GlobalArgs) -> Result<()> {
    let uniconf = global.load()?;
    print!("{}", render(&uniconf, &args)?);
    Ok(())
}

fn build_tree_node(include: &IncludeNode, max_depth: usize, current_depth: usize) -> TreeNode {
    let label = include.key.to_string();

    if current_depth >= max_depth || include.children.is_empty() {
        TreeNode {
            label,
            children: vec![],
        }
    } else {
        let children = include
            .children
            .iter()
            .map(|child| build_tree_node(child, max_depth, current_depth + 1))
            .collect();
        TreeNode { label, children }
    }
}

/// Tree node structure for ptree visualization
#[derive(Clone)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> std::borrow::Cow<'_, [Self::Child]> {
        std::borrow::Cow::Borrowed(&self.children)
    }
}
