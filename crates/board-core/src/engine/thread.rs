//! Reply threading.
//!
//! Comments form a forest keyed by `parentId`. The forest is a flat arena:
//! nodes are stored in pre-order and refer to their replies by index, so
//! building, walking, cloning, serializing, and dropping a deep chain never
//! recurses.
//!
//! Rules:
//! - a comment with no parent, a self parent, or a parent missing from the
//!   fetched set is a root (orphans stay visible)
//! - comments whose parent chain loops without reaching a root are promoted:
//!   the earliest comment of each loop becomes a root and the rest of the
//!   loop hangs under it
//! - siblings are ordered by `createdAt`, then id

use serde::Serialize;
use std::collections::HashMap;

use crate::model::Comment;

/// One comment in a [`CommentForest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadNode {
    /// Roots sit at depth 0.
    pub depth: usize,
    pub comment: Comment,
    /// Arena indexes of the direct replies, oldest first.
    pub replies: Vec<usize>,
}

/// Reply threads of one problem. Every node is followed by its whole
/// subtree in `nodes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommentForest {
    /// Arena indexes of the thread roots, oldest first.
    pub roots: Vec<usize>,
    pub nodes: Vec<ThreadNode>,
}

impl CommentForest {
    /// Total number of comments across all threads.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order walk yielding `(depth, comment)`.
    pub fn walk(&self) -> impl Iterator<Item = (usize, &Comment)> {
        self.nodes.iter().map(|node| (node.depth, &node.comment))
    }

    /// Number of comments in the thread rooted at `index`, including the
    /// root itself. Zero for an index outside the arena.
    #[must_use]
    pub fn thread_len(&self, index: usize) -> usize {
        let Some(root) = self.nodes.get(index) else {
            return 0;
        };
        1 + self.nodes[index + 1..]
            .iter()
            .take_while(|node| node.depth > root.depth)
            .count()
    }
}

/// Arrange a flat list of comments into reply threads.
#[must_use]
pub fn build_threads(mut comments: Vec<Comment>) -> CommentForest {
    comments.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut roots = Vec::new();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    {
        let index: HashMap<&str, usize> = comments
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.as_str(), i))
            .collect();
        for (i, comment) in comments.iter().enumerate() {
            match comment
                .parent_id
                .as_deref()
                .and_then(|parent| index.get(parent).copied())
            {
                Some(parent) if parent != i => children[parent].push(i),
                _ => roots.push(i),
            }
        }
    }

    let mut slots: Vec<Option<Comment>> = comments.into_iter().map(Some).collect();
    let mut forest = CommentForest::default();
    for root in roots {
        assemble(root, &children, &mut slots, &mut forest);
    }
    // Anything still unplaced sits on a parent loop.
    for i in 0..slots.len() {
        if let Some(comment) = &slots[i] {
            tracing::debug!(id = %comment.id, "promoting comment on a parent loop to root");
            assemble(i, &children, &mut slots, &mut forest);
        }
    }
    forest
}

/// Depth-first placement of one thread; each comment is moved out of
/// `slots` exactly once.
fn assemble(
    root: usize,
    children: &[Vec<usize>],
    slots: &mut [Option<Comment>],
    forest: &mut CommentForest,
) {
    let mut stack: Vec<(usize, Option<usize>, usize)> = vec![(root, None, 0)];
    while let Some((i, parent, depth)) = stack.pop() {
        let Some(comment) = slots[i].take() else {
            continue;
        };
        let at = forest.nodes.len();
        forest.nodes.push(ThreadNode {
            depth,
            comment,
            replies: Vec::new(),
        });
        match parent {
            Some(p) => forest.nodes[p].replies.push(at),
            None => forest.roots.push(at),
        }
        for &child in children[i].iter().rev() {
            stack.push((child, Some(at), depth + 1));
        }
    }
}
