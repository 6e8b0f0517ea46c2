use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use super::{Comment, CommentNode, SortType};

/// Deepest `thread_level` that is still rendered. Replies below it are cut off.
pub const MAX_THREAD_LEVEL: usize = 8;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadState {
    pub thread_id: i32,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub is_bot_origin: bool,
}

/// The identity looking at the thread.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Viewer {
    pub address: Option<String>,
    #[serde(default)]
    pub is_logged_in: bool,
    #[serde(default)]
    pub is_admin_or_mod: bool,
}

#[derive(Debug, Clone)]
pub struct TreeParams {
    pub thread: ThreadState,
    pub viewer: Viewer,
    pub include_spam: bool,
    pub sort: SortType,
    pub max_depth: usize,
}

impl TreeParams {
    pub fn new(thread: ThreadState, viewer: Viewer) -> Self {
        TreeParams {
            thread,
            viewer,
            include_spam: false,
            sort: SortType::default(),
            max_depth: MAX_THREAD_LEVEL,
        }
    }
}

// parent id -> replies, in snapshot order
type ChildIndex<'a> = HashMap<i32, Vec<&'a Comment>>;

fn index_children(all: &[Comment], thread_id: i32) -> ChildIndex<'_> {
    let mut index = ChildIndex::with_capacity(all.len());
    for comment in all.iter().filter(|c| c.thread_id == thread_id) {
        if let Some(parent_id) = comment.parent_id {
            index.entry(parent_id).or_default().push(comment);
        }
    }
    index
}

struct Builder<'a> {
    params: &'a TreeParams,
    index: ChildIndex<'a>,
    placed: HashSet<i32>,
}

impl<'a> Builder<'a> {
    // Replies that pass the spam filter and are not already in the tree
    fn visible_children(&self, id: i32) -> impl Iterator<Item = &'a Comment> {
        let include_spam = self.params.include_spam;
        self.index
            .get(&id)
            .into_iter()
            .flatten()
            .copied()
            .filter(move |c| c.is_visible(include_spam) && !self.placed.contains(&c.id))
    }

    fn sorted_children(&self, id: i32) -> Vec<&'a Comment> {
        let mut children: Vec<&Comment> = self.visible_children(id).collect();
        self.params.sort.sort(&mut children);
        children
    }

    /// A deleted comment is only worth rendering as a tombstone if one of its
    /// children, or one of its grandchildren, is still there.
    fn is_living_subtree(&self, comment: &Comment, children: &[&'a Comment]) -> bool {
        if !comment.deleted {
            return true;
        }

        children.iter().any(|child| {
            !child.deleted || self.visible_children(child.id).any(|grandchild| !grandchild.deleted)
        })
    }

    fn annotate(&self, comment: &Comment, thread_level: usize) -> CommentNode {
        let TreeParams {
            thread,
            viewer,
            max_depth,
            ..
        } = self.params;

        let is_comment_author = viewer
            .address
            .as_deref()
            .is_some_and(|address| address == comment.author);
        let max_reply_limit_reached = thread_level >= *max_depth;
        let reply_btn_visible = !thread.is_locked && !thread.is_bot_origin && viewer.is_logged_in;
        let can_manage = !thread.is_locked && (is_comment_author || viewer.is_admin_or_mod);

        CommentNode {
            comment: comment.clone(),
            thread_level,
            is_comment_author,
            is_spam: comment.is_spam(),
            max_reply_limit_reached,
            reply_btn_visible,
            can_reply: reply_btn_visible && !max_reply_limit_reached,
            can_edit: can_manage,
            can_delete: can_manage,
            can_toggle_spam: can_manage,
            children: vec![],
        }
    }

    fn gather(&mut self, comments: &[&'a Comment], thread_level: usize) -> Vec<CommentNode> {
        let include_spam = self.params.include_spam;
        let mut nodes = Vec::with_capacity(comments.len());

        for &comment in comments.iter().filter(|c| c.is_visible(include_spam)) {
            // Duplicated records or a comment replying to itself
            if self.placed.contains(&comment.id) {
                tracing::trace!(comment_id = comment.id, "Skipping comment already in the tree");
                continue;
            }

            let children = self.sorted_children(comment.id);

            if !self.is_living_subtree(comment, &children) {
                tracing::trace!(comment_id = comment.id, "Pruning deleted comment without survivors");
                continue;
            }

            self.placed.insert(comment.id);
            let mut node = self.annotate(comment, thread_level);

            if !children.is_empty() && thread_level < self.params.max_depth {
                node.children = self.gather(&children, thread_level + 1);
            }

            nodes.push(node);
        }

        nodes
    }
}

/// Builds the nested, annotated comment tree of a thread.
///
/// `level_zero` are the thread's root comments in the order they should be
/// shown. `all` is the whole flat snapshot and is only used to look up
/// replies; records of other threads and replies to unknown parents are
/// ignored.
///
/// The result only contains living subtrees: a deleted comment is kept as a
/// placeholder when a child or a grandchild survives, and dropped together
/// with its subtree otherwise. Nothing deeper than `params.max_depth` is
/// produced.
pub fn build_comment_tree(
    level_zero: &[Comment],
    all: &[Comment],
    params: &TreeParams,
) -> Vec<CommentNode> {
    let mut builder = Builder {
        params,
        index: index_children(all, params.thread.thread_id),
        placed: HashSet::with_capacity(all.len()),
    };

    let roots: Vec<&Comment> = level_zero.iter().collect();
    let tree = builder.gather(&roots, 0);

    tracing::debug!(
        thread_id = params.thread.thread_id,
        snapshot = all.len(),
        roots = tree.len(),
        placed = builder.placed.len(),
        "Built comment tree"
    );

    tree
}
