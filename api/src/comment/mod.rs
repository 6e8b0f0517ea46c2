pub mod flatten;
pub mod sort;
pub mod tree;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use flatten::{flatten_comment_tree, into_flat_list};
pub use sort::{SortType, level_zero_comments};
pub use tree::{MAX_THREAD_LEVEL, ThreadState, TreeParams, Viewer, build_comment_tree};

// The record as returned by the upstream comments API
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Comment {
    pub id: i32,
    #[serde(default, alias = "parentComment")]
    pub parent_id: Option<i32>,
    pub thread_id: i32,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub marked_as_spam_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub author: String,
    #[serde(default)]
    pub reaction_count: i64,
    #[serde(default)]
    pub text: String,
}

impl Comment {
    pub fn is_spam(&self) -> bool {
        self.marked_as_spam_at.is_some()
    }

    /// Whether the comment passes the spam filter.
    pub fn is_visible(&self, include_spam: bool) -> bool {
        include_spam || !self.is_spam()
    }
}

// The annotated node that will be returned to the client
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub thread_level: usize,
    pub is_comment_author: bool,
    pub is_spam: bool,
    pub max_reply_limit_reached: bool,
    pub reply_btn_visible: bool,
    pub can_reply: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_toggle_spam: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    pub fn id(&self) -> i32 {
        self.comment.id
    }
}
