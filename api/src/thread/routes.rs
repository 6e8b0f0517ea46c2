use axum::{Router, routing::get};

use crate::App;

use super::comment_tree::{get_comment_tree, post_comment_tree};

pub fn route() -> Router<App> {
    // TODO rate limit the upstream-backed GET once the SPA switches to it
    Router::<App>::new().route(
        "/{thread_id}/comment-tree",
        get(get_comment_tree).post(post_comment_tree),
    )
}
