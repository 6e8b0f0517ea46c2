use super::CommentNode;

/// Lists the nodes of the tree in render order: every comment directly
/// followed by its replies, depth first.
pub fn flatten_comment_tree(roots: &[CommentNode]) -> Vec<&CommentNode> {
    let mut result = Vec::with_capacity(count_nodes(roots));
    for comment in roots {
        depth_first_search(comment, &mut result);
    }
    result
}

/// Same order as [`flatten_comment_tree`] but takes ownership of the tree.
/// Children are moved into the list, so every returned node has none left.
pub fn into_flat_list(roots: Vec<CommentNode>) -> Vec<CommentNode> {
    let mut result = Vec::with_capacity(count_nodes(&roots));
    for comment in roots {
        depth_first_drain(comment, &mut result);
    }
    result
}

fn count_nodes(nodes: &[CommentNode]) -> usize {
    nodes.iter().map(|n| 1 + count_nodes(&n.children)).sum()
}

fn depth_first_search<'a>(comment: &'a CommentNode, result: &mut Vec<&'a CommentNode>) {
    result.push(comment);
    for child in &comment.children {
        depth_first_search(child, result);
    }
}

fn depth_first_drain(mut comment: CommentNode, result: &mut Vec<CommentNode>) {
    let children = std::mem::take(&mut comment.children);
    result.push(comment);
    for child in children {
        depth_first_drain(child, result);
    }
}
