pub mod comment_tree;
pub mod routes;
