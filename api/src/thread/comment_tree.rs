use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::{
    App,
    comment::{
        Comment, CommentNode, SortType, ThreadState, TreeParams, Viewer, build_comment_tree,
        into_flat_list, level_zero_comments,
    },
    config::DEFAULT_PAGE_SIZE,
    error::Error,
    source::FetchQuery,
};

#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Nested,
    Flat,
}

impl Layout {
    fn apply(self, tree: Vec<CommentNode>) -> Vec<CommentNode> {
        match self {
            Layout::Nested => tree,
            Layout::Flat => into_flat_list(tree),
        }
    }
}

/// A snapshot posted by the caller, typically right after it created, edited
/// or deleted a comment.
#[derive(Deserialize)]
pub struct TreeRequest {
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub is_bot_origin: bool,
    #[serde(default)]
    pub viewer: Viewer,
    #[serde(default)]
    pub include_spam: bool,
    #[serde(default)]
    pub sort: SortType,
    #[serde(default)]
    pub layout: Layout,
}

#[derive(Deserialize)]
pub struct Queries {
    sort: Option<SortType>,
    #[serde(default)]
    include_spam: bool,
    #[serde(default)]
    layout: Layout,
    viewer: Option<String>,
    #[serde(default)]
    logged_in: bool,
    #[serde(default)]
    admin: bool,
    #[serde(default)]
    locked: bool,
    #[serde(default)]
    bot: bool,
}

fn tree_from_snapshot(comments: &[Comment], params: &TreeParams, layout: Layout) -> Vec<CommentNode> {
    let roots = level_zero_comments(comments, params.thread.thread_id, params.sort);
    layout.apply(build_comment_tree(&roots, comments, params))
}

pub async fn post_comment_tree(
    State(app): State<App>,
    Path(thread_id): Path<i32>,
    crate::json::Json(req): crate::json::Json<TreeRequest>,
) -> Result<Json<Vec<CommentNode>>, Error> {
    let params = TreeParams {
        thread: ThreadState {
            thread_id,
            is_locked: req.is_locked,
            is_bot_origin: req.is_bot_origin,
        },
        viewer: req.viewer,
        include_spam: req.include_spam,
        sort: req.sort,
        max_depth: app.config.max_thread_level,
    };

    Ok(Json(tree_from_snapshot(&req.comments, &params, req.layout)))
}

pub async fn get_comment_tree(
    State(app): State<App>,
    Path(thread_id): Path<i32>,
    Query(q): Query<Queries>,
) -> Result<Json<Vec<CommentNode>>, Error> {
    let source = app.source.as_ref().ok_or(Error::SourceNotConfigured)?;
    let sort = q.sort.unwrap_or_default();

    let query = FetchQuery {
        include_spam: q.include_spam,
        sort,
        page_size: app
            .config
            .comments_api
            .as_ref()
            .map_or(DEFAULT_PAGE_SIZE, |api| api.page_size),
    };
    let comments = source.fetch_thread_comments(thread_id, &query).await?;

    let params = TreeParams {
        thread: ThreadState {
            thread_id,
            is_locked: q.locked,
            is_bot_origin: q.bot,
        },
        viewer: Viewer {
            address: q.viewer,
            is_logged_in: q.logged_in,
            is_admin_or_mod: q.admin,
        },
        include_spam: q.include_spam,
        sort,
        max_depth: app.config.max_thread_level,
    };

    Ok(Json(tree_from_snapshot(&comments, &params, q.layout)))
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use chrono::{TimeZone, Utc};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::{
        config::ServerConfig,
        router,
        source::{CommentSource, SourceError},
    };

    use super::*;

    struct StaticSource(Vec<Comment>);

    #[async_trait]
    impl CommentSource for StaticSource {
        async fn fetch_thread_comments(
            &self,
            thread_id: i32,
            _query: &FetchQuery,
        ) -> Result<Vec<Comment>, SourceError> {
            Ok(self
                .0
                .iter()
                .filter(|c| c.thread_id == thread_id)
                .cloned()
                .collect())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl CommentSource for FailingSource {
        async fn fetch_thread_comments(
            &self,
            _thread_id: i32,
            _query: &FetchQuery,
        ) -> Result<Vec<Comment>, SourceError> {
            Err(SourceError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "database is down".into(),
            })
        }
    }

    fn comment(id: i32, parent_id: Option<i32>, minute: u32) -> Comment {
        Comment {
            id,
            parent_id,
            thread_id: 1,
            deleted: false,
            marked_as_spam_at: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, minute, 0).unwrap(),
            author: format!("0x{id}"),
            reaction_count: 0,
            text: format!("comment {id}"),
        }
    }

    fn snapshot() -> Vec<Comment> {
        vec![
            comment(1, None, 0),
            comment(2, Some(1), 1),
            comment(3, None, 2),
        ]
    }

    fn app_with(source: Option<Arc<dyn CommentSource>>) -> App {
        App {
            config: Arc::new(ServerConfig::default()),
            source,
        }
    }

    async fn send(app: App, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(app).oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn ids(nodes: &Value) -> Vec<i64> {
        nodes
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["id"].as_i64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_post_nested_tree() {
        let body = json!({
            "comments": snapshot(),
            "viewer": { "address": "0x2", "is_logged_in": true },
        });

        let (status, tree) = send(app_with(None), post("/threads/1/comment-tree", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&tree), vec![3, 1]);
        let reply = &tree[1]["children"][0];
        assert_eq!(reply["id"], 2);
        assert_eq!(reply["thread_level"], 1);
        assert_eq!(reply["is_comment_author"], true);
        assert_eq!(reply["reply_btn_visible"], true);
        assert!(tree[0].get("children").is_none());
    }

    #[tokio::test]
    async fn test_post_flat_oldest() {
        let body = json!({
            "comments": snapshot(),
            "sort": "oldest",
            "layout": "flat",
        });

        let (status, list) = send(app_with(None), post("/threads/1/comment-tree", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&list), vec![1, 2, 3]);
        assert_eq!(list[1]["thread_level"], 1);
        assert_eq!(list[0]["reply_btn_visible"], false);
    }

    #[tokio::test]
    async fn test_post_invalid_body_is_unprocessable() {
        let (status, body) = send(
            app_with(None),
            post("/threads/1/comment-tree", json!({ "comments": "nope" })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "ERR");
    }

    #[tokio::test]
    async fn test_get_uses_source() {
        let source: Arc<dyn CommentSource> = Arc::new(StaticSource(snapshot()));

        let (status, list) = send(
            app_with(Some(source)),
            get("/threads/1/comment-tree?layout=flat&sort=newest&viewer=0x3&logged_in=true&locked=true"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&list), vec![3, 1, 2]);
        assert_eq!(list[0]["is_comment_author"], true);
        assert_eq!(list[0]["can_edit"], false);
        assert_eq!(list[0]["reply_btn_visible"], false);
    }

    #[tokio::test]
    async fn test_get_without_source_is_unavailable() {
        let (status, body) = send(app_with(None), get("/threads/1/comment-tree")).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "NO_SOURCE");
    }

    #[tokio::test]
    async fn test_get_with_failing_source_is_bad_gateway() {
        let source: Arc<dyn CommentSource> = Arc::new(FailingSource);

        let (status, body) = send(app_with(Some(source)), get("/threads/1/comment-tree")).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "UPSTREAM_ERR");
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(app_with(None)).oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
