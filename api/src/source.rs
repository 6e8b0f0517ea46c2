// Client for the upstream comments API, which owns the comment records.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::comment::{Comment, SortType};

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("Could not reach the comments API: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Comments API answered with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Invalid comments API URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Clone)]
pub struct FetchQuery {
    pub include_spam: bool,
    pub sort: SortType,
    pub page_size: usize,
}

/// Where the flat comment snapshot of a thread comes from.
#[async_trait]
pub trait CommentSource: Send + Sync {
    async fn fetch_thread_comments(
        &self,
        thread_id: i32,
        query: &FetchQuery,
    ) -> Result<Vec<Comment>, SourceError>;
}

#[derive(Debug, Deserialize)]
struct CommentsPage {
    results: Vec<Comment>,
    #[serde(default = "first_page")]
    page: usize,
    #[serde(default = "first_page", alias = "totalPages")]
    total_pages: usize,
}

fn first_page() -> usize {
    1
}

pub struct HttpCommentSource {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    max_pages: usize,
}

impl HttpCommentSource {
    pub fn new(
        http: reqwest::Client,
        base_url: Url,
        token: Option<String>,
        max_pages: usize,
    ) -> Self {
        HttpCommentSource {
            http,
            base_url,
            token,
            max_pages: max_pages.max(1),
        }
    }

    fn comments_url(&self, thread_id: i32) -> Result<Url, SourceError> {
        // keep any path prefix of the base URL
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/threads/{thread_id}/comments"))?)
    }

    async fn fetch_page(
        &self,
        url: &Url,
        query: &FetchQuery,
        cursor: usize,
    ) -> Result<CommentsPage, SourceError> {
        let mut request = self.http.get(url.clone()).query(&[
            ("include_spam_comments", query.include_spam.to_string()),
            ("order_by", query.sort.to_string()),
            ("cursor", cursor.to_string()),
            ("limit", query.page_size.to_string()),
        ]);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::Status { status, body });
        }

        Ok(resp.json::<CommentsPage>().await?)
    }
}

#[async_trait]
impl CommentSource for HttpCommentSource {
    async fn fetch_thread_comments(
        &self,
        thread_id: i32,
        query: &FetchQuery,
    ) -> Result<Vec<Comment>, SourceError> {
        let url = self.comments_url(thread_id)?;
        let mut comments = Vec::new();
        let mut cursor = 1;

        loop {
            let page = self.fetch_page(&url, query, cursor).await?;
            comments.extend(page.results);

            if page.page >= page.total_pages {
                break;
            }

            if cursor >= self.max_pages {
                tracing::warn!(
                    thread_id,
                    fetched = comments.len(),
                    total_pages = page.total_pages,
                    "Stopped paging through comments at the configured limit"
                );
                break;
            }

            cursor += 1;
        }

        tracing::debug!(thread_id, count = comments.len(), "Fetched comment snapshot");
        Ok(comments)
    }
}
