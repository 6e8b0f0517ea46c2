use std::{cmp::Ordering, convert::Infallible, fmt, str::FromStr};

use serde::Deserialize;

use super::Comment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortType {
    #[default]
    Newest,
    Oldest,
    MostLikes,
}

impl SortType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortType::Newest => "newest",
            SortType::Oldest => "oldest",
            SortType::MostLikes => "mostLikes",
        }
    }

    /// Comparator used for the root comments and for every children list.
    pub fn comparator(self) -> fn(&Comment, &Comment) -> Ordering {
        match self {
            SortType::Newest => newest_first,
            SortType::Oldest => oldest_first,
            SortType::MostLikes => most_likes_first,
        }
    }

    pub fn sort<T: AsRef<Comment>>(self, comments: &mut [T]) {
        let cmp = self.comparator();
        // stable so that equal keys keep the snapshot order
        comments.sort_by(|a, b| cmp(a.as_ref(), b.as_ref()));
    }
}

fn newest_first(a: &Comment, b: &Comment) -> Ordering {
    b.created_at.cmp(&a.created_at)
}

fn oldest_first(a: &Comment, b: &Comment) -> Ordering {
    a.created_at.cmp(&b.created_at)
}

fn most_likes_first(a: &Comment, b: &Comment) -> Ordering {
    b.reaction_count
        .cmp(&a.reaction_count)
        .then_with(|| newest_first(a, b))
}

impl AsRef<Comment> for Comment {
    fn as_ref(&self) -> &Comment {
        self
    }
}

impl FromStr for SortType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "oldest" => SortType::Oldest,
            "most-liked" | "most-reactions" | "mostLikes" => SortType::MostLikes,
            "newest" => SortType::Newest,
            other => {
                tracing::debug!(sort = other, "Unknown sort type, falling back to newest");
                SortType::Newest
            }
        })
    }
}

impl fmt::Display for SortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SortType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(String::deserialize(deserializer)?
            .parse()
            .unwrap_or_default())
    }
}

/// Picks the comments of a thread that have no parent and orders them.
pub fn level_zero_comments(all: &[Comment], thread_id: i32, sort: SortType) -> Vec<Comment> {
    let mut roots: Vec<Comment> = all
        .iter()
        .filter(|c| c.thread_id == thread_id && c.parent_id.is_none())
        .cloned()
        .collect();
    sort.sort(&mut roots);
    roots
}
