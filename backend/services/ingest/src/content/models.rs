use std::collections::{BTreeMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::normalize::{lenient_u64, mean, safe_div, top_n_by};

const TOP_POSTS: usize = 10;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

/// A published post (`GET /posts`). Dates are site-local without offset.
#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub id: u64,
    pub date: NaiveDateTime,
    #[serde(default)]
    pub author: Option<u64>,
    #[serde(default)]
    pub categories: Vec<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub comment_count: u64,
    #[serde(default)]
    pub title: Rendered,
    #[serde(default)]
    pub content: Rendered,
}

impl Post {
    pub fn word_count(&self) -> u64 {
        strip_tags(&self.content.rendered).split_whitespace().count() as u64
    }
}

/// Drop anything between `<` and `>` so markup doesn't count as words.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: u64,
    pub title: String,
    pub comments: u64,
    pub words: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMetrics {
    pub posts_published: u64,
    pub total_comments: u64,
    pub total_words: u64,
    pub unique_authors: u64,
    pub categories_used: u64,
    pub average_comments_per_post: f64,
    pub top_posts: Vec<PostSummary>,
}

impl ContentMetrics {
    /// `None` when nothing was published. `average_comments_per_post` is
    /// computed per publish day and averaged over days with posts.
    pub fn from_posts(posts: &[Post]) -> Option<Self> {
        if posts.is_empty() {
            return None;
        }

        let mut days: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();
        let mut authors = HashSet::new();
        let mut categories = HashSet::new();

        for post in posts {
            let day = days.entry(post.date.date()).or_default();
            day.0 += 1;
            day.1 += post.comment_count;
            if let Some(author) = post.author {
                authors.insert(author);
            }
            categories.extend(post.categories.iter().copied());
        }

        let summaries: Vec<PostSummary> = posts
            .iter()
            .map(|p| PostSummary {
                id: p.id,
                title: p.title.rendered.clone(),
                comments: p.comment_count,
                words: p.word_count(),
            })
            .collect();

        Some(Self {
            posts_published: posts.len() as u64,
            total_comments: posts.iter().map(|p| p.comment_count).sum(),
            total_words: summaries.iter().map(|s| s.words).sum(),
            unique_authors: authors.len() as u64,
            categories_used: categories.len() as u64,
            average_comments_per_post: mean(
                days.values().map(|(count, comments)| safe_div(*comments as f64, *count as f64)),
            ),
            top_posts: top_n_by(summaries, TOP_POSTS, |p| p.comments as f64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(
        id: u64,
        date: &str,
        author: u64,
        categories: &[u64],
        comments: u64,
        html: &str,
    ) -> Post {
        serde_json::from_value(json!({
            "id": id,
            "date": date,
            "author": author,
            "categories": categories,
            "comment_count": comments,
            "title": { "rendered": format!("Post {id}") },
            "content": { "rendered": html },
        }))
        .unwrap()
    }

    #[test]
    fn counts_words_without_markup() {
        let p = post(1, "2026-04-15T10:00:00", 1, &[], 0, "<p>Hello <b>big</b> world</p>");
        assert_eq!(p.word_count(), 3);
    }

    #[test]
    fn adjacent_tags_do_not_glue_words() {
        let p = post(1, "2026-04-15T10:00:00", 1, &[], 0, "one<br>two");
        assert_eq!(p.word_count(), 2);
    }

    #[test]
    fn summarizes_posts() {
        let posts = vec![
            post(1, "2026-04-15T08:00:00", 1, &[3, 4], 6, "<p>a b c</p>"),
            post(2, "2026-04-15T09:00:00", 2, &[4], 2, "<p>d e</p>"),
            post(3, "2026-04-15T10:00:00", 1, &[], 6, ""),
        ];
        let m = ContentMetrics::from_posts(&posts).unwrap();
        assert_eq!(m.posts_published, 3);
        assert_eq!(m.total_comments, 14);
        assert_eq!(m.total_words, 5);
        assert_eq!(m.unique_authors, 2);
        assert_eq!(m.categories_used, 2);
        let top: Vec<_> = m.top_posts.iter().map(|p| p.id).collect();
        assert_eq!(top, vec![1, 3, 2]);
    }

    #[test]
    fn average_comments_over_publish_days() {
        let posts = vec![
            post(1, "2026-04-01T08:00:00", 1, &[], 10, ""),
            post(2, "2026-04-03T08:00:00", 1, &[], 1, ""),
            post(3, "2026-04-03T09:00:00", 1, &[], 3, ""),
        ];
        let m = ContentMetrics::from_posts(&posts).unwrap();
        // mean(10 / 1, 4 / 2)
        assert_eq!(m.average_comments_per_post, 6.0);
    }

    #[test]
    fn no_posts_is_none() {
        assert!(ContentMetrics::from_posts(&[]).is_none());
    }
}
