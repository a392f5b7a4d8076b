//! Shared test helpers: an in-memory [`FeedSource`] and post builders.

use crate::error::FetchError;
use crate::fetcher::FeedSource;
use crate::queue::{DownloadTask, QueueReceiver};
use crate::types::{Page, Photo, PhotoVariant, Post, PostId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Build a post whose photos have a single variant each
pub(crate) fn post(id: i64, urls: &[&str]) -> Post {
    Post {
        id: PostId(id),
        photos: urls
            .iter()
            .map(|url| {
                Photo::new(vec![PhotoVariant {
                    url: url.to_string(),
                    width: 1280,
                    height: 960,
                }])
                .unwrap()
            })
            .collect(),
    }
}

/// Build a post with one photo named after its id: `https://media.example.com/<id>.jpg`
pub(crate) fn photo_post(id: i64) -> Post {
    post(id, &[&photo_url(id)])
}

/// URL used by [`photo_post`]
pub(crate) fn photo_url(id: i64) -> String {
    format!("https://media.example.com/{id}.jpg")
}

/// Drain everything currently queued (the senders must be dropped first)
pub(crate) async fn drain(rx: &mut QueueReceiver) -> Vec<DownloadTask> {
    let mut tasks = Vec::new();
    while let Some(task) = rx.recv().await {
        tasks.push(task);
    }
    tasks
}

/// A [`FeedSource`] serving fixed post lists sliced by limit/offset
///
/// Each hostname maps to a newest-first post list. Hostnames marked as failing answer
/// every request with an API error. Every request is recorded.
#[derive(Default)]
pub(crate) struct ScriptedSource {
    feeds: Mutex<HashMap<String, Vec<Post>>>,
    failing: Mutex<HashMap<String, usize>>,
    calls: Mutex<Vec<(String, usize, usize)>>,
}

impl ScriptedSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Replace the posts `hostname` serves
    pub(crate) fn set_posts(&self, hostname: &str, posts: Vec<Post>) {
        self.feeds
            .lock()
            .unwrap()
            .insert(hostname.to_string(), posts);
    }

    /// Fail every request for `hostname` whose offset is at least `from_offset`
    pub(crate) fn fail_from(&self, hostname: &str, from_offset: usize) {
        self.failing
            .lock()
            .unwrap()
            .insert(hostname.to_string(), from_offset);
    }

    /// Stop failing requests for `hostname`
    pub(crate) fn heal(&self, hostname: &str) {
        self.failing.lock().unwrap().remove(hostname);
    }

    /// Requests made so far as `(hostname, limit, offset)`
    pub(crate) fn calls(&self) -> Vec<(String, usize, usize)> {
        self.calls.lock().unwrap().clone()
    }

    /// Offsets requested for `hostname`, in order
    pub(crate) fn offsets_for(&self, hostname: &str) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter(|(h, _, _)| h == hostname)
            .map(|(_, _, offset)| offset)
            .collect()
    }
}

#[async_trait]
impl FeedSource for ScriptedSource {
    async fn fetch_page(
        &self,
        hostname: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Page, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((hostname.to_string(), limit, offset));

        if let Some(&from) = self.failing.lock().unwrap().get(hostname)
            && offset >= from
        {
            return Err(FetchError::Api {
                hostname: hostname.to_string(),
                status: 500,
                message: "scripted failure".to_string(),
            });
        }

        let feeds = self.feeds.lock().unwrap();
        let posts = feeds
            .get(hostname)
            .map(|posts| posts.iter().skip(offset).take(limit).cloned().collect())
            .unwrap_or_default();
        Ok(Page { posts })
    }
}
