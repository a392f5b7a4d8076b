//! Paginated access to a photo-blog feed.
//!
//! [`FeedSource`] is the seam the sync engine talks to; [`ApiFetcher`] implements it on
//! top of the blog API's `posts/photo` endpoint. The wire schema is decoded into private
//! structs and then converted into [`Page`], rejecting photos without size variants.

use crate::config::HttpConfig;
use crate::error::{Error, FetchError, Result};
use crate::types::{Page, Photo, PhotoVariant, Post, PostId};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// Status code the API embeds in `meta.status` for a successful request
const API_STATUS_OK: i64 = 200;

/// Source of feed pages
///
/// Implementations must return posts newest-first: the sync engine relies on that
/// ordering to stop at the watermark.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch up to `limit` posts of `hostname`, skipping the first `offset`
    ///
    /// # Errors
    /// Returns a [`FetchError`] on transport failure, a non-success status, or a
    /// malformed payload. Implementations do not retry.
    async fn fetch_page(
        &self,
        hostname: &str,
        limit: usize,
        offset: usize,
    ) -> std::result::Result<Page, FetchError>;
}

/// [`FeedSource`] backed by the blog HTTP API
pub struct ApiFetcher {
    http_client: reqwest::Client,
    api_base: String,
    api_token: String,
}

impl ApiFetcher {
    /// Create a fetcher for the API at `http.api_base`
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(http: &HttpConfig, api_token: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(http.timeout)
            .user_agent(http.user_agent.clone())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_base: http.api_base.trim_end_matches('/').to_string(),
            api_token: api_token.into(),
        })
    }

    /// `{api_base}/v2/blog/{hostname}/posts/photo?api_key&limit&offset`
    ///
    /// The hostname is pushed as one percent-encoded path segment, so it can never
    /// change the path, query or fragment of the request.
    fn page_url(
        &self,
        hostname: &str,
        limit: usize,
        offset: usize,
    ) -> std::result::Result<url::Url, url::ParseError> {
        let mut url = url::Url::parse(&self.api_base)?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(["v2", "blog", hostname, "posts", "photo"]);
        url.query_pairs_mut()
            .append_pair("api_key", &self.api_token)
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());
        Ok(url)
    }
}

#[async_trait]
impl FeedSource for ApiFetcher {
    async fn fetch_page(
        &self,
        hostname: &str,
        limit: usize,
        offset: usize,
    ) -> std::result::Result<Page, FetchError> {
        let url = self
            .page_url(hostname, limit, offset)
            .map_err(|source| FetchError::InvalidUrl {
                hostname: hostname.to_string(),
                source,
            })?;

        debug!(hostname = %hostname, url = %redact_token(&url), "Fetching feed page");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                hostname: hostname.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                hostname: hostname.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport {
                hostname: hostname.to_string(),
                source,
            })?;

        parse_page(hostname, &body)
    }
}

/// Decode one API response body into a [`Page`]
///
/// The envelope is decoded first so that an error status is reported with its message
/// even when the `response` member has an unexpected shape.
pub fn parse_page(hostname: &str, body: &[u8]) -> std::result::Result<Page, FetchError> {
    let envelope: ApiEnvelope =
        serde_json::from_slice(body).map_err(|source| FetchError::Decode {
            hostname: hostname.to_string(),
            source,
        })?;

    if envelope.meta.status != API_STATUS_OK {
        return Err(FetchError::Api {
            hostname: hostname.to_string(),
            status: envelope.meta.status,
            message: envelope.meta.msg,
        });
    }

    let body: ApiPosts =
        serde_json::from_value(envelope.response).map_err(|source| FetchError::Decode {
            hostname: hostname.to_string(),
            source,
        })?;

    let posts = body
        .posts
        .into_iter()
        .map(|post| {
            let photos = post
                .photos
                .into_iter()
                .map(|photo| {
                    let variants = photo
                        .alt_sizes
                        .into_iter()
                        .map(|size| PhotoVariant {
                            url: size.url,
                            width: size.width as u32,
                            height: size.height as u32,
                        })
                        .collect();
                    Photo::new(variants).ok_or_else(|| FetchError::MalformedPhoto {
                        hostname: hostname.to_string(),
                        post_id: post.id,
                    })
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(Post {
                id: PostId(post.id),
                photos,
            })
        })
        .collect::<std::result::Result<Vec<_>, FetchError>>()?;

    Ok(Page { posts })
}

/// Copy of `url` with the `api_key` query value masked, for logging
fn redact_token(url: &url::Url) -> url::Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            if k == "api_key" {
                (k.into_owned(), "REDACTED".to_string())
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect();

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    meta: ApiMeta,
    #[serde(default)]
    response: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiMeta {
    status: i64,
    #[serde(default)]
    msg: String,
}

#[derive(Debug, Deserialize)]
struct ApiPosts {
    #[serde(default)]
    posts: Vec<ApiPost>,
}

#[derive(Debug, Deserialize)]
struct ApiPost {
    id: i64,
    #[serde(default)]
    photos: Vec<ApiPhoto>,
}

#[derive(Debug, Deserialize)]
struct ApiPhoto {
    #[serde(default)]
    alt_sizes: Vec<ApiPhotoSize>,
}

#[derive(Debug, Deserialize)]
struct ApiPhotoSize {
    url: String,
    #[serde(default)]
    width: f64,
    #[serde(default)]
    height: f64,
}
