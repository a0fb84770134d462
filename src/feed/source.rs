//! Item source backed by a search-style JSON endpoint.
//!
//! The endpoint is queried with `q=<term>&result_type=mixed&lang=en` and an
//! `authorization: bearer <token>` header. The response carries a `statuses`
//! list; every status becomes one [`RemoteItem`].

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;

use crate::error::FeedError;
use crate::events::feed::{Author, RemoteItem};
use crate::resources::feedconfig::FeedConfig;

/// Produces one batch of remote items per call.
pub trait ItemSource: Send + Sync {
    fn fetch_batch(&self) -> Result<Vec<RemoteItem>, FeedError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    statuses: Vec<Status>,
}

#[derive(Debug, Deserialize)]
struct Status {
    text: String,
    #[serde(default)]
    favorite_count: u64,
    user: User,
}

#[derive(Debug, Deserialize)]
struct User {
    name: String,
    screen_name: String,
    profile_image_url_https: String,
}

impl From<Status> for RemoteItem {
    fn from(status: Status) -> Self {
        RemoteItem {
            author: Author {
                name: status.user.name,
                screen_name: status.user.screen_name,
            },
            favorite_count: status.favorite_count,
            text: status.text,
            image_url: status.user.profile_image_url_https,
        }
    }
}

/// Decode a search response body into items, preserving feed order.
pub fn parse_statuses(body: &str) -> Result<Vec<RemoteItem>, FeedError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| FeedError::Decode(e.to_string()))?;
    Ok(response.statuses.into_iter().map(RemoteItem::from).collect())
}

/// [`ItemSource`] querying the configured search endpoint.
pub struct SearchFeed {
    client: Client,
    endpoint: String,
    search_term: String,
    bearer_token: Option<String>,
}

impl SearchFeed {
    pub fn new(
        endpoint: impl Into<String>,
        search_term: impl Into<String>,
        bearer_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::Http(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            search_term: search_term.into(),
            bearer_token,
        })
    }

    pub fn from_config(config: &FeedConfig) -> Result<Self, FeedError> {
        Self::new(
            config.endpoint.clone(),
            config.search_term.clone(),
            config.bearer_token.clone(),
            config.request_timeout,
        )
    }
}

impl ItemSource for SearchFeed {
    fn fetch_batch(&self) -> Result<Vec<RemoteItem>, FeedError> {
        let token = self
            .bearer_token
            .as_deref()
            .ok_or(FeedError::MissingCredential)?;

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", self.search_term.as_str()),
                ("result_type", "mixed"),
                ("lang", "en"),
            ])
            .header(AUTHORIZATION, format!("bearer {}", token))
            .send()
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let body = response.text().map_err(request_error)?;
        parse_statuses(&body)
    }
}

fn request_error(e: reqwest::Error) -> FeedError {
    if e.is_timeout() {
        FeedError::Timeout
    } else {
        FeedError::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_statuses_in_feed_order() {
        let body = r#"{
            "statuses": [
                {
                    "text": "first",
                    "favorite_count": 3,
                    "user": {
                        "name": "Ada",
                        "screen_name": "ada",
                        "profile_image_url_https": "https://img/ada_normal.png"
                    }
                },
                {
                    "text": "second",
                    "user": {
                        "name": "Bob",
                        "screen_name": "bob",
                        "profile_image_url_https": "https://img/bob_normal.png",
                        "followers_count": 10
                    }
                }
            ],
            "search_metadata": { "count": 2 }
        }"#;

        let items = parse_statuses(body).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].author.screen_name, "ada");
        assert_eq!(items[0].favorite_count, 3);
        assert_eq!(items[1].text, "second");
        assert_eq!(items[1].favorite_count, 0);
        assert_eq!(items[1].image_url, "https://img/bob_normal.png");
    }

    #[test]
    fn missing_statuses_is_an_empty_batch() {
        assert!(parse_statuses("{}").unwrap().is_empty());
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        assert!(matches!(
            parse_statuses("<html>rate limited</html>"),
            Err(FeedError::Decode(_))
        ));
    }

    #[test]
    fn missing_token_fails_before_any_request() {
        let feed = SearchFeed::new(
            "http://127.0.0.1:9/never",
            "rust",
            None,
            Duration::from_millis(50),
        )
        .unwrap();
        assert_eq!(feed.fetch_batch(), Err(FeedError::MissingCredential));
    }
}
