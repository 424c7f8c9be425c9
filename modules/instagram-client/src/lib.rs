pub mod caption;
pub mod error;
pub mod types;

pub use caption::caption_candidates;
pub use error::{InstagramError, Result};
pub use types::{HashtagPage, PostNode, SimilarAccount, UserData};

use std::time::Duration;

use serde::de::DeserializeOwned;
use types::{HashtagSearchResponse, ProfileHoverResponse};

const BASE_URL: &str = "https://instagram-scraper-stable-api.p.rapidapi.com";

/// RapidAPI host header value for the stable scraper API.
pub const DEFAULT_API_HOST: &str = "instagram-scraper-stable-api.p.rapidapi.com";

/// Upper bound on any single request; callers usually impose a tighter one.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct InstagramClient {
    client: reqwest::Client,
    api_key: String,
    api_host: String,
    base_url: String,
}

impl InstagramClient {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_host(api_key, DEFAULT_API_HOST.to_string())
    }

    pub fn with_host(api_key: String, api_host: String) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            api_host,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Point the client at a different base URL (staging or a local stub).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Public profile URL for a username.
    pub fn profile_url(username: &str) -> String {
        format!("https://instagram.com/{username}")
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", &self.api_host)
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(InstagramError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch one page of a hashtag feed. Pass the previous page's token to continue.
    pub async fn search_hashtag(
        &self,
        hashtag: &str,
        pagination_token: Option<&str>,
    ) -> Result<HashtagPage> {
        let hashtag = hashtag.trim_start_matches('#');
        let mut query = vec![("hashtag", hashtag)];
        if let Some(token) = pagination_token {
            query.push(("pagination_token", token));
        }

        let resp: HashtagSearchResponse = self.get_json("search_hashtag.php", &query).await?;
        let page = resp.into_page();
        tracing::debug!(
            hashtag,
            posts = page.posts.len(),
            has_next = page.next_token.is_some(),
            "Fetched hashtag page"
        );
        Ok(page)
    }

    /// Profile summary via the hover-card endpoint.
    pub async fn profile(&self, username: &str) -> Result<UserData> {
        let resp: ProfileHoverResponse = self
            .get_json("ig_get_fb_profile_hover.php", &[("username_or_url", username)])
            .await?;
        resp.user_data
            .ok_or_else(|| InstagramError::ProfileUnavailable(username.to_string()))
    }

    /// Accounts Instagram considers similar to `username`, at most `max`.
    /// A non-list response is treated as "no suggestions".
    pub async fn similar_accounts(&self, username: &str, max: usize) -> Result<Vec<String>> {
        let value: serde_json::Value = self
            .get_json("get_ig_similar_accounts.php", &[("username_or_url", username)])
            .await?;

        let serde_json::Value::Array(items) = value else {
            tracing::debug!(username, "Similar accounts response was not a list");
            return Ok(Vec::new());
        };

        let usernames = items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<SimilarAccount>(item).ok())
            .filter_map(|acc| acc.username.filter(|u| !u.is_empty()))
            .take(max)
            .collect();
        Ok(usernames)
    }
}
