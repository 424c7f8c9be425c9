use serde::Deserialize;

// --- Hashtag search ---

/// Raw `search_hashtag.php` response. Both post lists are optional; the API
/// omits `top_posts` past the first page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HashtagSearchResponse {
    #[serde(default)]
    pub posts: Option<EdgeList>,
    #[serde(default)]
    pub top_posts: Option<EdgeList>,
    #[serde(default)]
    pub pagination_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EdgeList {
    #[serde(default)]
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Edge {
    pub node: Option<PostNode>,
}

/// A single post in a hashtag feed. The owner block usually only carries an
/// id, so the author's username often has to be recovered from the caption.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostNode {
    #[serde(default)]
    pub accessibility_caption: Option<String>,
    #[serde(default)]
    pub owner: Option<PostOwner>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostOwner {
    #[serde(default)]
    pub username: Option<String>,
}

/// One page of hashtag results, posts and top posts merged.
#[derive(Debug, Clone, Default)]
pub struct HashtagPage {
    pub posts: Vec<PostNode>,
    pub next_token: Option<String>,
}

impl HashtagSearchResponse {
    pub fn into_page(self) -> HashtagPage {
        let posts = self
            .posts
            .into_iter()
            .chain(self.top_posts)
            .flat_map(|list| list.edges)
            .filter_map(|edge| edge.node)
            .collect();
        HashtagPage {
            posts,
            next_token: self.pagination_token.filter(|t| !t.is_empty()),
        }
    }
}

// --- Profile hover ---

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileHoverResponse {
    #[serde(default)]
    pub user_data: Option<UserData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub follower_count: u64,
    #[serde(default)]
    pub following_count: u64,
    #[serde(default)]
    pub media_count: u64,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_private: bool,
}

// --- Similar accounts ---

#[derive(Debug, Clone, Deserialize)]
pub struct SimilarAccount {
    #[serde(default)]
    pub username: Option<String>,
}
