use serde::{Deserialize, Serialize};

/// A thread's identity and the metadata learned from its first page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    /// Source thread id
    pub id: u64,

    /// Thread title
    pub title: String,

    /// Number of pages, fixed once page 1 has been read
    pub total_pages: u32,
}

/// Author block attached to a post
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Display name (may carry inline markup such as emoji images)
    pub name: String,

    /// Avatar image URL as it appeared in the page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Forum badge title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,

    /// Forum level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,

    /// Whether this author started the thread
    #[serde(default)]
    pub is_thread_author: bool,
}

/// One top-level contribution to a thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// 1-based index of the page this post was found on
    pub page_index: u32,

    /// Position of the post within its page, in source order
    pub order_index: usize,

    /// Source post id
    pub pid: String,

    /// Floor number shown by the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<u32>,

    pub author: Author,

    /// Post body as HTML
    pub body: String,

    pub timestamp: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_location: Option<String>,

    /// Comments in (sub-page, position) order
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Post {
    /// Document-order sort key
    pub fn order_key(&self) -> (u32, usize) {
        (self.page_index, self.order_index)
    }
}

/// A reply attached to one post
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,

    /// Avatar image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    /// Comment body as HTML
    pub body: String,

    pub timestamp: String,
}
