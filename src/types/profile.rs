use serde::{Deserialize, Serialize};

/// Structured profile scraped from the current page. Produced fresh on every
/// extraction; there is no identity beyond the DOM snapshot it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileRecord {
    pub name: String,
    pub headline: String,
    pub company: String,
    pub location: String,
    pub about: String,
    pub experience: String,
    pub industry: String,
}

impl ProfileRecord {
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("there")
    }
}

/// What a page agent can see of its page: the address and the current DOM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub url: String,
    pub html: String,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }
}
