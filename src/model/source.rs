//! Source: one entity to be monitored.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What kind of entity a source is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Website,
    RssFeed,
    SocialPlatform,
    GithubRepo,
    Company,
    SecFiling,
    NewsOutlet,
    Other,
}

impl SourceType {
    /// The wire name, as the model emits it.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Website => "website",
            Self::RssFeed => "rss_feed",
            Self::SocialPlatform => "social_platform",
            Self::GithubRepo => "github_repo",
            Self::Company => "company",
            Self::SecFiling => "sec_filing",
            Self::NewsOutlet => "news_outlet",
            Self::Other => "other",
        }
    }

    /// Parse a wire name. Unrecognized names fall back to `Other`.
    pub fn from_wire(name: &str) -> Self {
        match name {
            "website" => Self::Website,
            "rss_feed" => Self::RssFeed,
            "social_platform" => Self::SocialPlatform,
            "github_repo" => Self::GithubRepo,
            "company" => Self::Company,
            "sec_filing" => Self::SecFiling,
            "news_outlet" => Self::NewsOutlet,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One monitored entity.
///
/// Sources carry no identity: two sources with the same name and URL
/// are still two entries in a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(rename = "type")]
    pub kind: SourceType,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Source {
    pub fn new(kind: SourceType, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            url: None,
            description: None,
        }
    }

    /// Leniently read a source from a model-supplied JSON value.
    ///
    /// Returns `None` when there is no usable name; a kept name is trimmed.
    /// A missing or unknown `type` becomes `Other`; non-string optional
    /// fields are dropped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let name = value.get("name")?.as_str()?.trim();
        if name.is_empty() {
            return None;
        }
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .map_or(SourceType::Other, SourceType::from_wire);
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(String::from);

        Some(Self {
            url: text("url"),
            description: text("description"),
            ..Self::new(kind, name)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn serializes_type_in_snake_case() {
        let source = Source::new(SourceType::NewsOutlet, "TechCrunch");
        let json = serde_json::to_value(&source).unwrap();

        assert_eq!(json, json!({ "type": "news_outlet", "name": "TechCrunch" }));
    }

    #[test]
    fn from_value_reads_all_fields() {
        let source = Source::from_value(&json!({
            "type": "rss_feed",
            "name": "Hacker News",
            "url": "https://news.ycombinator.com/rss",
            "description": "Front page"
        }))
        .unwrap();

        assert_eq!(source.kind, SourceType::RssFeed);
        assert_eq!(source.name, "Hacker News");
        assert_eq!(
            source.url.as_deref(),
            Some("https://news.ycombinator.com/rss")
        );
        assert_eq!(source.description.as_deref(), Some("Front page"));
    }

    #[test]
    fn from_value_maps_unknown_type_to_other() {
        let source = Source::from_value(&json!({ "type": "podcast", "name": "Acquired" })).unwrap();
        assert_eq!(source.kind, SourceType::Other);

        let source = Source::from_value(&json!({ "name": "Acquired" })).unwrap();
        assert_eq!(source.kind, SourceType::Other);
    }

    #[test]
    fn from_value_requires_a_name() {
        assert!(Source::from_value(&json!({ "type": "website" })).is_none());
        assert!(Source::from_value(&json!({ "type": "website", "name": "  " })).is_none());
        assert!(Source::from_value(&json!({ "type": "website", "name": 7 })).is_none());
    }

    #[test]
    fn from_value_trims_the_name() {
        let source = Source::from_value(&json!({ "type": "company", "name": "  Acme " })).unwrap();
        assert_eq!(source.name, "Acme");
    }

    #[test]
    fn urls_are_not_validated() {
        let source =
            Source::from_value(&json!({ "type": "website", "name": "Acme", "url": "not a url" }))
                .unwrap();
        assert_eq!(source.url.as_deref(), Some("not a url"));
    }
}
