//! File search: an ordered cascade of strategies.
//!
//! | search type | strategies, in order |
//! |-------------|----------------------|
//! | `content`   | ripgrep              |
//! | `filename`  | find, memory         |
//!
//! The [`SearchEngine`] probes and runs each strategy in turn, skipping
//! unavailable ones and falling through on failure or (except for the last)
//! an empty result. Every result set is deduplicated by path and truncated.

mod engine;
mod error;
mod find;
mod memory;
mod process;
mod ripgrep;
mod strategy;

pub use engine::SearchEngine;
pub use error::{SearchError, SearchResult};
pub use find::FindStrategy;
pub use memory::MemoryStrategy;
pub use ripgrep::RipgrepStrategy;
pub use strategy::SearchStrategy;

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

/// What a search looks at.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumString,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SearchType {
    Filename,
    Content,
}

/// How a hit was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Filename,
    Content,
    Path,
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    /// Base name.
    pub file: String,
    /// Path relative to the search root, `/`-separated.
    pub path: String,
    pub is_directory: bool,
    pub match_type: MatchType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    /// Name of the strategy that produced `results`.
    pub search_strategy: String,
    pub total_results: usize,
}

/// Join the normal components of a relative path with `/`.
pub(crate) fn relative_display(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_type_parse() {
        assert_eq!("filename".parse::<SearchType>().unwrap(), SearchType::Filename);
        assert_eq!("Content".parse::<SearchType>().unwrap(), SearchType::Content);
        assert!("regex".parse::<SearchType>().is_err());
        assert_eq!(SearchType::Content.to_string(), "content");
    }

    #[test]
    fn test_hit_serialization() {
        let hit = SearchHit {
            file: "a.rs".into(),
            path: "src/a.rs".into(),
            is_directory: false,
            match_type: MatchType::Content,
            line: Some(4),
            text: Some("fn main()".into()),
        };
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["isDirectory"], false);
        assert_eq!(json["matchType"], "content");
        assert_eq!(json["line"], 4);

        let bare = SearchHit {
            line: None,
            text: None,
            ..hit
        };
        let json = serde_json::to_value(&bare).unwrap();
        assert!(json.get("line").is_none());
    }

    #[test]
    fn test_relative_display() {
        assert_eq!(relative_display(Path::new("a/b/c.txt")), "a/b/c.txt");
        assert_eq!(relative_display(Path::new("./a")), "a");
    }
}
