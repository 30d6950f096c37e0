use std::fmt;

use clap::ValueEnum;

use super::models::SearchResult;
use super::{SlackClient, SlackError};
use crate::validate::ValidationError;

pub const MAX_COUNT: u32 = 100;
pub const MAX_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Messages,
    Files,
    All,
}

impl SearchKind {
    fn method(self) -> &'static str {
        match self {
            SearchKind::Messages => "search.messages",
            SearchKind::Files => "search.files",
            SearchKind::All => "search.all",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SortOrder {
    #[default]
    Score,
    Timestamp,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortOrder::Score => "score",
            SortOrder::Timestamp => "timestamp",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        })
    }
}

/// Page-based search parameters; `query` is already assembled.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub count: u32,
    pub page: u32,
    pub sort: SortOrder,
    pub sort_dir: SortDirection,
    pub highlight: bool,
    pub include_bots: bool,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            count: 20,
            page: 1,
            sort: SortOrder::default(),
            sort_dir: SortDirection::default(),
            highlight: false,
            include_bots: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=MAX_COUNT).contains(&self.count) {
            return Err(ValidationError::Input(format!(
                "invalid count {}: must be between 1 and {MAX_COUNT}",
                self.count
            )));
        }
        if !(1..=MAX_PAGE).contains(&self.page) {
            return Err(ValidationError::Input(format!(
                "invalid page {}: must be between 1 and {MAX_PAGE}",
                self.page
            )));
        }
        if self.query.trim().is_empty() {
            return Err(ValidationError::Input("search query cannot be empty".to_string()));
        }
        Ok(())
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("query", self.query.clone()),
            ("count", self.count.to_string()),
            ("page", self.page.to_string()),
            ("sort", self.sort.to_string()),
            ("sort_dir", self.sort_dir.to_string()),
        ];
        if self.highlight {
            params.push(("highlight", "true".to_string()));
        }
        if self.include_bots {
            params.push(("search_exclude_bots", "false".to_string()));
        }
        params
    }
}

impl SlackClient {
    /// Requires a user token; Slack rejects bot tokens with `not_allowed_token_type`.
    pub async fn search(
        &self,
        kind: SearchKind,
        request: &SearchRequest,
    ) -> Result<SearchResult, SlackError> {
        request.validate()?;
        self.get(kind.method(), &request.params()).await
    }
}
