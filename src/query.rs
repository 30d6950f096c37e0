use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::validate::ValidationError;

static DATE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));

/// Structured filters appended to a free-text search as `key:value` modifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub scope: Option<String>,
    pub in_channel: Option<String>,
    pub from_user: Option<String>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub has_link: bool,
    pub has_reaction: bool,
    pub has_pin: bool,
    pub file_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    All,
    Public,
    Private,
    Dm,
    Mpim,
}

impl SearchScope {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "all" => Ok(SearchScope::All),
            "public" => Ok(SearchScope::Public),
            "private" => Ok(SearchScope::Private),
            "dm" => Ok(SearchScope::Dm),
            "mpim" => Ok(SearchScope::Mpim),
            other => Err(ValidationError::Scope(other.to_string())),
        }
    }

    /// Slack's `in:` shorthand for the scope; `all` adds no restriction.
    pub fn modifier(self) -> Option<&'static str> {
        match self {
            SearchScope::All => None,
            SearchScope::Public => Some("in:channels"),
            SearchScope::Private => Some("in:groups"),
            SearchScope::Dm => Some("in:dms"),
            SearchScope::Mpim => Some("in:mpims"),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

pub fn validate_date(value: &str) -> Result<(), ValidationError> {
    if DATE_REGEX.is_match(value) && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
        Ok(())
    } else {
        Err(ValidationError::Date(value.to_string()))
    }
}

impl QueryOptions {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(scope) = non_empty(&self.scope) {
            SearchScope::parse(scope)?;
        }
        if let Some(after) = non_empty(&self.after) {
            validate_date(after)?;
        }
        if let Some(before) = non_empty(&self.before) {
            validate_date(before)?;
        }
        Ok(())
    }

    fn modifiers(&self) -> Result<Vec<String>, ValidationError> {
        let mut modifiers = Vec::new();

        if let Some(scope) = non_empty(&self.scope)
            && let Some(modifier) = SearchScope::parse(scope)?.modifier()
        {
            modifiers.push(modifier.to_string());
        }
        if let Some(channel) = non_empty(&self.in_channel) {
            modifiers.push(format!("in:{}", channel.trim_start_matches('#')));
        }
        if let Some(user) = non_empty(&self.from_user) {
            modifiers.push(format!("from:@{}", user.trim_start_matches('@')));
        }
        if let Some(after) = non_empty(&self.after) {
            validate_date(after)?;
            modifiers.push(format!("after:{after}"));
        }
        if let Some(before) = non_empty(&self.before) {
            validate_date(before)?;
            modifiers.push(format!("before:{before}"));
        }
        if self.has_link {
            modifiers.push("has:link".to_string());
        }
        if self.has_reaction {
            modifiers.push("has:reaction".to_string());
        }
        if self.has_pin {
            modifiers.push("has:pin".to_string());
        }
        if let Some(file_type) = non_empty(&self.file_type) {
            modifiers.push(format!("type:{file_type}"));
        }

        Ok(modifiers)
    }
}

/// Joins the free text and the option modifiers with single spaces.
pub fn build_query(text: &str, options: &QueryOptions) -> Result<String, ValidationError> {
    let modifiers = options.modifiers()?;
    if modifiers.is_empty() {
        return Ok(text.to_string());
    }

    let text = text.trim();
    let mut parts = Vec::with_capacity(modifiers.len() + 1);
    if !text.is_empty() {
        parts.push(text.to_string());
    }
    parts.extend(modifiers);
    Ok(parts.join(" "))
}
