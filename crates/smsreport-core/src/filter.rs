//! Message content filter shared by the report pipeline and the fetch workers.

use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};

/// A prepared body filter. Built once, applied per message.
#[derive(Debug, Clone)]
pub enum MessageFilter {
    /// Case-insensitive substring containment.
    Contains(String),
    /// Case-insensitive regex search.
    Pattern(Regex),
}

impl MessageFilter {
    /// Prepare a filter. Empty text means "no filter".
    pub fn prepare(text: &str, use_regex: bool) -> Result<Option<Self>> {
        if text.is_empty() {
            return Ok(None);
        }
        if use_regex {
            let re = RegexBuilder::new(text)
                .case_insensitive(true)
                .build()
                .map_err(|e| Error::Config(format!("invalid filter pattern: {}", e)))?;
            return Ok(Some(Self::Pattern(re)));
        }
        Ok(Some(Self::Contains(text.to_lowercase())))
    }

    /// Whether a message body passes. Empty bodies never pass.
    pub fn matches(&self, body: &str) -> bool {
        if body.is_empty() {
            return false;
        }
        match self {
            Self::Contains(needle) => body.to_lowercase().contains(needle.as_str()),
            Self::Pattern(re) => re.is_match(body),
        }
    }

    /// Short label for logs.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Contains(_) => "text",
            Self::Pattern(_) => "regex",
        }
    }
}

/// Apply an optional filter; `None` lets everything through.
pub fn passes(filter: Option<&MessageFilter>, body: &str) -> bool {
    filter.map_or(true, |f| f.matches(body))
}
