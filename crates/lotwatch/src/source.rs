use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::types::{Listing, SearchConfig, Source};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Malformed JSON response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("None of the {0} entries on the page could be parsed")]
    NoEntries(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Invalid search URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// One marketplace that can be searched for listings.
#[async_trait]
pub trait ListingSource: Send + Sync {
    fn source(&self) -> Source;

    /// Fetches the current first page of results matching `search`.
    async fn fetch(&self, search: &SearchConfig) -> Result<Vec<Listing>, ScraperError>;
}

pub fn http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(format!(
            "{}/{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ))
        .build()
}

/// Keeps the entries that parsed, logging the rest.
///
/// Fails only when there were raw entries and every one of them was rejected.
pub(crate) fn collect_entries<T>(
    source: Source,
    results: Vec<Result<T, ParseError>>,
) -> Result<Vec<T>, ParseError> {
    let total = results.len();
    let mut parsed = Vec::with_capacity(total);

    for result in results {
        match result {
            Ok(item) => parsed.push(item),
            Err(e) => log::warn!("Skipping malformed {} entry: {}", source, e),
        }
    }

    if total > 0 && parsed.is_empty() {
        return Err(ParseError::NoEntries(total));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_entries_keeps_partial_success() {
        let results = vec![
            Ok(1),
            Err(ParseError::MissingField("link".to_string())),
            Ok(3),
        ];
        let parsed = collect_entries(Source::Tori, results).expect("partial page should pass");
        assert_eq!(parsed, vec![1, 3]);
    }

    #[test]
    fn test_collect_entries_fails_when_nothing_parses() {
        let results: Vec<Result<u8, _>> = vec![
            Err(ParseError::MissingField("title".to_string())),
            Err(ParseError::MissingField("link".to_string())),
        ];
        assert!(matches!(
            collect_entries(Source::Tori, results),
            Err(ParseError::NoEntries(2))
        ));
    }

    #[test]
    fn test_collect_entries_accepts_empty_page() {
        let results: Vec<Result<u8, ParseError>> = Vec::new();
        assert!(collect_entries(Source::Nettikone, results).unwrap().is_empty());
    }
}
