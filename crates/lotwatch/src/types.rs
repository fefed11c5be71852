use std::collections::BTreeSet;
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
#[error("Invalid source '{0}'. Accepted values: 'nettikone', 'tori'")]
pub struct SourceParseError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Nettikone,
    Tori,
}

impl Source {
    /// Key component persisted in the seen store. Must never change.
    pub fn slug(&self) -> &'static str {
        match self {
            Source::Nettikone => "nettikone",
            Source::Tori => "tori",
        }
    }
}

impl FromStr for Source {
    type Err = SourceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nettikone" | "nettix" => Ok(Source::Nettikone),
            "tori" => Ok(Source::Tori),
            _ => Err(SourceParseError(s.to_string())),
        }
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Nettikone => write!(f, "Nettikone"),
            Source::Tori => write!(f, "Tori"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub source: Source,
    pub id: String,
    pub title: String,
    /// Asking price in whole euros.
    pub price: Option<u64>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub url: String,
    pub details: Option<String>,
    pub image_url: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
}

impl Listing {
    pub fn new(
        source: Source,
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            source,
            id: id.into(),
            title: title.into(),
            price: None,
            make: None,
            model: None,
            url: url.into(),
            details: None,
            image_url: None,
            posted_at: None,
        }
    }

    pub fn price_label(&self) -> String {
        match self.price {
            Some(price) => format!("{} €", price),
            None => "N/A".to_string(),
        }
    }
}

impl Display for Listing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} - {} ({})",
            self.source,
            self.title,
            self.price_label(),
            self.url
        )
    }
}

/// What to look for. Fixed for the lifetime of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchConfig {
    pub makes: BTreeSet<String>,
    pub models: BTreeSet<String>,
}

impl SearchConfig {
    pub fn new<I, S>(makes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            makes: makes.into_iter().map(Into::into).collect(),
            models: BTreeSet::new(),
        }
    }

    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    /// Client-side guard applied by every scraper before returning.
    ///
    /// A listing with an unknown make passes, since both sources already
    /// filter by make in the query. Model filters match against the model
    /// and the title.
    pub fn matches(&self, listing: &Listing) -> bool {
        if !self.makes.is_empty()
            && let Some(make) = &listing.make
            && !self.makes.iter().any(|m| m.eq_ignore_ascii_case(make.trim()))
        {
            return false;
        }

        if self.models.is_empty() {
            return true;
        }

        let haystacks = [listing.model.as_deref(), Some(listing.title.as_str())];
        self.models.iter().any(|wanted| {
            let wanted = wanted.to_lowercase();
            haystacks
                .iter()
                .flatten()
                .any(|h| h.to_lowercase().contains(&wanted))
        })
    }
}
