use chrono::{DateTime, NaiveDateTime, Utc};

use super::types::{SearchItem, TokenResponse};
use crate::source::{ParseError, collect_entries};
use crate::types::{Listing, Source};

pub fn parse_search_response(json: &str) -> Result<Vec<Listing>, ParseError> {
    let raw: Vec<serde_json::Value> = serde_json::from_str(json)?;

    let results = raw
        .into_iter()
        .map(|value| {
            serde_json::from_value::<SearchItem>(value)
                .map_err(ParseError::from)
                .and_then(listing_from_item)
        })
        .collect();

    collect_entries(Source::Nettikone, results)
}

pub(crate) fn parse_token_response(json: &str) -> Result<String, ParseError> {
    let token: TokenResponse = serde_json::from_str(json)?;
    token
        .access_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ParseError::MissingField("access_token".to_string()))
}

fn listing_from_item(item: SearchItem) -> Result<Listing, ParseError> {
    let id = item.id.to_string();
    if id.is_empty() {
        return Err(ParseError::MissingField("id".to_string()));
    }

    let url = item.ad_url.trim();
    if url.is_empty() {
        return Err(ParseError::MissingField(format!("adUrl of item {}", id)));
    }

    let make = item
        .make
        .as_ref()
        .map(|m| m.name().to_string())
        .filter(|m| !m.is_empty());
    let model = item
        .model
        .as_ref()
        .map(|m| m.name().to_string())
        .filter(|m| !m.is_empty());

    let mut title = [make.as_deref(), model.as_deref(), item.model_info.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if title.is_empty() {
        title = format!("Nettikone #{}", id);
    }
    if let Some(year) = item.year {
        title = format!("{} ({})", title, year);
    }

    let image_url = item
        .images
        .first()
        .and_then(|img| img.small_thumbnail.as_ref().or(img.medium.as_ref()))
        .map(|u| u.url.clone());

    Ok(Listing {
        source: Source::Nettikone,
        id,
        title,
        price: item.price.filter(|p| *p >= 0.0).map(|p| p.round() as u64),
        make,
        model,
        url: url.to_string(),
        details: item.model_info.filter(|s| !s.trim().is_empty()),
        image_url,
        posted_at: item.date_created.as_deref().and_then(parse_timestamp),
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.and_utc()))
        .inspect_err(|e| log::debug!("Unparseable dateCreated '{}': {}", raw, e))
        .ok()
}
