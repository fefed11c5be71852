use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::source::{ParseError, collect_entries};
use crate::types::{Listing, Source};
use crate::utils::{make_prefix, normalize_whitespace};

static SEL_CARD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.w-full.p-2").expect("invalid selector: card"));
static SEL_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2").expect("invalid selector: title"));
static SEL_PRICE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"p[class*="subtitle2"]"#).expect("invalid selector: price")
});
static SEL_DETAILS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.text-gray-dark").expect("invalid selector: details"));
static SEL_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[class*="adCard_anchor"][href]"#).expect("invalid selector: link")
});
static SEL_ANY_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("invalid selector: any link"));
static SEL_IMAGE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"img[class*="adCardImageCarousel_image"][src]"#)
        .expect("invalid selector: image")
});

static RE_PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d\s]*").expect("invalid regex: price"));

fn elem_text(element: ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

fn first_text(card: ElementRef, selector: &Selector) -> Option<String> {
    card.select(selector)
        .next()
        .map(elem_text)
        .filter(|t| !t.is_empty())
}

/// Parses a result page. Makes are recognised from the start of each title
/// using `known_makes`.
pub fn parse_search_page(html: &str, known_makes: &[&str]) -> Result<Vec<Listing>, ParseError> {
    let document = Html::parse_document(html);

    let results = document
        .select(&SEL_CARD)
        .map(|card| parse_card(card, known_makes))
        .collect();

    collect_entries(Source::Tori, results)
}

fn parse_card(card: ElementRef, known_makes: &[&str]) -> Result<Listing, ParseError> {
    let href = card
        .select(&SEL_LINK)
        .next()
        .or_else(|| card.select(&SEL_ANY_LINK).next())
        .and_then(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ParseError::MissingField("link".to_string()))?;

    let title = first_text(card, &SEL_TITLE)
        .ok_or_else(|| ParseError::MissingField(format!("title of {}", href)))?;

    let make = make_prefix(&title, known_makes.iter().copied()).map(str::to_string);
    let model = make
        .as_ref()
        .and_then(|m| title.trim_start().get(m.len()..))
        .map(str::trim)
        .filter(|rest| !rest.is_empty())
        .map(str::to_string);

    let image_url = card
        .select(&SEL_IMAGE)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(|src| src.trim().to_string());

    Ok(Listing {
        source: Source::Tori,
        id: listing_id(href),
        price: first_text(card, &SEL_PRICE).and_then(|p| parse_price(&p)),
        make,
        model,
        url: absolute_url(href),
        details: first_text(card, &SEL_DETAILS),
        image_url,
        posted_at: None,
        title,
    })
}

/// Final path segment when it is a numeric ad id, otherwise the whole path.
fn listing_id(href: &str) -> String {
    let path = href
        .split(['?', '#'])
        .next()
        .unwrap_or(href)
        .trim_end_matches('/');
    let path = path
        .strip_prefix(super::BASE_URL)
        .unwrap_or(path);

    match path.rsplit('/').next() {
        Some(last) if !last.is_empty() && last.bytes().all(|b| b.is_ascii_digit()) => {
            last.to_string()
        }
        _ => path.to_string(),
    }
}

fn absolute_url(href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{}/{}", super::BASE_URL, href.trim_start_matches('/'))
    }
}

/// `"12 500 €"` -> `12500`. Decimals after a comma are dropped.
fn parse_price(text: &str) -> Option<u64> {
    let number = RE_PRICE.find(text)?;
    let digits: String = number
        .as_str()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
