mod parser;
pub mod scraper;

pub use parser::parse_search_page;
pub use scraper::ToriScraper;

pub(crate) const BASE_URL: &str = "https://autot.tori.fi";
pub(crate) const SEARCH_PATH: &str = "/kuljetuskalusto-ja-raskas-kalusto/myydaan";
