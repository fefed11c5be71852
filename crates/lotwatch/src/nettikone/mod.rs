mod parser;
pub mod scraper;
pub mod types;

pub use parser::parse_search_response;
pub use scraper::NettikoneScraper;

pub(crate) const API_URL: &str = "https://api.nettix.fi/rest/machine/search";
pub(crate) const AUTH_URL: &str = "https://auth.nettix.fi/oauth2/token";
