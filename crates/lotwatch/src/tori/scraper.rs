use async_trait::async_trait;
use reqwest::{Client, Url};

use super::parser::parse_search_page;
use crate::makes::MakeTable;
use crate::source::{ListingSource, ScraperError};
use crate::types::{Listing, SearchConfig, Source};

/// Scrapes the Tori heavy vehicle search result page.
#[derive(Debug, Clone)]
pub struct ToriScraper {
    client: Client,
    base_url: String,
    known_makes: MakeTable,
}

impl ToriScraper {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: super::BASE_URL.to_string(),
            known_makes: MakeTable::default(),
        }
    }

    /// Make names to recognise in titles besides the searched ones, so that
    /// foreign makes can be filtered out client-side.
    pub fn with_known_makes(mut self, makes: MakeTable) -> Self {
        self.known_makes = makes;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Tori expects the makes comma separated, with dashes for spaces.
    pub fn search_url(&self, search: &SearchConfig) -> Result<Url, url::ParseError> {
        let base = format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            super::SEARCH_PATH
        );

        if search.makes.is_empty() {
            return Url::parse(&base);
        }

        let makes = search
            .makes
            .iter()
            .map(|m| m.trim().replace(' ', "-"))
            .collect::<Vec<_>>()
            .join(",");
        Url::parse_with_params(&base, &[("alusta_2", makes)])
    }

    pub fn parse(&self, html: &str, search: &SearchConfig) -> Result<Vec<Listing>, ScraperError> {
        let candidates: Vec<&str> = search
            .makes
            .iter()
            .map(String::as_str)
            .chain(self.known_makes.entries().iter().map(|e| e.name.as_str()))
            .collect();

        let mut listings = parse_search_page(html, &candidates)?;
        listings.retain(|l| search.matches(l));
        Ok(listings)
    }
}

#[async_trait]
impl ListingSource for ToriScraper {
    fn source(&self) -> Source {
        Source::Tori
    }

    async fn fetch(&self, search: &SearchConfig) -> Result<Vec<Listing>, ScraperError> {
        let url = self.search_url(search)?;
        log::info!("Scraping Tori URL: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?;
        log::debug!("Tori response status code: {}", response.status());

        let html = response
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?;

        self.parse(&html, search)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::makes::MakeEntry;
    use crate::test_server::CannedServer;

    fn scraper() -> ToriScraper {
        ToriScraper::new(Client::new()).with_known_makes(MakeTable::from_entries(vec![
            MakeEntry {
                id: 7,
                name: "Volvo".to_string(),
            },
            MakeEntry {
                id: 52,
                name: "Toyota".to_string(),
            },
        ]))
    }

    #[test]
    fn test_search_url_encodes_makes() {
        let url = scraper()
            .search_url(&SearchConfig::new(["Toyota"]))
            .expect("Failed to build URL");

        assert_eq!(url.host_str(), Some("autot.tori.fi"));
        assert_eq!(url.path(), "/kuljetuskalusto-ja-raskas-kalusto/myydaan");
        let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(params, vec![("alusta_2".to_string(), "Toyota".to_string())]);
        assert!(url.as_str().contains("Toyota"));
    }

    #[test]
    fn test_search_url_joins_and_dashes_makes() {
        let url = scraper()
            .search_url(&SearchConfig::new(["Mercedes Benz", "DAF"]))
            .unwrap();
        let (_, value) = url.query_pairs().next().expect("Should have alusta_2");
        assert_eq!(value, "DAF,Mercedes-Benz");
    }

    #[test]
    fn test_search_url_without_makes_has_no_query() {
        let url = scraper()
            .with_base_url("http://localhost:8080/")
            .search_url(&SearchConfig::default())
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/kuljetuskalusto-ja-raskas-kalusto/myydaan"
        );
    }

    #[test]
    fn test_parse_excludes_foreign_makes() {
        let html = r#"
            <div class="w-full p-2"><a href="/ajoneuvo/11"></a><h2>Toyota Dyna 150</h2></div>
            <div class="w-full p-2"><a href="/ajoneuvo/12"></a><h2>Volvo FL 240</h2></div>
            <div class="w-full p-2"><a href="/ajoneuvo/13"></a><h2>Hiab nosturi</h2></div>
        "#;

        let listings = scraper()
            .parse(html, &SearchConfig::new(["Toyota"]))
            .expect("Failed to parse page");

        let ids: Vec<&str> = listings.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["11", "13"]);
        assert_eq!(listings[0].make.as_deref(), Some("Toyota"));
        assert_eq!(listings[0].model.as_deref(), Some("Dyna 150"));
    }

    #[tokio::test]
    async fn test_fetch_requests_search_page() {
        let html = r#"<div class="w-full p-2"><a href="/ajoneuvo/21"></a><h2>Toyota Hiace</h2></div>"#;
        let server = CannedServer::start(200, html).await;

        let listings = scraper()
            .with_base_url(server.url.clone())
            .fetch(&SearchConfig::new(["Toyota"]))
            .await
            .expect("Fetch should succeed");

        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].id, "21");
        assert!(
            server.requests()[0]
                .starts_with("GET /kuljetuskalusto-ja-raskas-kalusto/myydaan?alusta_2=Toyota ")
        );
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_http_error() {
        let server = CannedServer::start(503, "").await;

        let result = scraper()
            .with_base_url(server.url.clone())
            .fetch(&SearchConfig::new(["Toyota"]))
            .await;
        assert!(matches!(result, Err(ScraperError::HttpError(_))));
    }
}
