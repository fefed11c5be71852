use async_trait::async_trait;
use reqwest::Client;

use super::parser::{parse_search_response, parse_token_response};
use crate::makes::MakeTable;
use crate::source::{ListingSource, ScraperError};
use crate::types::{Listing, SearchConfig, Source};

pub const DEFAULT_ROWS: u32 = 30;

/// Searches the Nettix machine API for machines that are for sale.
#[derive(Debug, Clone)]
pub struct NettikoneScraper {
    client: Client,
    base_url: String,
    access_token: String,
    makes: MakeTable,
    rows: u32,
}

impl NettikoneScraper {
    pub fn new(client: Client, access_token: impl Into<String>, makes: MakeTable) -> Self {
        Self {
            client,
            base_url: super::API_URL.to_string(),
            access_token: access_token.into(),
            makes,
            rows: DEFAULT_ROWS,
        }
    }

    pub fn with_rows(mut self, rows: u32) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Exchanges account credentials for an API access token.
    pub async fn request_access_token(
        client: &Client,
        username: &str,
        password: &str,
    ) -> Result<String, ScraperError> {
        Self::request_access_token_from(client, super::AUTH_URL, username, password).await
    }

    pub(crate) async fn request_access_token_from(
        client: &Client,
        auth_url: &str,
        username: &str,
        password: &str,
    ) -> Result<String, ScraperError> {
        log::info!("Requesting Nettikone API token...");
        let response = client
            .post(auth_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("username", username),
                ("password", password),
            ])
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?;

        let status = response.status();
        log::info!("Nettikone API token response status code: {}", status);
        if !status.is_success() {
            return Err(ScraperError::Auth(format!(
                "token endpoint answered {}",
                status
            )));
        }

        let body = response.text().await?;
        parse_token_response(&body)
            .map_err(|e| ScraperError::Auth(format!("no usable token in reply: {}", e)))
    }

    pub fn search_query(&self, search: &SearchConfig) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("page", "1".to_string()),
            ("rows", self.rows.to_string()),
            ("status", "forsale".to_string()),
            ("categories", "1".to_string()),
            ("categories", "2".to_string()),
            ("sortBy", "dateCreated".to_string()),
            ("sortOrder", "desc".to_string()),
            ("includeMakeModel", "true".to_string()),
        ];

        let ids = self.makes.ids_for(&search.makes);
        if ids.is_empty() && !search.makes.is_empty() {
            log::warn!("None of the configured makes have a Nettikone ID, searching all makes");
        }
        query.extend(ids.into_iter().map(|id| ("make", id.to_string())));

        query
    }
}

#[async_trait]
impl ListingSource for NettikoneScraper {
    fn source(&self) -> Source {
        Source::Nettikone
    }

    async fn fetch(&self, search: &SearchConfig) -> Result<Vec<Listing>, ScraperError> {
        let query = self.search_query(search);
        log::info!("Fetching Nettikone listings ({} rows)...", self.rows);

        let response = self
            .client
            .get(&self.base_url)
            .header("X-Access-Token", &self.access_token)
            .query(&query)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?;
        log::debug!("Nettikone API response status code: {}", response.status());

        let body = response
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?;

        let mut listings = parse_search_response(&body)?;
        listings.retain(|l| search.matches(l));
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::makes::MakeEntry;
    use crate::test_server::CannedServer;

    const SEARCH_BODY: &str = r#"[
        {"id": 11, "adUrl": "https://www.nettikone.com/volvo/fh/11", "make": "Volvo", "model": "FH"},
        {"id": 12, "adUrl": "https://www.nettikone.com/sisu/polar/12", "make": "Sisu", "model": "Polar"}
    ]"#;

    fn scraper() -> NettikoneScraper {
        let makes = MakeTable::from_entries(vec![
            MakeEntry {
                id: 7,
                name: "Volvo".to_string(),
            },
            MakeEntry {
                id: 44,
                name: "Scania".to_string(),
            },
        ]);
        NettikoneScraper::new(Client::new(), "token", makes).with_rows(20)
    }

    #[test]
    fn test_search_query_encodes_make_ids() {
        let search = SearchConfig::new(["Scania", "Volvo", "Sisu"]);
        let query = scraper().search_query(&search);

        let makes: Vec<&str> = query
            .iter()
            .filter(|(k, _)| *k == "make")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(makes, vec!["44", "7"]);
        assert!(query.contains(&("rows", "20".to_string())));
        assert!(query.contains(&("status", "forsale".to_string())));
        assert!(query.contains(&("sortOrder", "desc".to_string())));
    }

    #[test]
    fn test_search_query_without_known_makes_has_no_make_param() {
        let query = scraper().search_query(&SearchConfig::new(["Sisu"]));
        assert!(query.iter().all(|(k, _)| *k != "make"));
    }

    #[tokio::test]
    async fn test_fetch_sends_token_and_keeps_matching_listings() {
        let server = CannedServer::start(200, SEARCH_BODY).await;
        let scraper = scraper().with_base_url(format!("{}/rest/machine/search", server.url));

        let listings = scraper
            .fetch(&SearchConfig::new(["Volvo"]))
            .await
            .expect("Fetch should succeed");

        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].id, "11");
        assert_eq!(listings[0].make.as_deref(), Some("Volvo"));

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        let request = requests[0].to_lowercase();
        assert!(request.starts_with("get /rest/machine/search?"));
        assert!(request.contains("x-access-token: token"));
        assert!(request.contains("make=7"));
        assert!(request.contains("sortorder=desc"));
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_http_error() {
        for status in [401, 500] {
            let server = CannedServer::start(status, r#"{"error": "nope"}"#).await;
            let scraper = scraper().with_base_url(server.url.clone());

            let result = scraper.fetch(&SearchConfig::new(["Volvo"])).await;
            match result {
                Err(ScraperError::HttpError(e)) => {
                    assert_eq!(e.status().map(|s| s.as_u16()), Some(status));
                }
                other => panic!("Expected HttpError for {}, got {:?}", status, other),
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_non_array_body_is_parse_error() {
        let server = CannedServer::start(200, r#"{"message": "maintenance"}"#).await;
        let scraper = scraper().with_base_url(server.url.clone());

        let result = scraper.fetch(&SearchConfig::new(["Volvo"])).await;
        assert!(matches!(result, Err(ScraperError::ParseError(_))));
    }

    #[tokio::test]
    async fn test_token_exchange_posts_credentials() {
        let server = CannedServer::start(200, r#"{"access_token": "abc123"}"#).await;

        let token = NettikoneScraper::request_access_token_from(
            &Client::new(),
            &server.url,
            "user",
            "pass",
        )
        .await
        .expect("Token exchange should succeed");
        assert_eq!(token, "abc123");

        let request = server.requests()[0].to_lowercase();
        assert!(request.starts_with("post / "));
        assert!(request.contains("application/x-www-form-urlencoded"));
        assert!(request.contains("grant_type=client_credentials"));
        assert!(request.contains("username=user"));
        assert!(request.contains("password=pass"));
    }

    #[tokio::test]
    async fn test_token_exchange_failures_are_auth_errors() {
        let rejected = CannedServer::start(401, r#"{"error": "invalid_client"}"#).await;
        let result =
            NettikoneScraper::request_access_token_from(&Client::new(), &rejected.url, "u", "p")
                .await;
        assert!(matches!(result, Err(ScraperError::Auth(_))));

        let garbled = CannedServer::start(200, r#"{"token_type": "bearer"}"#).await;
        let result =
            NettikoneScraper::request_access_token_from(&Client::new(), &garbled.url, "u", "p")
                .await;
        assert!(matches!(result, Err(ScraperError::Auth(_))));
    }
}
