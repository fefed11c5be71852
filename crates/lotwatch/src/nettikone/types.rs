//! Wire types of the Nettix machine search API.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemId::Number(n) => write!(f, "{}", n),
            ItemId::Text(s) => write!(f, "{}", s.trim()),
        }
    }
}

/// `make` and `model` arrive either as plain strings or as `{ "id", "name" }`
/// objects depending on `includeMakeModel`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NameRef {
    Plain(String),
    Named { name: String },
}

impl NameRef {
    pub fn name(&self) -> &str {
        match self {
            NameRef::Plain(name) | NameRef::Named { name } => name.trim(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(default)]
    pub small_thumbnail: Option<ImageUrl>,
    #[serde(default)]
    pub medium: Option<ImageUrl>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    pub id: ItemId,
    pub ad_url: String,
    #[serde(default)]
    pub make: Option<NameRef>,
    #[serde(default)]
    pub model: Option<NameRef>,
    #[serde(default)]
    pub model_info: Option<String>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}
