pub mod config;
pub mod makes;
pub mod nettikone;
pub mod notify;
pub mod source;
pub mod store;
pub mod tori;
pub mod types;
pub mod utils;
pub mod watcher;

#[cfg(test)]
mod test_server;

pub use config::Config;
pub use notify::{DiscordNotifier, Notifier};
pub use source::{ListingSource, ScraperError};
pub use store::SeenStore;
pub use types::{Listing, SearchConfig, Source};
pub use watcher::{CycleReport, Watcher};
