use crate::types::{Listing, Source};

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Longest candidate make that `title` starts with as a whole word,
/// compared case-insensitively.
pub fn make_prefix<'a, I>(title: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let title = title.trim_start().to_lowercase();
    candidates
        .into_iter()
        .filter(|make| {
            let make = make.trim().to_lowercase();
            !make.is_empty()
                && title.starts_with(&make)
                && title[make.len()..]
                    .chars()
                    .next()
                    .is_none_or(|c| !c.is_alphanumeric())
        })
        .max_by_key(|make| make.trim().len())
        .map(str::trim)
}

#[derive(Debug, Default)]
pub struct ListingStats {
    pub nettikone: usize,
    pub tori: usize,
    pub priced: usize,
    pub total: usize,
}

impl ListingStats {
    pub fn from_listings(listings: &[Listing]) -> ListingStats {
        ListingStats {
            nettikone: listings
                .iter()
                .filter(|l| l.source == Source::Nettikone)
                .count(),
            tori: listings.iter().filter(|l| l.source == Source::Tori).count(),
            priced: listings.iter().filter(|l| l.price.is_some()).count(),
            total: listings.len(),
        }
    }
}

impl std::fmt::Display for ListingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        writeln!(f, "  Nettikone listings: {}", self.nettikone)?;
        writeln!(f, "  Tori listings:      {}", self.tori)?;
        writeln!(f, "  With a price:       {}", self.priced)?;
        writeln!(f, "  Total:              {}", self.total)
    }
}
