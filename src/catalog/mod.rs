use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::sync::Arc;

mod search;
mod tmdb;

pub use search::{SearchTicket, SearchTracker};
pub use tmdb::TmdbCatalog;

use crate::models::{GenreMap, MovieDetail, MovieId, MovieSummary};

/// Queries shorter than this (ignoring whitespace) are never sent.
pub const MIN_QUERY_CHARS: usize = 3;

/// Every way a catalog call can go wrong. The display string is the
/// message shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to fetch {what}: no API key configured")]
    MissingApiKey { what: &'static str },
    #[error("Failed to fetch {what}: {source}")]
    Transport {
        what: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to fetch {what}: server responded {status}")]
    Status {
        what: &'static str,
        status: reqwest::StatusCode,
    },
    #[error("Failed to fetch {what}: unexpected response ({source})")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn fetch_genres(&self) -> Result<GenreMap, CatalogError>;
    /// Trending movies in upstream order; see [`fetch_trending`] for the
    /// display order.
    async fn fetch_trending(&self) -> Result<Vec<MovieSummary>, CatalogError>;
    /// Implementations may assume `query` already passed [`search_query`].
    async fn search_movies(&self, query: &str) -> Result<Vec<MovieSummary>, CatalogError>;
    async fn fetch_detail(&self, id: &MovieId) -> Result<MovieDetail, CatalogError>;
}

/// Reorders the trending list before display.
pub type Shuffle = Arc<dyn Fn(&mut Vec<MovieSummary>) + Send + Sync>;

pub fn random_shuffle() -> Shuffle {
    Arc::new(|movies: &mut Vec<MovieSummary>| movies.shuffle(&mut rand::rng()))
}

pub fn keep_order() -> Shuffle {
    Arc::new(|_: &mut Vec<MovieSummary>| {})
}

pub async fn fetch_trending(
    api: &dyn CatalogApi,
    shuffle: &Shuffle,
) -> Result<Vec<MovieSummary>, CatalogError> {
    let mut movies = api.fetch_trending().await?;
    shuffle(&mut movies);
    Ok(movies)
}

/// Returns the trimmed query when it is long enough to be worth a request.
pub fn search_query(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let visible = trimmed.chars().filter(|c| !c.is_whitespace()).count();
    (visible >= MIN_QUERY_CHARS).then_some(trimmed)
}

/// Search that skips the network entirely for too-short queries.
pub async fn search_movies(
    api: &dyn CatalogApi,
    raw: &str,
) -> Result<Vec<MovieSummary>, CatalogError> {
    match search_query(raw) {
        Some(query) => api.search_movies(query).await,
        None => Ok(Vec::new()),
    }
}
