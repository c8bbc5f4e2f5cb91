use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
const DEFAULT_POSTER_URL: &str = "https://image.tmdb.org/t/p/original";
const DEFAULT_LANGUAGE: &str = "en-US";
const DEFAULT_STORE: &str = "rate-movies.json";
const DEFAULT_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 3147);
const DEFAULT_SLIDESHOW_SECS: u64 = 7;

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Without a key every catalog call fails and the views degrade.
    pub api_key: Option<String>,
    pub base_url: String,
    pub poster_base_url: String,
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub store_path: PathBuf,
    pub addr: SocketAddr,
    pub slideshow_interval: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset; malformed
    /// values fall back to the default with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let addr = match get("RATE_MOVIES_ADDR") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("Ignoring invalid RATE_MOVIES_ADDR '{}': {}", raw, e);
                SocketAddr::from(DEFAULT_ADDR)
            }),
            None => SocketAddr::from(DEFAULT_ADDR),
        };
        let slideshow_secs = match get("SLIDESHOW_INTERVAL_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    warn!("Ignoring invalid SLIDESHOW_INTERVAL_SECS '{}'", raw);
                    DEFAULT_SLIDESHOW_SECS
                }
            },
            None => DEFAULT_SLIDESHOW_SECS,
        };

        Self {
            catalog: CatalogConfig {
                api_key: get("TMDB_API_KEY"),
                base_url: get("TMDB_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                poster_base_url: get("TMDB_POSTER_URL")
                    .unwrap_or_else(|| DEFAULT_POSTER_URL.to_string()),
                language: get("TMDB_LANGUAGE").unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            },
            store_path: get("RATE_MOVIES_STORE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE)),
            addr,
            slideshow_interval: Duration::from_secs(slideshow_secs),
        }
    }

    pub fn report(&self) {
        if self.catalog.api_key.is_none() {
            warn!("TMDB_API_KEY is not set - catalog requests will fail");
        } else {
            info!("TMDB API key configured");
        }
        info!(
            base_url = %self.catalog.base_url,
            language = %self.catalog.language,
            store = %self.store_path.display(),
            "Configuration loaded"
        );
    }
}
