use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{search_query, CatalogApi, CatalogError};
use crate::config::CatalogConfig;
use crate::models::{GenreMap, MovieDetail, MovieId, MovieSummary};

const TOP_CAST: usize = 5;

#[derive(Debug, Clone)]
pub struct TmdbCatalog {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    poster_base: String,
    language: String,
}

impl TmdbCatalog {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let user_agent = format!("rate-movies/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            poster_base: config.poster_base_url.clone(),
            language: config.language.clone(),
        })
    }

    fn url(&self, what: &'static str, path: &str, extra: &str) -> Result<String, CatalogError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(CatalogError::MissingApiKey { what })?;
        Ok(format!(
            "{}{path}?api_key={}&language={}{extra}",
            self.base_url,
            urlencoding::encode(key),
            urlencoding::encode(&self.language)
        ))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        what: &'static str,
        url: &str,
    ) -> Result<T, CatalogError> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| CatalogError::Transport { what, source })?;
        let status = res.status();
        if !status.is_success() {
            return Err(CatalogError::Status { what, status });
        }
        let bytes = res
            .bytes()
            .await
            .map_err(|source| CatalogError::Transport { what, source })?;
        serde_json::from_slice(&bytes).map_err(|source| CatalogError::Decode { what, source })
    }
}

#[async_trait]
impl CatalogApi for TmdbCatalog {
    async fn fetch_genres(&self) -> Result<GenreMap, CatalogError> {
        let url = self.url("genres", "/genre/movie/list", "")?;
        let data: GenreList = self.get_json("genres", &url).await?;
        debug!("Fetched {} genres", data.genres.len());
        Ok(data.genres.into_iter().map(|g| (g.id, g.name)).collect())
    }

    async fn fetch_trending(&self) -> Result<Vec<MovieSummary>, CatalogError> {
        let url = self.url("trending movies", "/trending/movie/week", "")?;
        let data: MovieResults = self.get_json("trending movies", &url).await?;
        Ok(data.into_summaries())
    }

    async fn search_movies(&self, query: &str) -> Result<Vec<MovieSummary>, CatalogError> {
        let Some(query) = search_query(query) else {
            return Ok(Vec::new());
        };
        let extra = format!("&query={}", urlencoding::encode(query));
        let url = self.url("movies", "/search/movie", &extra)?;
        let data: MovieResults = self.get_json("movies", &url).await?;
        Ok(data.into_summaries())
    }

    async fn fetch_detail(&self, id: &MovieId) -> Result<MovieDetail, CatalogError> {
        let path = format!("/movie/{}", urlencoding::encode(id.as_str()));
        let url = self.url("movie details", &path, "&append_to_response=credits")?;
        let raw: DetailResponse = self.get_json("movie details", &url).await?;
        Ok(map_detail(raw, &self.poster_base))
    }
}

#[derive(Debug, Deserialize)]
struct GenreList {
    genres: Vec<GenreEntry>,
}

#[derive(Debug, Deserialize)]
struct GenreEntry {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct MovieResults {
    results: Vec<MovieResult>,
}

impl MovieResults {
    fn into_summaries(self) -> Vec<MovieSummary> {
        self.results
            .into_iter()
            .map(|r| MovieSummary {
                id: r.id,
                title: r.title.unwrap_or_default(),
                overview: r.overview.unwrap_or_default(),
                genre_ids: r.genre_ids,
                release_date: r.release_date.filter(|d| !d.is_empty()),
                poster_path: r.poster_path,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct MovieResult {
    id: MovieId,
    title: Option<String>,
    overview: Option<String>,
    #[serde(default)]
    genre_ids: Vec<i64>,
    release_date: Option<String>,
    poster_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Genre {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct Credits {
    #[serde(default)]
    cast: Vec<CastMember>,
    #[serde(default)]
    crew: Vec<CrewMember>,
}

#[derive(Debug, Deserialize)]
struct CastMember {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CrewMember {
    job: Option<String>,
    name: String,
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    id: MovieId,
    title: Option<String>,
    overview: Option<String>,
    release_date: Option<String>,
    runtime: Option<u32>,
    vote_average: Option<f64>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    genres: Option<Vec<Genre>>,
    credits: Option<Credits>,
}

fn map_detail(raw: DetailResponse, poster_base: &str) -> MovieDetail {
    let credits = raw.credits.unwrap_or_default();
    let director = credits
        .crew
        .into_iter()
        .find(|c| c.job.as_deref() == Some("Director"))
        .map(|c| c.name);
    let cast = credits
        .cast
        .into_iter()
        .take(TOP_CAST)
        .map(|c| c.name)
        .collect();
    let poster_url = raw
        .poster_path
        .or(raw.backdrop_path)
        .map(|p| format!("{poster_base}{p}"));

    MovieDetail {
        id: raw.id,
        title: raw.title.unwrap_or_default(),
        year: raw.release_date.as_deref().and_then(extract_year),
        poster_url,
        runtime_minutes: raw.runtime.filter(|m| *m > 0),
        rating: raw.vote_average.unwrap_or_default(),
        plot: raw.overview.unwrap_or_default(),
        genres: raw
            .genres
            .map(|g| g.into_iter().map(|x| x.name).collect())
            .unwrap_or_default(),
        director,
        cast,
    }
}

/// Full dates go through chrono. TMDB also sends "YYYY" or "YYYY-MM" for
/// unreleased titles; anything without a four digit year yields `None`.
fn extract_year(date: &str) -> Option<String> {
    let date = date.trim();
    if let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return Some(parsed.year().to_string());
    }
    let year = date.split('-').next()?;
    (year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit())).then(|| year.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<(String, HashMap<String, String>)>>>;

    const POSTERS: &str = "https://image.tmdb.org/t/p/w500";

    fn catalog(api_key: Option<&str>) -> TmdbCatalog {
        TmdbCatalog::new(&CatalogConfig {
            api_key: api_key.map(str::to_string),
            base_url: "https://api.example.test/3/".to_string(),
            poster_base_url: POSTERS.to_string(),
            language: "en-US".to_string(),
        })
        .unwrap()
    }

    fn detail(value: serde_json::Value) -> MovieDetail {
        map_detail(serde_json::from_value(value).unwrap(), POSTERS)
    }

    #[test]
    fn maps_full_detail_response() {
        let d = detail(json!({
            "id": 603,
            "title": "The Matrix",
            "overview": "A hacker learns the truth.",
            "release_date": "1999-03-30",
            "runtime": 136,
            "vote_average": 8.2,
            "poster_path": "/matrix.jpg",
            "backdrop_path": "/matrix-bg.jpg",
            "genres": [{"id": 28, "name": "Action"}, {"id": 878, "name": "Science Fiction"}],
            "credits": {
                "cast": [
                    {"name": "Keanu Reeves"}, {"name": "Laurence Fishburne"},
                    {"name": "Carrie-Anne Moss"}, {"name": "Hugo Weaving"},
                    {"name": "Joe Pantoliano"}, {"name": "Marcus Chong"}
                ],
                "crew": [
                    {"job": "Producer", "name": "Joel Silver"},
                    {"job": "Director", "name": "Lana Wachowski"},
                    {"job": "Director", "name": "Lilly Wachowski"}
                ]
            }
        }));

        assert_eq!(d.id, MovieId::from("603"));
        assert_eq!(d.year.as_deref(), Some("1999"));
        assert_eq!(d.poster_url.as_deref(), Some("https://image.tmdb.org/t/p/w500/matrix.jpg"));
        assert_eq!(d.runtime_label(), "136 min");
        assert_eq!(d.genres_label(), "Action, Science Fiction");
        assert_eq!(d.director.as_deref(), Some("Lana Wachowski"));
        assert_eq!(d.cast.len(), 5);
        assert!(!d.cast.contains(&"Marcus Chong".to_string()));
    }

    #[test]
    fn sparse_detail_maps_to_not_available() {
        let d = detail(json!({
            "id": 1,
            "title": "Obscure",
            "release_date": "",
            "runtime": 0,
            "backdrop_path": "/only-backdrop.jpg"
        }));
        assert_eq!(d.year_label(), "NA");
        assert_eq!(d.runtime_label(), "N/A");
        assert_eq!(d.genres_label(), "N/A");
        assert_eq!(d.director_label(), "N/A");
        assert_eq!(d.cast_label(), "NA");
        assert_eq!(d.rating, 0.0);
        assert_eq!(
            d.poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/only-backdrop.jpg")
        );
    }

    #[test]
    fn partial_dates_still_yield_a_year() {
        assert_eq!(extract_year("2024-01-01").as_deref(), Some("2024"));
        assert_eq!(extract_year("1984").as_deref(), Some("1984"));
        assert_eq!(extract_year("1999-03").as_deref(), Some("1999"));
        assert_eq!(extract_year(""), None);
        assert_eq!(extract_year("TBA"), None);
    }

    #[test]
    fn result_lists_tolerate_missing_fields() {
        let results: MovieResults = serde_json::from_value(json!({
            "page": 1,
            "results": [
                {"id": 11, "title": "Star Wars", "genre_ids": [12], "release_date": "1977-05-25",
                 "poster_path": "/sw.jpg", "overview": "Rebels."},
                {"id": 12, "release_date": ""}
            ]
        }))
        .unwrap();
        let movies = results.into_summaries();
        assert_eq!(movies[0].year(), Some("1977"));
        assert_eq!(movies[1].title, "");
        assert_eq!(movies[1].release_date, None);
        assert!(movies[1].genre_ids.is_empty());
    }

    #[test]
    fn urls_carry_key_and_language() {
        let url = catalog(Some("k3y")).url("movies", "/search/movie", "&query=alien").unwrap();
        assert_eq!(
            url,
            "https://api.example.test/3/search/movie?api_key=k3y&language=en-US&query=alien"
        );
    }

    #[tokio::test]
    async fn missing_key_fails_without_a_request() {
        let api = catalog(None);
        let err = api.fetch_genres().await.unwrap_err();
        assert!(matches!(err, CatalogError::MissingApiKey { what: "genres" }));
        assert!(err.to_string().starts_with("Failed to fetch genres"));
        assert!(api.fetch_trending().await.is_err());
        assert!(api.fetch_detail(&MovieId::from("1")).await.is_err());
    }

    #[tokio::test]
    async fn short_search_skips_the_key_check() {
        let api = catalog(None);
        assert!(api.search_movies("ab").await.unwrap().is_empty());
        assert!(api.search_movies("abc").await.is_err());
    }

    async fn unauthorized() -> (StatusCode, Json<Value>) {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"status_code": 7, "status_message": "Invalid API key"})),
        )
    }

    async fn wrong_shape() -> Json<Value> {
        Json(json!({"nope": 1}))
    }

    async fn search(
        State(seen): State<Seen>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        seen.lock().unwrap().push(("search".to_string(), params));
        Json(json!({"page": 1, "results": [{"id": 603, "title": "The Matrix"}]}))
    }

    async fn movie(
        State(seen): State<Seen>,
        Path(id): Path<String>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        seen.lock().unwrap().push((format!("movie/{id}"), params));
        Json(json!({
            "id": 603,
            "title": "The Matrix",
            "release_date": "1999-03-30",
            "runtime": 136,
            "credits": {"cast": [{"name": "Keanu Reeves"}], "crew": []}
        }))
    }

    /// Serves a fake TMDB on an ephemeral port and returns its base URL.
    async fn fake_tmdb(seen: Seen) -> String {
        let router = Router::new()
            .route("/3/genre/movie/list", get(unauthorized))
            .route("/3/trending/movie/week", get(wrong_shape))
            .route("/3/search/movie", get(search))
            .route("/3/movie/:id", get(movie))
            .with_state(seen);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/3")
    }

    async fn live_catalog(seen: Seen) -> TmdbCatalog {
        TmdbCatalog::new(&CatalogConfig {
            api_key: Some("k3y".to_string()),
            base_url: fake_tmdb(seen).await,
            poster_base_url: POSTERS.to_string(),
            language: "fr-FR".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn error_statuses_and_bad_bodies_are_typed() {
        let api = live_catalog(Seen::default()).await;

        let err = api.fetch_genres().await.unwrap_err();
        match &err {
            CatalogError::Status { what, status } => {
                assert_eq!(*what, "genres");
                assert_eq!(*status, reqwest::StatusCode::UNAUTHORIZED);
            }
            other => panic!("expected a status error, got {other:?}"),
        }
        assert!(err.to_string().starts_with("Failed to fetch genres"));

        let err = api.fetch_trending().await.unwrap_err();
        assert!(matches!(err, CatalogError::Decode { what: "trending movies", .. }));
        assert!(err.to_string().starts_with("Failed to fetch trending movies"));
    }

    #[tokio::test]
    async fn requests_carry_key_language_and_credits() {
        let seen = Seen::default();
        let api = live_catalog(seen.clone()).await;

        let movies = api.search_movies("  the matrix ").await.unwrap();
        assert_eq!(movies[0].id, MovieId::from("603"));
        let d = api.fetch_detail(&MovieId::from("603")).await.unwrap();
        assert_eq!(d.year.as_deref(), Some("1999"));
        assert_eq!(d.cast, vec!["Keanu Reeves".to_string()]);

        let seen = seen.lock().unwrap();
        let (path, params) = &seen[0];
        assert_eq!(path, "search");
        assert_eq!(params["api_key"], "k3y");
        assert_eq!(params["language"], "fr-FR");
        assert_eq!(params["query"], "the matrix");

        let (path, params) = &seen[1];
        assert_eq!(path, "movie/603");
        assert_eq!(params["api_key"], "k3y");
        assert_eq!(params["language"], "fr-FR");
        assert_eq!(params["append_to_response"], "credits");
    }
}
