use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Highest star a user can give a movie.
pub const MAX_RATING: u8 = 10;

pub const NOT_AVAILABLE: &str = "N/A";

/// Catalog identifier. TMDB hands out numbers, users and persisted records
/// use strings; both normalize to the string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MovieId(String);

impl MovieId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MovieId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for MovieId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for MovieId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => MovieId::from(n),
            Raw::Text(s) => MovieId(s),
        })
    }
}

pub type GenreMap = HashMap<i64, String>;

/// Resolve genre ids through the map; unknown ids read "Unknown".
pub fn genre_names(genres: &GenreMap, ids: &[i64]) -> Vec<String> {
    ids.iter()
        .map(|id| {
            genres
                .get(id)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string())
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: MovieId,
    pub title: String,
    pub overview: String,
    pub genre_ids: Vec<i64>,
    pub release_date: Option<String>,
    pub poster_path: Option<String>,
}

impl MovieSummary {
    pub fn year(&self) -> Option<&str> {
        self.release_date
            .as_deref()
            .and_then(|d| d.split('-').next())
            .filter(|y| !y.is_empty())
    }
}

/// Detail view of a single movie. Absent upstream fields stay `None` and
/// render as "not available".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
    pub id: MovieId,
    pub title: String,
    pub year: Option<String>,
    pub poster_url: Option<String>,
    pub runtime_minutes: Option<u32>,
    pub rating: f64,
    pub plot: String,
    pub genres: Vec<String>,
    pub director: Option<String>,
    pub cast: Vec<String>,
}

impl MovieDetail {
    pub fn year_label(&self) -> String {
        self.year.clone().unwrap_or_else(|| "NA".to_string())
    }

    pub fn runtime_label(&self) -> String {
        match self.runtime_minutes {
            Some(m) => format!("{m} min"),
            None => NOT_AVAILABLE.to_string(),
        }
    }

    pub fn genres_label(&self) -> String {
        if self.genres.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            self.genres.join(", ")
        }
    }

    pub fn director_label(&self) -> String {
        self.director
            .clone()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn cast_label(&self) -> String {
        if self.cast.is_empty() {
            "NA".to_string()
        } else {
            self.cast.join(", ")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchedRecord {
    pub id: MovieId,
    pub title: String,
    pub poster: Option<String>,
    pub year: String,
    pub rating: f64,
    pub runtime: u32,
    pub user_rating: u8,
    pub rating_decisions: u32,
}

impl WatchedRecord {
    pub fn from_detail(detail: &MovieDetail, user_rating: u8, rating_decisions: u32) -> Self {
        Self {
            id: detail.id.clone(),
            title: detail.title.clone(),
            poster: detail.poster_url.clone(),
            year: detail.year_label(),
            rating: detail.rating,
            runtime: detail.runtime_minutes.unwrap_or(0),
            user_rating,
            rating_decisions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WatchedSummary {
    pub count: usize,
    pub avg_rating: f64,
    pub avg_user_rating: f64,
    pub avg_runtime: f64,
}

impl WatchedSummary {
    pub fn from_records(records: &[WatchedRecord]) -> Self {
        Self {
            count: records.len(),
            avg_rating: average(records.iter().map(|r| r.rating)),
            avg_user_rating: average(records.iter().map(|r| f64::from(r.user_rating))),
            avg_runtime: average(records.iter().map(|r| f64::from(r.runtime))),
        }
    }
}

fn average(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let len = values.len();
    if len == 0 {
        return 0.0;
    }
    values.sum::<f64>() / len as f64
}
