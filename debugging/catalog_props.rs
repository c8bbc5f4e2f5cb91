//! Query the movie catalog and print what the app would see.
//! Usage:
//!   cargo run --bin catalog_props -- genres
//!   cargo run --bin catalog_props -- trending
//!   cargo run --bin catalog_props -- search <query>
//!   cargo run --bin catalog_props -- detail <tmdb_id>
//! Reads TMDB_* settings from the environment (.env supported).

use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use rate_movies::catalog::{self, CatalogApi, TmdbCatalog};
use rate_movies::config::Config;
use rate_movies::models::{genre_names, MovieId};
use serde_json::{json, Value};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Probe {
    Genres,
    Trending,
    Search,
    Detail,
}

impl FromStr for Probe {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "genres" => Ok(Probe::Genres),
            "trending" => Ok(Probe::Trending),
            "search" => Ok(Probe::Search),
            "detail" => Ok(Probe::Detail),
            _ => Err(anyhow::anyhow!(
                "probe must be one of 'genres', 'trending', 'search', 'detail'"
            )),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let mut args = env::args().skip(1);
    let probe: Probe = args
        .next()
        .context("Missing probe (genres | trending | search | detail)")?
        .parse()?;
    let rest = args.collect::<Vec<_>>().join(" ");

    let config = Config::from_env();
    let api = TmdbCatalog::new(&config.catalog)?;

    let output: Value = match probe {
        Probe::Genres => {
            let mut genres: Vec<_> = api.fetch_genres().await?.into_iter().collect();
            genres.sort();
            json!(genres)
        }
        Probe::Trending => {
            let genres = api.fetch_genres().await.unwrap_or_default();
            let movies = catalog::fetch_trending(&api, &catalog::keep_order()).await?;
            movies
                .iter()
                .map(|m| {
                    json!({
                        "id": m.id,
                        "title": m.title,
                        "release_date": m.release_date,
                        "genres": genre_names(&genres, &m.genre_ids),
                    })
                })
                .collect()
        }
        Probe::Search => {
            if rest.trim().is_empty() {
                bail!("search needs a query");
            }
            let movies = catalog::search_movies(&api, &rest).await?;
            json!(movies)
        }
        Probe::Detail => {
            if rest.trim().is_empty() {
                bail!("detail needs a TMDB id");
            }
            let detail = api.fetch_detail(&MovieId::new(rest.trim())).await?;
            json!({
                "detail": detail,
                "labels": {
                    "released": detail.year_label(),
                    "runtime": detail.runtime_label(),
                    "genres": detail.genres_label(),
                    "director": detail.director_label(),
                    "cast": detail.cast_label(),
                }
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
