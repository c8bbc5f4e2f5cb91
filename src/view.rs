//! Renders a [`Session`] into the JSON document the browser draws.

use serde::Serialize;

use crate::models::{genre_names, MovieId, MovieSummary, WatchedRecord, MAX_RATING};
use crate::session::{DetailState, Session};

#[derive(Debug, Serialize)]
pub struct View {
    /// Document title.
    pub title: String,
    pub navbar: Navbar,
    pub main: Main,
}

#[derive(Debug, Serialize)]
pub struct Navbar {
    pub query: String,
    pub result_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Main {
    Home(HomeView),
    Search(SearchView),
}

#[derive(Debug, Serialize)]
pub struct HomeView {
    pub loading: bool,
    pub index: usize,
    pub total: usize,
    pub slide: Option<Slide>,
}

#[derive(Debug, Serialize)]
pub struct Slide {
    pub id: MovieId,
    pub title: String,
    pub overview: String,
    pub genres: String,
    pub release_date: String,
    pub poster_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchView {
    pub results: ResultsPanel,
    pub side: SidePanel,
}

#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResultsPanel {
    Loading,
    Error { message: String },
    List { movies: Vec<ResultItem> },
}

#[derive(Debug, Serialize)]
pub struct ResultItem {
    pub id: MovieId,
    pub title: String,
    pub year: Option<String>,
    pub poster_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "panel", rename_all = "snake_case")]
pub enum SidePanel {
    Detail(DetailView),
    Watched(WatchedView),
}

#[derive(Debug, Serialize)]
pub struct DetailView {
    pub id: MovieId,
    pub loading: bool,
    pub error: Option<String>,
    pub movie: Option<DetailFields>,
    pub is_watched: bool,
    pub watched_user_rating: Option<u8>,
    pub rating_control: Option<RatingControl>,
}

#[derive(Debug, Serialize)]
pub struct DetailFields {
    pub title: String,
    pub released: String,
    pub runtime: String,
    pub genres: String,
    pub rating: String,
    pub director: String,
    pub cast: String,
    pub plot: String,
    pub poster_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RatingControl {
    pub max: u8,
    pub selected: Option<u8>,
    pub can_add: bool,
}

#[derive(Debug, Serialize)]
pub struct WatchedView {
    pub count: usize,
    pub avg_rating: String,
    pub avg_user_rating: String,
    pub avg_runtime: String,
    pub movies: Vec<WatchedItem>,
}

#[derive(Debug, Serialize)]
pub struct WatchedItem {
    pub id: MovieId,
    pub title: String,
    pub poster_url: Option<String>,
    pub rating: String,
    pub user_rating: u8,
    pub runtime: String,
}

pub fn render(session: &Session, poster_base: &str) -> View {
    let nav = session.navigation();
    let main = if nav.is_home() {
        Main::Home(home(session, poster_base))
    } else {
        Main::Search(SearchView {
            results: results(session, poster_base),
            side: side(session),
        })
    };
    View {
        title: nav.metadata().title.clone(),
        navbar: Navbar {
            query: nav.query().to_string(),
            result_count: session.search().results.len(),
        },
        main,
    }
}

fn poster(poster_base: &str, path: Option<&str>) -> Option<String> {
    path.map(|p| format!("{poster_base}{p}"))
}

fn home(session: &Session, poster_base: &str) -> HomeView {
    let (index, total, current) = session.slideshow().snapshot();
    let slide = current.map(|movie| Slide {
        genres: genre_names(session.genres(), &movie.genre_ids).join(", "),
        release_date: movie.release_date.clone().unwrap_or_default(),
        poster_url: poster(poster_base, movie.poster_path.as_deref()),
        id: movie.id,
        title: movie.title,
        overview: movie.overview,
    });
    HomeView {
        loading: session.trending_loading(),
        index,
        total,
        slide,
    }
}

fn results(session: &Session, poster_base: &str) -> ResultsPanel {
    let search = session.search();
    if search.loading {
        return ResultsPanel::Loading;
    }
    if let Some(message) = &search.error {
        return ResultsPanel::Error {
            message: message.clone(),
        };
    }
    ResultsPanel::List {
        movies: search
            .results
            .iter()
            .map(|m| result_item(m, poster_base))
            .collect(),
    }
}

fn result_item(movie: &MovieSummary, poster_base: &str) -> ResultItem {
    ResultItem {
        id: movie.id.clone(),
        title: movie.title.clone(),
        year: movie.year().map(str::to_string),
        poster_url: poster(poster_base, movie.poster_path.as_deref()),
    }
}

fn side(session: &Session) -> SidePanel {
    match session.navigation().selected() {
        Some(id) => SidePanel::Detail(detail(session, id)),
        None => SidePanel::Watched(watched(session)),
    }
}

fn detail(session: &Session, id: &MovieId) -> DetailView {
    let record = session.watched().get(id);
    let (loading, error, movie) = match session.detail() {
        DetailState::Ready(d) if &d.id == id => (
            false,
            None,
            Some(DetailFields {
                title: d.title.clone(),
                released: d.year_label(),
                runtime: d.runtime_label(),
                genres: d.genres_label(),
                rating: format!("{:.2}", d.rating),
                director: d.director_label(),
                cast: d.cast_label(),
                plot: d.plot.clone(),
                poster_url: d.poster_url.clone(),
            }),
        ),
        DetailState::Failed { id: failed, message } if failed == id => {
            (false, Some(message.clone()), None)
        }
        _ => (true, None, None),
    };
    let rating_control = match record {
        Some(_) => None,
        None if loading => None,
        None => {
            let draft = session.navigation().draft();
            Some(RatingControl {
                max: MAX_RATING,
                selected: draft.rating,
                can_add: movie.is_some() && draft.rating.is_some_and(|r| r > 0),
            })
        }
    };
    DetailView {
        id: id.clone(),
        loading,
        error,
        movie,
        is_watched: record.is_some(),
        watched_user_rating: record.map(|r| r.user_rating),
        rating_control,
    }
}

fn watched(session: &Session) -> WatchedView {
    let list = session.watched();
    let summary = list.summary();
    WatchedView {
        count: summary.count,
        avg_rating: format!("{:.2}", summary.avg_rating),
        avg_user_rating: format!("{:.2}", summary.avg_user_rating),
        avg_runtime: format!("{:.2} min", summary.avg_runtime),
        movies: list
            .records()
            .iter()
            .map(|r: &WatchedRecord| WatchedItem {
                id: r.id.clone(),
                title: r.title.clone(),
                poster_url: r.poster.clone(),
                rating: format!("{:.2}", r.rating),
                user_rating: r.user_rating,
                runtime: format!("{} min", r.runtime),
            })
            .collect(),
    }
}
