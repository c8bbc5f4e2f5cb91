use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::{error, info, warn};

use crate::catalog::{search_query, CatalogError, SearchTicket, SearchTracker};
use crate::models::{GenreMap, MovieDetail, MovieId, MovieSummary, WatchedRecord};
use crate::navigation::{Effect, InvalidRating, Key, Navigation};
use crate::slideshow::Slideshow;
use crate::store::{WatchedError, WatchedList};

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Idle,
    Loading(MovieId),
    Ready(MovieDetail),
    Failed { id: MovieId, message: String },
}

#[derive(Debug, Default)]
pub struct SearchState {
    pub results: Vec<MovieSummary>,
    pub loading: bool,
    pub error: Option<String>,
    tracker: SearchTracker,
}

impl SearchState {
    fn reset(&mut self) {
        self.tracker.cancel();
        self.results.clear();
        self.loading = false;
        self.error = None;
    }
}

/// Issued when a detail fetch starts; only the latest one may land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailTicket {
    epoch: u64,
    pub id: MovieId,
}

#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    #[error("no movie is open")]
    NoSelection,
    #[error("details for '{0}' are not loaded yet")]
    DetailNotReady(MovieId),
    #[error("pick a rating before adding to the list")]
    NoRating,
    #[error(transparent)]
    InvalidRating(#[from] InvalidRating),
    #[error(transparent)]
    Watched(#[from] WatchedError),
}

/// Everything one user sees: navigation, slideshow, search results, the
/// open detail and the watched list.
pub struct Session {
    genres: GenreMap,
    trending_loading: bool,
    slideshow: Slideshow,
    navigation: Navigation,
    search: SearchState,
    detail: DetailState,
    detail_epoch: u64,
    watched: WatchedList,
}

impl Session {
    pub fn new(watched: WatchedList, slideshow_interval: Duration) -> Self {
        Self {
            genres: GenreMap::new(),
            trending_loading: true,
            slideshow: Slideshow::new(slideshow_interval),
            navigation: Navigation::default(),
            search: SearchState::default(),
            detail: DetailState::Idle,
            detail_epoch: 0,
            watched,
        }
    }

    pub fn genres(&self) -> &GenreMap {
        &self.genres
    }

    pub fn trending_loading(&self) -> bool {
        self.trending_loading
    }

    pub fn slideshow(&self) -> &Slideshow {
        &self.slideshow
    }

    pub fn navigation(&self) -> &Navigation {
        &self.navigation
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn detail(&self) -> &DetailState {
        &self.detail
    }

    pub fn watched(&self) -> &WatchedList {
        &self.watched
    }

    pub fn genres_loaded(&mut self, result: Result<GenreMap, CatalogError>) {
        match result {
            Ok(genres) => {
                info!("Loaded {} genres", genres.len());
                self.genres = genres;
            }
            Err(e) => error!("Genre lookup unavailable: {}", e),
        }
    }

    pub fn begin_trending(&mut self) {
        self.trending_loading = true;
        self.slideshow.clear();
    }

    pub fn trending_loaded(&mut self, result: Result<Vec<MovieSummary>, CatalogError>) {
        self.trending_loading = false;
        match result {
            Ok(movies) => {
                info!("Loaded {} trending movies", movies.len());
                self.slideshow.replace(movies);
                if !self.navigation.is_home() {
                    self.slideshow.pause();
                }
            }
            Err(e) => error!("Trending movies unavailable: {}", e),
        }
    }

    /// Manual slideshow moves only apply while the home page is showing.
    pub fn slideshow_next(&mut self) -> usize {
        if !self.navigation.is_home() {
            return self.slideshow.index();
        }
        self.slideshow.next()
    }

    pub fn slideshow_previous(&mut self) -> usize {
        if !self.navigation.is_home() {
            return self.slideshow.index();
        }
        self.slideshow.previous()
    }

    pub fn focus_search(&mut self) {
        let effect = self.navigation.focus_search();
        self.apply(effect);
    }

    /// Returns true when the home page comes back on screen. Trending is then
    /// marked as loading and the caller must fetch it again.
    pub fn go_home(&mut self) -> bool {
        let remount = !self.navigation.is_home();
        let effect = self.navigation.go_home();
        self.apply(effect);
        if remount {
            self.begin_trending();
        }
        remount
    }

    /// Record the new query text. Returns the query to send when it is long
    /// enough; shorter text clears the results without a request.
    pub fn set_query(&mut self, raw: &str) -> Option<(SearchTicket, String)> {
        let effect = self.navigation.set_query(raw);
        self.apply(effect);
        match search_query(raw) {
            Some(query) => {
                let ticket = self.search.tracker.begin();
                self.search.loading = true;
                self.search.error = None;
                Some((ticket, query.to_string()))
            }
            None => {
                self.search.reset();
                None
            }
        }
    }

    pub fn attach_search(&mut self, ticket: SearchTicket, handle: AbortHandle) {
        self.search.tracker.attach(ticket, handle);
    }

    /// Land a search result. Stale tickets are dropped and false returned.
    pub fn search_finished(
        &mut self,
        ticket: SearchTicket,
        result: Result<Vec<MovieSummary>, CatalogError>,
    ) -> bool {
        if !self.search.tracker.finish(ticket) {
            return false;
        }
        self.search.loading = false;
        match result {
            Ok(movies) => {
                self.search.results = movies;
                self.search.error = None;
            }
            Err(e) => {
                warn!("Search failed: {}", e);
                self.search.results.clear();
                self.search.error = Some(e.to_string());
            }
        }
        true
    }

    pub fn select(&mut self, id: MovieId) -> Option<DetailTicket> {
        match self.navigation.select(id) {
            Effect::LoadDetail(id) => {
                self.detail_epoch += 1;
                self.detail = DetailState::Loading(id.clone());
                Some(DetailTicket {
                    epoch: self.detail_epoch,
                    id,
                })
            }
            effect => {
                self.apply(effect);
                None
            }
        }
    }

    pub fn detail_finished(
        &mut self,
        ticket: DetailTicket,
        result: Result<MovieDetail, CatalogError>,
    ) -> bool {
        if ticket.epoch != self.detail_epoch || self.navigation.selected() != Some(&ticket.id) {
            return false;
        }
        self.detail = match result {
            Ok(detail) => {
                self.navigation.detail_loaded(&ticket.id, &detail.title);
                DetailState::Ready(detail)
            }
            Err(e) => {
                warn!("Detail for {} failed: {}", ticket.id, e);
                DetailState::Failed {
                    id: ticket.id,
                    message: e.to_string(),
                }
            }
        };
        true
    }

    pub fn close(&mut self) {
        let effect = self.navigation.close();
        self.apply(effect);
    }

    pub fn key_pressed(&mut self, key: Key) {
        let effect = self.navigation.key_pressed(key);
        self.apply(effect);
    }

    pub fn rate(&mut self, stars: u8) -> Result<(), IntentError> {
        let id = self
            .navigation
            .selected()
            .cloned()
            .ok_or(IntentError::NoSelection)?;
        if self.watched.contains(&id) {
            return Err(WatchedError::AlreadyWatched(id).into());
        }
        self.navigation.rate(stars)?;
        Ok(())
    }

    /// Confirm the open movie into the watched list and close the detail.
    pub fn add_watched(&mut self) -> Result<WatchedRecord, IntentError> {
        let id = self
            .navigation
            .selected()
            .cloned()
            .ok_or(IntentError::NoSelection)?;
        if self.watched.contains(&id) {
            return Err(WatchedError::AlreadyWatched(id).into());
        }
        let detail = match &self.detail {
            DetailState::Ready(detail) if detail.id == id => detail,
            _ => return Err(IntentError::DetailNotReady(id)),
        };
        let draft = self.navigation.draft();
        let stars = draft.rating.ok_or(IntentError::NoRating)?;
        let record = WatchedRecord::from_detail(detail, stars, draft.decisions);

        self.watched.insert(record.clone())?;
        info!(id = %record.id, rating = stars, "Added to watched list");
        self.close();
        Ok(record)
    }

    pub fn delete_watched(&mut self, id: &MovieId) -> Result<WatchedRecord, IntentError> {
        let removed = self.watched.remove(id)?;
        info!(%id, "Removed from watched list");
        Ok(removed)
    }

    fn apply(&mut self, effect: Effect) {
        if effect == Effect::ClearSearch {
            self.search.reset();
        }
        if self.navigation.selected().is_none() && self.detail != DetailState::Idle {
            self.detail_epoch += 1;
            self.detail = DetailState::Idle;
        }
        if !self.navigation.is_home() {
            self.slideshow.pause();
        }
    }
}
