//! Home page slideshow.
//!
//! [`Carousel`] is the pure index arithmetic. [`Slideshow`] wraps it with a
//! ticker task that advances the index every interval. The ticker is owned
//! by the slideshow and aborted whenever the list it was started for stops
//! being displayed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::models::MovieSummary;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(7);

/// Invariant: `index < movies.len()` whenever the list is non-empty.
#[derive(Debug, Clone, Default)]
pub struct Carousel {
    movies: Vec<MovieSummary>,
    index: usize,
}

impl Carousel {
    pub fn new(movies: Vec<MovieSummary>) -> Self {
        Self { movies, index: 0 }
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&MovieSummary> {
        self.movies.get(self.index)
    }

    pub fn next(&mut self) -> usize {
        if !self.is_empty() {
            self.index = (self.index + 1) % self.len();
        }
        self.index
    }

    pub fn previous(&mut self) -> usize {
        if !self.is_empty() {
            let len = self.len();
            self.index = (self.index + len - 1) % len;
        }
        self.index
    }
}

struct Ticker(JoinHandle<()>);

impl Drop for Ticker {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct Slideshow {
    carousel: Arc<Mutex<Carousel>>,
    interval: Duration,
    ticker: Option<Ticker>,
}

impl Slideshow {
    pub fn new(interval: Duration) -> Self {
        Self {
            carousel: Arc::new(Mutex::new(Carousel::default())),
            interval,
            ticker: None,
        }
    }

    /// Show a new list from its first slide. Must be called inside a tokio
    /// runtime when `movies` is non-empty.
    pub fn replace(&mut self, movies: Vec<MovieSummary>) {
        self.ticker = None;
        *self.lock() = Carousel::new(movies);
        self.restart();
    }

    /// Stop rotating and forget the list, e.g. while a reload is pending.
    pub fn clear(&mut self) {
        self.replace(Vec::new());
    }

    /// Stop rotating but keep the list and index. Used while the home page is
    /// not on screen.
    pub fn pause(&mut self) {
        if self.ticker.take().is_some() {
            debug!("Slideshow paused");
        }
    }

    pub fn next(&mut self) -> usize {
        let index = self.lock().next();
        self.restart();
        index
    }

    pub fn previous(&mut self) -> usize {
        let index = self.lock().previous();
        self.restart();
        index
    }

    pub fn index(&self) -> usize {
        self.lock().index()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn current(&self) -> Option<MovieSummary> {
        self.lock().current().cloned()
    }

    /// Index, length and current slide read under one lock, so a tick can
    /// not land between them.
    pub fn snapshot(&self) -> (usize, usize, Option<MovieSummary>) {
        let carousel = self.lock();
        (carousel.index(), carousel.len(), carousel.current().cloned())
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Carousel> {
        self.carousel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Restarting puts the next automatic advance a full interval away.
    fn restart(&mut self) {
        self.ticker = None;
        if self.is_empty() {
            return;
        }
        let period = self.interval;
        // The first deadline is fixed here, not when the task is first polled.
        let mut ticks = interval_at(Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let shared = Arc::clone(&self.carousel);
        let handle = tokio::spawn(async move {
            loop {
                ticks.tick().await;
                let index = shared.lock().unwrap_or_else(PoisonError::into_inner).next();
                debug!(index, "Slideshow advanced");
            }
        });
        self.ticker = Some(Ticker(handle));
    }
}

impl std::fmt::Debug for Slideshow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slideshow")
            .field("index", &self.index())
            .field("len", &self.len())
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MovieId;

    fn movies(n: i64) -> Vec<MovieSummary> {
        (1..=n)
            .map(|id| MovieSummary {
                id: MovieId::from(id),
                title: format!("Movie {id}"),
                overview: String::new(),
                genre_ids: vec![],
                release_date: None,
                poster_path: None,
            })
            .collect()
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    async fn elapse(secs: u64) {
        tokio::time::advance(Duration::from_secs(secs)).await;
        settle().await;
    }

    #[test]
    fn carousel_wraps_both_ways() {
        let mut c = Carousel::new(movies(3));
        assert_eq!(c.previous(), 2);
        assert_eq!(c.next(), 0);
        assert_eq!(c.next(), 1);
        assert_eq!(c.next(), 2);
        assert_eq!(c.next(), 0);
    }

    #[test]
    fn empty_carousel_stays_at_zero() {
        let mut c = Carousel::default();
        assert_eq!(c.next(), 0);
        assert_eq!(c.previous(), 0);
        assert!(c.current().is_none());
    }

    #[test]
    fn index_stays_in_bounds_for_any_walk() {
        for len in 1..=6 {
            let mut c = Carousel::new(movies(len));
            for step in 0..200u32 {
                // Deterministic mix of forward and backward moves.
                if step.wrapping_mul(2_654_435_761) % 3 == 0 {
                    c.previous();
                } else {
                    c.next();
                }
                assert!(c.index() < c.len());
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn manual_moves_interleave_with_ticks() {
        let mut show = Slideshow::new(DEFAULT_INTERVAL);
        show.replace(movies(3));
        assert_eq!(show.index(), 0);

        assert_eq!(show.next(), 1);
        elapse(7).await;
        assert_eq!(show.index(), 2);

        assert_eq!(show.previous(), 1);
        assert_eq!(show.current().unwrap().id, MovieId::from(2));
    }

    #[tokio::test(start_paused = true)]
    async fn manual_move_resets_the_phase() {
        let mut show = Slideshow::new(DEFAULT_INTERVAL);
        show.replace(movies(4));

        elapse(5).await;
        assert_eq!(show.index(), 0);
        show.next();

        // The original deadline at 7s would have fired here.
        elapse(3).await;
        assert_eq!(show.index(), 1);

        elapse(4).await;
        assert_eq!(show.index(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_list_keeps_the_ticker_off() {
        let mut show = Slideshow::new(DEFAULT_INTERVAL);
        show.replace(Vec::new());
        assert!(!show.is_running());
        assert_eq!(show.next(), 0);
        assert!(!show.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn replacing_the_list_restarts_from_zero() {
        let mut show = Slideshow::new(DEFAULT_INTERVAL);
        show.replace(movies(3));
        elapse(7).await;
        assert_eq!(show.index(), 1);

        show.replace(movies(2));
        assert_eq!(show.index(), 0);
        elapse(6).await;
        assert_eq!(show.index(), 0);
        elapse(1).await;
        assert_eq!(show.index(), 1);

        show.clear();
        assert!(!show.is_running());
        elapse(30).await;
        assert_eq!(show.index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_slideshow_holds_its_slide() {
        let mut show = Slideshow::new(DEFAULT_INTERVAL);
        show.replace(movies(3));
        elapse(7).await;
        show.pause();
        assert!(!show.is_running());

        elapse(30).await;
        let (index, len, current) = show.snapshot();
        assert_eq!((index, len), (1, 3));
        assert_eq!(current.unwrap().id, MovieId::from(2));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_slideshow_stops_the_ticker() {
        let mut show = Slideshow::new(DEFAULT_INTERVAL);
        show.replace(movies(3));
        let carousel = Arc::clone(&show.carousel);
        drop(show);
        elapse(21).await;
        assert_eq!(carousel.lock().unwrap().index(), 0);
    }
}
