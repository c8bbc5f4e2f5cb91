//! Which screen is showing and what the user has picked on it.

use tracing::debug;

use crate::models::{MovieId, MAX_RATING};

pub const DEFAULT_TITLE: &str = "Rate-Movies";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Home,
    Browsing,
    Detail(MovieId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other,
}

impl Key {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Escape" | "Esc" => Key::Escape,
            _ => Key::Other,
        }
    }
}

/// What the caller has to do after a transition.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    LoadDetail(MovieId),
    ClearSearch,
}

/// Stars picked so far for the movie in Detail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatingDraft {
    pub rating: Option<u8>,
    pub decisions: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewMetadata {
    pub title: String,
}

impl Default for ViewMetadata {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("rating must be between 1 and {max}, got {0}", max = MAX_RATING)]
pub struct InvalidRating(pub u8);

#[derive(Debug, Clone)]
pub struct Navigation {
    screen: Screen,
    query: String,
    draft: RatingDraft,
    // Present only while Detail is showing.
    close_key: Option<Key>,
    metadata: ViewMetadata,
}

impl Default for Navigation {
    fn default() -> Self {
        Self {
            screen: Screen::Home,
            query: String::new(),
            draft: RatingDraft::default(),
            close_key: None,
            metadata: ViewMetadata::default(),
        }
    }
}

impl Navigation {
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn is_home(&self) -> bool {
        self.screen == Screen::Home
    }

    pub fn selected(&self) -> Option<&MovieId> {
        match &self.screen {
            Screen::Detail(id) => Some(id),
            _ => None,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn draft(&self) -> RatingDraft {
        self.draft
    }

    pub fn metadata(&self) -> &ViewMetadata {
        &self.metadata
    }

    pub fn focus_search(&mut self) -> Effect {
        if self.is_home() {
            self.screen = Screen::Browsing;
        }
        Effect::None
    }

    /// Logo click: back to the slideshow with an empty search box.
    pub fn go_home(&mut self) -> Effect {
        self.leave_detail();
        self.screen = Screen::Home;
        self.query.clear();
        Effect::ClearSearch
    }

    /// A new query closes whatever detail is open.
    pub fn set_query(&mut self, query: &str) -> Effect {
        self.query = query.to_string();
        self.close()
    }

    /// Selecting the open movie again closes it.
    pub fn select(&mut self, id: MovieId) -> Effect {
        if self.is_home() {
            return Effect::None;
        }
        if self.selected() == Some(&id) {
            return self.close();
        }
        self.leave_detail();
        self.enter_detail(id.clone());
        Effect::LoadDetail(id)
    }

    pub fn close(&mut self) -> Effect {
        if matches!(self.screen, Screen::Detail(_)) {
            self.leave_detail();
            self.screen = Screen::Browsing;
        }
        Effect::None
    }

    pub fn key_pressed(&mut self, key: Key) -> Effect {
        if self.close_key == Some(key) {
            return self.close();
        }
        Effect::None
    }

    pub fn rate(&mut self, stars: u8) -> Result<(), InvalidRating> {
        if !(1..=MAX_RATING).contains(&stars) {
            return Err(InvalidRating(stars));
        }
        self.draft.rating = Some(stars);
        self.draft.decisions += 1;
        Ok(())
    }

    /// Apply the detail title once it arrives, if that movie is still open.
    pub fn detail_loaded(&mut self, id: &MovieId, title: &str) -> bool {
        if self.selected() != Some(id) || title.is_empty() {
            return false;
        }
        self.metadata.title = format!("Movie | {title}");
        true
    }

    fn enter_detail(&mut self, id: MovieId) {
        debug!(%id, "Entering detail");
        self.screen = Screen::Detail(id);
        self.draft = RatingDraft::default();
        self.close_key = Some(Key::Escape);
    }

    fn leave_detail(&mut self) {
        if self.close_key.take().is_some() {
            debug!("Detail closed, escape listener removed");
        }
        self.draft = RatingDraft::default();
        self.metadata = ViewMetadata::default();
    }
}
