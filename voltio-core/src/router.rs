//! Declarative screen routing.
//!
//! Navigation is a state machine driven only by explicit events; no screen
//! decision ever happens as a side effect of rendering. Screens that need a
//! session bounce to the login screen while signed out, and the whole
//! router falls back to the catalog when the session ends.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Catalog,
    ListingDetail,
    Chat,
    Profile,
    Publish,
    Login,
    Register,
}

impl Screen {
    pub fn requires_auth(&self) -> bool {
        matches!(self, Screen::Chat | Screen::Profile | Screen::Publish)
    }
}

/// Events that may move the router. Nothing else does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteEvent {
    Navigate(Screen),
    IdentityChanged { signed_in: bool },
    ListingOpened(String),
    ChatOpened { chat_id: String, listing_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Router {
    screen: Screen,
    signed_in: bool,
    selected_listing: Option<String>,
    selected_chat: Option<String>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Router {
    pub fn new(signed_in: bool) -> Self {
        Self {
            screen: Screen::Catalog,
            signed_in,
            selected_listing: None,
            selected_chat: None,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn selected_listing(&self) -> Option<&str> {
        self.selected_listing.as_deref()
    }

    pub fn selected_chat(&self) -> Option<&str> {
        self.selected_chat.as_deref()
    }

    /// Apply one event and return the resulting screen.
    pub fn apply(&mut self, event: RouteEvent) -> Screen {
        debug!(?event, from = ?self.screen, "route event");
        match event {
            RouteEvent::Navigate(target) => {
                // Leaving a conversation always drops the chat selection;
                // only the catalog clears the listing too.
                self.selected_chat = None;
                if target == Screen::Catalog {
                    self.selected_listing = None;
                }
                self.screen = match target {
                    t if t.requires_auth() && !self.signed_in => Screen::Login,
                    Screen::Login | Screen::Register if self.signed_in => Screen::Catalog,
                    t => t,
                };
            }
            RouteEvent::IdentityChanged { signed_in } => {
                self.signed_in = signed_in;
                if signed_in {
                    if matches!(self.screen, Screen::Login | Screen::Register) {
                        self.screen = Screen::Catalog;
                    }
                } else {
                    self.selected_chat = None;
                    self.selected_listing = None;
                    self.screen = Screen::Catalog;
                }
            }
            RouteEvent::ListingOpened(listing_id) => {
                self.selected_listing = Some(listing_id);
                self.selected_chat = None;
                self.screen = Screen::ListingDetail;
            }
            RouteEvent::ChatOpened {
                chat_id,
                listing_id,
            } => {
                if self.signed_in {
                    self.selected_chat = Some(chat_id);
                    self.selected_listing = Some(listing_id);
                    self.screen = Screen::Chat;
                } else {
                    self.screen = Screen::Login;
                }
            }
        }
        self.screen
    }
}
