/// Lifecycle of one collection's view of the store.
///
/// A failed subscription degrades its own view to `Stale` and nothing else;
/// the other collections keep updating.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewState {
    /// Subscribed, first snapshot not seen yet.
    #[default]
    Loading,
    /// Tracking the store.
    Live,
    /// The subscription failed; `docs` holds the last good snapshot.
    Stale(String),
}

/// The latest full snapshot of one live query, with its view state.
#[derive(Debug, Clone)]
pub struct CollectionView<T> {
    pub docs: Vec<T>,
    pub state: ViewState,
}

impl<T> Default for CollectionView<T> {
    fn default() -> Self {
        Self::loading()
    }
}

impl<T> CollectionView<T> {
    pub fn loading() -> Self {
        Self {
            docs: Vec::new(),
            state: ViewState::Loading,
        }
    }

    pub fn live(docs: Vec<T>) -> Self {
        Self {
            docs,
            state: ViewState::Live,
        }
    }

    pub fn is_live(&self) -> bool {
        self.state == ViewState::Live
    }

    pub fn is_stale(&self) -> bool {
        matches!(self.state, ViewState::Stale(_))
    }
}
