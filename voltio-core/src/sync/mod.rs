//! Client-side synchronization: the subscription layer and the aggregated
//! local state built from it.
//!
//! [`SyncEngine`] owns one task per live query, each pumping full snapshots
//! from the store into a watched [`CollectionView`]. Identity changes tear
//! the user-scoped subscriptions down and resubscribe, so nothing from a
//! previous session can leak into the next one. [`AggregatedState`] is the
//! plain-value join surface the deriver and the workflows read from.

mod aggregator;
mod engine;
mod view;

pub use aggregator::{AggregatedState, ResolvedChat};
pub use engine::SyncEngine;
pub use view::{CollectionView, ViewState};
