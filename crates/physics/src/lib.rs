//! Plano physics: retail rules over a planogram config and its resolved metadata.
//! Collisions, action-intent validation and free-slot suggestions all work in
//! shelf-surface semantic space; other placement models pass through unchecked.

#![forbid(unsafe_code)]

pub mod collision;
pub mod suggest;
pub mod validator;

pub use collision::{CollisionEngine, CollisionEntry, CollisionMap, CollisionPosition};
pub use suggest::{PlacementSuggester, PlacementSuggestion, SuggestionRequest};
pub use validator::IntentValidator;
