//! Cart state and default cart initialization.

mod initializer;
mod store;

pub use initializer::{CartBackend, CartError, CartInitializer, InitOutcome};
pub use store::{
    DEFAULT_TTL, DefaultCartAction, DefaultCartSlice, LineItem, LocalCart, LocalCartAction,
    Persisted,
};
