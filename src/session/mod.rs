//! Session state, store, and persistence

mod persist;
mod store;
mod types;

pub use persist::*;
pub use store::*;
pub use types::*;
