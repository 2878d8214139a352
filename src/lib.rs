//! Dashboard Auth Session Client
//!
//! Client-side authentication session lifecycle for the dashboard
//! frontend: token storage with persistence, expiry tracking, proactive
//! silent refresh, inactivity timeout, and coordinated navigation on
//! login/logout.
//!
//! The crate splits into a deterministic [`session::SessionStore`] (state
//! transitions and expiry queries, persisted through a pluggable
//! [`session::SessionPersist`] backend) and a
//! [`controller::SessionController`] that owns every timer, network call,
//! and navigation side effect.
//!
//! The controller spawns its timers onto the ambient tokio runtime:
//! constructing it needs no runtime, but [`SessionController::resume`],
//! [`SessionController::schedule_refresh`], and the async operations must
//! run inside one.
//!
//! ```no_run
//! use std::sync::Arc;
//! use dashauth::{AuthApi, SessionController, SessionOptions, SessionStore};
//! use dashauth::controller::{LogNavigator, LogNotifier};
//! use dashauth::session::MemoryPersist;
//!
//! # async fn run() -> Result<(), dashauth::AuthError> {
//! let api = AuthApi::new("https://dashboard.example.com");
//! let store = SessionStore::new(Arc::new(MemoryPersist::new()));
//! let controller = SessionController::new(
//!     api,
//!     store,
//!     Arc::new(LogNavigator),
//!     Arc::new(LogNotifier),
//!     SessionOptions::default(),
//! );
//!
//! // pick up a persisted session, if one survived the restart
//! controller.resume();
//!
//! controller.login("user@example.com", "password").await?;
//! assert!(controller.is_authenticated());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetch;
pub mod session;

pub use api::AuthApi;
pub use config::SessionOptions;
pub use controller::{
    ActivityKind, ActivityTracker, Navigator, Notice, Notifier, Route, SessionController,
};
pub use error::AuthError;
pub use session::{
    epoch_millis, FilePersist, MemoryPersist, SessionPersist, SessionState, SessionStore, User,
};
