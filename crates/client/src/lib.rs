//! Tatame client runtime
//!
//! Decides what a visitor may see. The session lives in an observable
//! cell; role and subscription are re-resolved from the backend on every
//! session change and combined by a single declarative access gate.
//!
//! ```no_run
//! # async fn wire() {
//! use std::sync::Arc;
//! use tatame_client::*;
//!
//! let config = ClientConfig::new("https://api.tatame.app", "https://auth.tatame.app", "anon");
//! let store = SessionStore::new();
//! let backend: Arc<dyn AccessBackend> = Arc::new(BackendClient::new(&config));
//! let controller = AccessController::new(
//!     store.clone(),
//!     RoleResolver::new(backend.clone()),
//!     SubscriptionResolver::new(backend),
//! );
//! Arc::clone(&controller).spawn();
//!
//! let manager = SessionManager::new(
//!     store,
//!     Arc::new(GoTrueSessionProvider::new(&config)),
//!     config.refresh_margin,
//! );
//! manager.restore(None);
//! let _ = controller.decide(AccessRequirements::subscriber(), "/tecnicas/1");
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod gate;
pub mod manager;
pub mod provider;
pub mod resolver;
pub mod session;

pub use backend::{AccessBackend, BackendClient, SubscriptionStatus, WhoAmI};
pub use config::ClientConfig;
pub use controller::{AccessController, AccessSnapshot};
pub use error::ClientError;
pub use gate::{decide, AccessDecision, AccessInputs, AccessRequirements, SessionPresence};
pub use manager::SessionManager;
pub use provider::{GoTrueSessionProvider, SessionProvider};
pub use resolver::{RoleResolver, SubscriptionResolver};
pub use session::{Session, SessionState, SessionStore, SessionUser, SessionWatcher};
