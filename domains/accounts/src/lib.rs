//! Accounts domain: profiles, role assignments, subscriptions, plans,
//! admin user management

pub mod api;
pub mod domain;
pub mod repository;

// Re-export domain types at the crate root for convenience
pub use domain::entities::{AdminUserView, Profile, RoleAssignment, SubscriptionStatus};

// Re-export repository types
pub use repository::{
    AccountsRepositories, MemoryProfileStore, MemoryRoleStore, PgProfileStore, PgRoleStore,
    ProfileStore, RoleStore,
};

// Re-export API types
pub use api::routes;
pub use api::{AccountsState, CheckoutConfig};
