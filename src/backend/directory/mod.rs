//! Directory Module
//!
//! Users and projects are owned by other parts of the system. The chat core
//! reaches them through two traits so they can be swapped for in-memory
//! fakes in tests:
//!
//! - **`users`** - `UserDirectory`: user lookup and push identifier registration
//! - **`projects`** - `ProjectDirectory`: project name, owner and members
//!
//! The SQL implementations read the `users`, `push_identifiers`, `projects`
//! and `project_members` tables.

pub mod projects;
pub mod users;

pub use projects::{ProjectDirectory, ProjectRecord, SqlProjectDirectory};
pub use users::{PushIdentifier, SqlUserDirectory, UserDirectory, UserRecord};
