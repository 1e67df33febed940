//! # nightshift-git
//!
//! Git operations abstraction layer for Nightshift, built on git2-rs.
//! Wraps the two repositories the pipeline touches: the user's working
//! repository (producer side) and the private shadow mirror used for
//! replaying deferred commits (consumer side), plus the SSH credential
//! provider both use for remote operations.

mod auth;
mod error;
mod repository;
mod shadow;

pub use auth::SshKeyAuth;
pub use error::{Error, Result};
pub use git2::Oid;
pub use repository::WorkRepo;
pub use shadow::ShadowRepo;
