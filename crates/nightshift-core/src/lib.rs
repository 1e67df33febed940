//! # nightshift-core
//!
//! Core library for Nightshift: commit now, push later.
//!
//! The producer snapshots a local commit as a durable record; the
//! consumer later replays the record against a private shadow mirror
//! and pushes it at the intended moment. The filesystem is the only
//! coordination medium between the two.

pub mod consumer;
mod credentials;
mod error;
mod layout;
mod lock;
mod notify;
mod producer;
mod record;
pub mod schedule;
mod store;

pub use consumer::{Consumer, POLL_INTERVAL};
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use layout::Layout;
pub use lock::InstanceLock;
pub use notify::Notifier;
pub use producer::{DeferredCommit, defer_commit};
pub use record::{CommitRecord, RecordId};
pub use store::{RecordHandle, RecordStore};
