//! `bolt-driver`: a client driver for a graph database speaking the bolt
//! binary wire protocol (spec.md §1). This crate is the facade (spec.md
//! §4.L): it wires together the lower-level `bolt-buffer`,
//! `bolt-packstream`, `bolt-chunking`, `bolt-channel`, `bolt-connection`
//! and `bolt-routing` crates behind [`Driver`] and [`Session`], and adds
//! the ambient configuration, bookmark, URL-parsing, and transaction
//! retry machinery a complete driver needs (SPEC_FULL §1-§2) on top of
//! them.
//!
//! Deliberately out of scope here, as in every layer below (spec.md §1
//! Non-goals): command-line tooling, query-building sugar, a
//! convenience Result/Record wrapper beyond the plain [`session::RecordStream`],
//! typed graph-value wrapper classes (Node/Relationship/Path/temporal
//! types/arbitrary-precision integers — callers register their own
//! [`bolt_packstream::StructMapper`]s for these), and certificate/
//! known-hosts management UX beyond the trust strategies themselves.

mod bookmarks;
mod config;
mod connector;
mod driver;
mod error;
mod retry;
mod session;
mod url;

pub use bolt_connection::{AccessMode, AuthToken};
pub use bolt_packstream::Value;
pub use bookmarks::Bookmarks;
pub use config::{Config, ConfigBuilder, Trust};
pub use driver::Driver;
pub use error::Error;
pub use retry::{execute_with_retry, RetryConfig};
pub use session::{RecordStream, Session, Transaction};
pub use url::{parse as parse_url, Mode as UrlMode, ParsedUrl, TrustKind};
