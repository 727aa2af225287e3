//! `cratedb-http` is an async HTTP client for CrateDB.
//!
//! The crate wraps the `/_sql` and `/_blobs` endpoints:
//! - [`CrateDbClient::execute`] sends a statement with optional positional
//!   or bulk parameters and returns a [`ResultSet`]
//! - [`CrateDbClient::blob_put`], [`CrateDbClient::blob_get`] and
//!   [`CrateDbClient::blob_delete`] manage content-addressed blobs
//!
//! SQL failures are errors ([`CrateDbError::Query`]) while rejected blob
//! requests are reported through the return value (`false` / `None`).

mod client;
mod decode;
mod error;
mod options;
mod params;
mod result_set;
mod value;
mod wire;

pub use client::{blob_digest, blob_path, CrateDbClient};
pub use error::CrateDbError;
pub use options::{ClientConfig, HttpOptions, DEFAULT_ENDPOINT, DEFAULT_SCHEMA};
pub use params::Params;
pub use result_set::{BulkResult, ResultSet, Row};
pub use value::Value;

pub type Result<T> = std::result::Result<T, CrateDbError>;
