/// nmc-keyserver - HKP keyserver gateway for Namecoin identities
///
/// Answers OpenPGP keyserver lookups for `id/` names by resolving the name
/// on the Namecoin blockchain, and relays every other search to a standard
/// keyserver.

pub mod api;
pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod jobs;
pub mod keys;
pub mod lookup;
pub mod server;
pub mod upstream;

#[cfg(test)]
mod test_support;

pub use context::AppContext;
pub use error::{KeyserverError, KeyserverResult};
