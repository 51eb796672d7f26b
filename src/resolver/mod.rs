//! Graph ordering and capability resolution.
//!
//! Both resolvers are pure: they read module metadata and never touch the
//! filesystem.

pub mod errors;
pub mod order;
pub mod provider;

pub use errors::GraphError;
pub use order::{find_cycles, sort, sort_strict, SortOrder};
pub use provider::{find_best, find_providers, rank_providers, ProviderCandidate, RankedProvider};
