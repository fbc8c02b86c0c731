pub mod config;
pub mod error;
pub mod db;
pub mod store;
pub mod discovery;

pub use config::Config;
pub use error::{VinculosError, Result};
pub use discovery::{
    aggregate_network, classify_degree, find_kinship_candidates, resolve_direct_links,
    DiscoveredLink, KinshipCandidate, KinshipReport, PersonNetwork,
};
pub use store::OwnershipStore;
