//! URL handling module
//!
//! Domain derivation for politeness grouping, wildcard matching for domain
//! constraints, and normalization of discovered links.

mod domain;
mod matcher;
mod normalize;

pub use domain::{domain_name, extract_domain};
pub use matcher::matches_wildcard;
pub(crate) use matcher::most_specific;
pub use normalize::normalize_url;
