pub mod crawlers;
pub mod domain;
pub mod models;
pub mod processing;

/// Maximum number of recommended product URLs per search.
pub const TOP_K_RESULTS: usize = 20;
