pub mod engine;
pub mod enrichment;
pub mod presentation;
pub mod providers;

pub use engine::RecommendationEngine;
pub use providers::MetadataProvider;
