// Query analysis and adaptive retrieval filtering

pub mod filter;
pub mod intent;

pub use filter::filter_documents;
pub use intent::{QueryAnalysis, analyze_query, device_type_for_category};
