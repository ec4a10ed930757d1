pub mod classifier;
pub mod coerce;
pub mod dedup;
pub mod extractor;
pub mod parallel;
pub mod pipeline;
pub mod post_filter;
pub mod prefilter;
pub mod ranker;
pub mod traits;
pub mod value_parser;

pub use pipeline::{Pipeline, PipelineOutput};
pub use traits::{FetchedArticle, Fetcher, Lister, LlmClient};
