pub mod ai;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod fields;
pub mod html;
pub mod pipeline;
pub mod rate_limit;
pub mod retry;
pub mod selector;

pub use ai::{AiExtractor, OpenAiClient, LICENCE_SCHEMA};
pub use error::{AiError, ScraperError, StrategyFailure};
pub use extract::{Extractor, ExtractorSettings, StrategyRun};
pub use fetch::{
    BrowserRenderer, FetchMethod, FetchRequest, FetchResult, FetchRouter, FetchStatus, Fetcher,
    FormAction, HttpFetcher,
};
pub use pipeline::{PipelineController, PipelineReport, PipelineSettings, RunGuard, TargetReport};
pub use rate_limit::RateLimiter;
pub use selector::{select_strategies, SelectorSettings, StrategySelection};
