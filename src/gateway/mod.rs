//! Gateway assembly: AI operations and the [`Huginn`] builder.

mod ai;
mod builder;

pub use ai::{AiGateway, AiOptions, MAX_TOKENS_BOUND, Sentiment, SentimentResult, parse_sentiment};
pub use builder::{Huginn, HuginnBuilder};
