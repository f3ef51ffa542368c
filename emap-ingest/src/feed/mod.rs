//! Emergency-dispatch feed decoding

mod parser;

pub use parser::{FeedHeader, FeedParser, ParsedFeed};
