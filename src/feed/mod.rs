// src/feed/mod.rs
pub mod emsc;
pub mod types;

pub use emsc::{parse_feed_body, EmscFeedClient};
pub use types::{Coordinates, FeedQuery, SeismicEvent, SeismicFeed};
