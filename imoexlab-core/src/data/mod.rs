//! Storage tiers, artifact codec, and origin collaborators.

pub mod codec;
pub mod local;
pub mod moex;
pub mod news_feed;
pub mod provider;
pub mod rbc_datetime;
pub mod remote;
pub mod retry;

pub use codec::{decode, decode_market_index, decode_news, encode, Decoded, Encoding};
pub use local::LocalTier;
pub use moex::MoexIssProvider;
pub use news_feed::HttpNewsFeed;
pub use provider::{DataError, FeedSource, MarketIndexOrigin, NewsOrigin};
pub use remote::{FsObjectStore, MemoryObjectStore, ObjectStore, RemoteTier};
pub use retry::{RetryPolicy, RetryingNewsOrigin};
