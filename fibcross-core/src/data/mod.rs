//! Bar sources and feeds.

pub mod canonicalize;
pub mod circuit_breaker;
pub mod csv_file;
pub mod feed;
pub mod live;
pub mod provider;
pub mod windows;
pub mod yahoo;

pub use canonicalize::{canonicalize, is_canonical, CanonicalStats};
pub use circuit_breaker::CircuitBreaker;
pub use csv_file::CsvSource;
pub use feed::{BarFeed, HistoricalFeed};
pub use live::LiveFeed;
pub use provider::{BarSource, DataError, DataSource, MemorySource};
pub use windows::fetch_windows;
pub use yahoo::{YahooRequest, YahooSource};
