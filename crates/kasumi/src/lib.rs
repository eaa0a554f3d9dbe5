pub mod download;
pub mod error;
pub mod key;
pub mod manifest;
pub mod pipeline;
pub mod platform;
pub mod pssh;
pub mod select;
pub mod title;
pub mod util;
pub mod workdir;

pub use async_trait::async_trait;
pub use error::{KasumiError, KasumiResult};
pub use platform::{PlatformAdapter, PlaybackSession};
pub use util::http::HttpClient;
