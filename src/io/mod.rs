mod http;
mod local;

pub use http::HttpSource;
pub use local::{LocalFileSource, StdinSource};

use anyhow::Result;
use async_trait::async_trait;
use std::io::Read;

/// Trait for a place an archive can be streamed from
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Open the source and return a blocking reader over the archive bytes
    async fn open(&self) -> Result<Box<dyn Read + Send>>;

    /// Human-readable name of the source
    fn name(&self) -> &str;
}
