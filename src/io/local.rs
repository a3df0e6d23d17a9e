use super::ArchiveSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::Read;
use std::path::PathBuf;

/// Archive stored on the local filesystem
pub struct LocalFileSource {
    path: PathBuf,
    name: String,
}

impl LocalFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }
}

#[async_trait]
impl ArchiveSource for LocalFileSource {
    async fn open(&self) -> Result<Box<dyn Read + Send>> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .with_context(|| format!("cannot open {}", self.name))?;
        Ok(Box::new(file.into_std().await))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Archive piped through standard input
#[derive(Default)]
pub struct StdinSource;

#[async_trait]
impl ArchiveSource for StdinSource {
    async fn open(&self) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(std::io::stdin()))
    }

    fn name(&self) -> &str {
        "<stdin>"
    }
}
