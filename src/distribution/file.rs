use std::path::PathBuf;

use async_trait::async_trait;

use crate::errors::StingrayError;
use super::DistributionResolver;

/// A binary already on disk. Existence is checked at submission time.
#[derive(Debug, Clone)]
pub struct FileResolver {
    path: PathBuf,
}

impl FileResolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DistributionResolver for FileResolver {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn resolve(&self) -> Result<PathBuf, StingrayError> {
        Ok(self.path.clone())
    }
}
