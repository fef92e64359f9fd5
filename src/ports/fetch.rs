use crate::domain::error::AcquisitionError;
use async_trait::async_trait;
use std::path::Path;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Stream the resource at `url` into `dest`, returning the number of bytes written.
    /// `dest` may hold a partial file when this returns an error.
    async fn fetch_to(&self, url: &str, dest: &Path) -> Result<u64, AcquisitionError>;
}
