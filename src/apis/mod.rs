use async_trait::async_trait;

use crate::domain::{ExternalPatent, SearchResults};
use crate::error::Result;

pub mod google_patents;

pub use google_patents::GooglePatentsClient;

/// Seam for the third-party patent search service. The pipeline only
/// depends on this trait, so integration can run against a stub in tests.
#[async_trait]
pub trait PatentSearchApi: Send + Sync {
    /// Human-readable identifier for the backing service.
    fn api_name(&self) -> &'static str;

    /// Search for patents matching a free-text query.
    async fn search_patents(&self, query: &str, num_results: usize)
        -> Result<Vec<ExternalPatent>>;

    /// Run the pharmaceutical sweep over drug names and indications,
    /// returning per-target result lists deduplicated by patent id.
    async fn search_pharmaceutical_patents(
        &self,
        drug_names: &[String],
        indications: &[String],
    ) -> Result<SearchResults>;
}
