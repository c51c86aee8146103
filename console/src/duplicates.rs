use common::{DuplicateGroup, DuplicatesResponse, PcId};

use crate::api::ApiClient;
use crate::error::ConsoleError;

/// Lists endpoints sharing a hostname and removes redundant registrations.
/// Groups are computed server-side on demand and never cached here.
#[derive(Debug, Clone)]
pub struct DuplicateResolver {
    api: ApiClient,
}

impl DuplicateResolver {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<DuplicatesResponse, ConsoleError> {
        self.api.duplicate_groups().await
    }

    /// Irreversibly deletes one endpoint. The caller's group view is stale
    /// afterwards: either `prune` it or reload the full listing.
    pub async fn delete_one(&self, pc_id: PcId) -> Result<String, ConsoleError> {
        log::warn!("Deleting endpoint {} via duplicate cleanup", pc_id);
        let response = self.api.delete_pc(pc_id).await?;
        Ok(response.message)
    }
}

/// Drops a deleted endpoint from an in-memory group view. Groups that fall
/// below two members stop being duplicates and are removed entirely.
pub fn prune(groups: &mut Vec<DuplicateGroup>, deleted: PcId) {
    for group in groups.iter_mut() {
        group.pcs.retain(|pc| pc.id != deleted);
        group.count = group.pcs.len() as u64;
    }
    groups.retain(|group| group.count >= 2);
}
