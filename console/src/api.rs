use common::{
    BulkCommandRequest, BulkCommandResponse, ClearSummary, CommandId, CommandResult,
    DuplicatesResponse, Endpoint, LayoutMap, MessageResponse, PcId, PcListResponse,
    PendingListResponse, ResultsRequest, ResultsResponse, SingleClearResponse,
};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::ConsoleError;

/// HTTP client for the console API. Cheap to clone; the inner reqwest
/// client is shared.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, ConsoleError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ConsoleError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConsoleError::Transport(format!(
                "server returned {}: {}",
                status,
                body.trim()
            )));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ConsoleError::Protocol(format!("unexpected response shape: {}", e)))
    }

    pub async fn bulk_command(
        &self,
        request: &BulkCommandRequest,
    ) -> Result<BulkCommandResponse, ConsoleError> {
        let response = self
            .client
            .post(self.url("/api/pcs/bulk-command"))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn poll_results(
        &self,
        command_ids: &[CommandId],
    ) -> Result<Vec<CommandResult>, ConsoleError> {
        let request = ResultsRequest { command_ids: command_ids.to_vec() };
        let response = self
            .client
            .post(self.url("/api/commands/results"))
            .json(&request)
            .send()
            .await?;
        let results: ResultsResponse = Self::decode(response).await?;
        Ok(results.results)
    }

    pub async fn pending_commands(&self) -> Result<PendingListResponse, ConsoleError> {
        let response = self.client.get(self.url("/api/commands/pending")).send().await?;
        Self::decode(response).await
    }

    pub async fn clear_pending(&self, pc_ids: &[PcId]) -> Result<ClearSummary, ConsoleError> {
        let response = self
            .client
            .delete(self.url("/api/pcs/commands/clear"))
            .json(&serde_json::json!({ "pc_ids": pc_ids }))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn clear_pending_one(&self, pc_id: PcId) -> Result<SingleClearResponse, ConsoleError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/pc/{}/commands/clear", pc_id)))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn duplicate_groups(&self) -> Result<DuplicatesResponse, ConsoleError> {
        let response = self.client.get(self.url("/api/pcs/duplicates")).send().await?;
        Self::decode(response).await
    }

    pub async fn delete_pc(&self, pc_id: PcId) -> Result<MessageResponse, ConsoleError> {
        let response = self.client.delete(self.url(&format!("/api/pc/{}", pc_id))).send().await?;
        Self::decode(response).await
    }

    pub async fn list_pcs(&self, room: Option<&str>) -> Result<Vec<Endpoint>, ConsoleError> {
        let mut request = self.client.get(self.url("/api/pcs"));
        if let Some(room) = room {
            request = request.query(&[("room", room)]);
        }
        let response = request.send().await?;
        let list: PcListResponse = Self::decode(response).await?;
        Ok(list.pcs)
    }

    pub async fn layout_map(&self, room: &str) -> Result<LayoutMap, ConsoleError> {
        let response = self
            .client
            .get(self.url(&format!("/api/layout/map/{}", room)))
            .send()
            .await?;
        Self::decode(response).await
    }
}
