use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::endpoint::{CommandId, Endpoint, PcId};
use crate::status::CommandStatus;

// Wire types for the console <-> server JSON API. Field names follow the
// server's snake_case payloads exactly.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkCommandRequest {
    pub pc_ids: Vec<PcId>,
    pub command_type: String,
    pub command_data: Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    Success,
    Error,
}

/// One per-target outcome in a bulk dispatch response, in `pc_ids` order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchEntry {
    pub status: DispatchStatus,
    #[serde(default)]
    pub command_id: Option<CommandId>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkCommandResponse {
    pub success: u32,
    pub failed: u32,
    #[serde(default)]
    pub results: Vec<DispatchEntry>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsRequest {
    pub command_ids: Vec<CommandId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    pub id: CommandId,
    pub status: CommandStatus,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsResponse {
    pub results: Vec<CommandResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCommand {
    pub pc_id: PcId,
    pub command_id: CommandId,
    pub command_type: String,
    /// JSON object encoded as a string by the server.
    #[serde(default)]
    pub command_data: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub seat_number: Option<String>,
    #[serde(default)]
    pub room_name: Option<String>,
    pub created_at: String, // DateTime string
    pub priority: i64,
}

impl PendingCommand {
    /// `key: value` pairs of the payload, comma-joined. Unparseable or empty
    /// payloads render as an empty string.
    pub fn data_summary(&self) -> String {
        let raw = self.command_data.as_deref().unwrap_or("{}");
        let parsed: Value = serde_json::from_str(raw).unwrap_or(Value::Null);
        match parsed.as_object() {
            Some(map) => map
                .iter()
                .map(|(k, v)| match v.as_str() {
                    Some(s) => format!("{}: {}", k, s),
                    None => format!("{}: {}", k, v),
                })
                .collect::<Vec<_>>()
                .join(", "),
            None => String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingListResponse {
    pub total: u64,
    pub commands: Vec<PendingCommand>,
}

/// Aggregate outcome of a bulk pending-queue clear. Counts are per endpoint
/// except `total_deleted`; per-command detail is not available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearSummary {
    pub total_deleted: u64,
    pub success: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleClearResponse {
    pub deleted_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub hostname: String,
    pub count: u64,
    pub pcs: Vec<Endpoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicatesResponse {
    pub total_duplicate_groups: u64,
    pub duplicates: Vec<DuplicateGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcListResponse {
    pub status: String,
    pub count: u64,
    pub pcs: Vec<Endpoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutSeat {
    pub row: u32,
    pub col: u32,
    #[serde(default)]
    pub pc_id: Option<PcId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutMap {
    pub rows: u32,
    pub cols: u32,
    pub seats: Vec<LayoutSeat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_response_parses_mixed_outcomes() {
        let raw = r#"{
            "success": 2, "failed": 1,
            "results": [
                {"status": "success", "command_id": 10},
                {"status": "error", "error": "offline"},
                {"status": "success", "command_id": 11}
            ]
        }"#;
        let resp: BulkCommandResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.success, 2);
        assert_eq!(resp.results.len(), 3);
        assert_eq!(resp.results[0].command_id, Some(CommandId(10)));
        assert_eq!(resp.results[1].status, DispatchStatus::Error);
        assert!(resp.results[1].command_id.is_none());
    }

    #[test]
    fn test_pending_data_summary() {
        let cmd = PendingCommand {
            pc_id: PcId(3),
            command_id: CommandId(7),
            command_type: "download".to_string(),
            command_data: Some(r#"{"url":"http://h/f","destination":"C:\\f"}"#.to_string()),
            hostname: None,
            seat_number: None,
            room_name: None,
            created_at: "2025-01-01 10:00:00".to_string(),
            priority: 5,
        };
        assert_eq!(cmd.data_summary(), "url: http://h/f, destination: C:\\f");
    }

    #[test]
    fn test_pending_data_summary_tolerates_missing_payload() {
        let cmd = PendingCommand {
            pc_id: PcId(3),
            command_id: CommandId(7),
            command_type: "shutdown".to_string(),
            command_data: None,
            hostname: None,
            seat_number: None,
            room_name: None,
            created_at: "2025-01-01 10:00:00".to_string(),
            priority: 5,
        };
        assert_eq!(cmd.data_summary(), "");
    }
}
