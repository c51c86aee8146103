use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PcId(pub i64);

impl std::fmt::Display for PcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(pub i64);

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A managed PC as reported by the server. `id` is the identity; `hostname`
/// is a display/grouping key and may be duplicated across rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: PcId,
    pub hostname: String,
    #[serde(default)]
    pub seat_number: Option<String>,
    #[serde(default)]
    pub room_name: Option<String>,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub cpu_usage: Option<f64>,
    // Provenance, populated on the duplicates listing
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub machine_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>, // DateTime string
}

impl Endpoint {
    /// Seat number when placed, hostname otherwise.
    pub fn display_label(&self) -> &str {
        self.seat_number.as_deref().unwrap_or(&self.hostname)
    }

    pub fn load_tier(&self) -> LoadTier {
        if !self.is_online {
            return LoadTier::Offline;
        }
        match self.cpu_usage {
            Some(cpu) if cpu > 90.0 => LoadTier::Critical,
            Some(cpu) if cpu > 75.0 => LoadTier::High,
            _ => LoadTier::Normal,
        }
    }
}

/// Display classification of an endpoint's load, from the seat-map colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTier {
    Offline,
    Critical,
    High,
    Normal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(online: bool, cpu: Option<f64>) -> Endpoint {
        Endpoint {
            id: PcId(1),
            hostname: "LAB-01".to_string(),
            seat_number: None,
            room_name: None,
            is_online: online,
            cpu_usage: cpu,
            ip_address: None,
            mac_address: None,
            machine_id: None,
            created_at: None,
        }
    }

    #[test]
    fn test_load_tiers() {
        assert_eq!(endpoint(false, Some(99.0)).load_tier(), LoadTier::Offline);
        assert_eq!(endpoint(true, Some(95.0)).load_tier(), LoadTier::Critical);
        assert_eq!(endpoint(true, Some(80.0)).load_tier(), LoadTier::High);
        assert_eq!(endpoint(true, Some(20.0)).load_tier(), LoadTier::Normal);
        assert_eq!(endpoint(true, None).load_tier(), LoadTier::Normal);
    }

    #[test]
    fn test_display_label_prefers_seat() {
        let mut pc = endpoint(true, None);
        assert_eq!(pc.display_label(), "LAB-01");
        pc.seat_number = Some("A-03".to_string());
        assert_eq!(pc.display_label(), "A-03");
    }
}
