use serde::{Deserialize, Serialize};

/// A physical feeder unit paired to exactly one aquarium.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub aquarium_id: i64,
    /// Hardware address the backend uses to reach the feeder
    pub unique_address: String,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceCreate {
    pub unique_address: String,
    pub aquarium_id: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aquarium_id: Option<i64>,
}
