use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::company::Company;
use super::feeding::FeedingSchedule;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aquarium {
    pub id: i64,
    pub name: String,
    /// Volume in liters
    pub capacity: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub company: Option<Company>,
    #[serde(default)]
    pub fish: Vec<Fish>,
    #[serde(default)]
    pub feeding_schedules: Vec<FeedingSchedule>,
}

impl Aquarium {
    /// Total number of fish across all species in the tank.
    pub fn fish_count(&self) -> i64 {
        self.fish.iter().map(|f| f.quantity as i64).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AquariumCreate {
    pub name: String,
    pub capacity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AquariumUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fish {
    pub id: i64,
    pub aquarium_id: i64,
    pub species: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FishCreate {
    pub species: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FishUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i32>,
}
