use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// A recurring daily feeding at a fixed wall-clock time. Execution happens
/// server-side on the paired device; the client only manages the records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedingSchedule {
    pub id: i64,
    pub aquarium_id: i64,
    pub food_type: String,
    pub scheduled_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedingScheduleCreate {
    pub food_type: String,
    pub scheduled_time: NaiveTime,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedingScheduleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub food_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<NaiveTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_time_format() {
        let schedule: FeedingSchedule = serde_json::from_value(serde_json::json!({
            "id": 3,
            "aquarium_id": 1,
            "food_type": "flakes",
            "scheduled_time": "08:30:00"
        }))
        .unwrap();
        assert_eq!(
            schedule.scheduled_time,
            NaiveTime::from_hms_opt(8, 30, 0).unwrap()
        );
    }
}
