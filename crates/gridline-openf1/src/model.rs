//! Domain records for imported telemetry.
//!
//! Composite keys are underscore-joined identity fields, so distinct
//! (session, driver[, lap]) tuples can never collide and re-importing a
//! record overwrites its stored document in place.

use serde::{Deserialize, Serialize};

use gridline_store::Document;

/// Fixed id of the singleton staleness marker.
pub const LATEST_SESSION_ID: &str = "latest_session";

/// One race session, keyed by its externally assigned session key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Race {
    pub session_key: i64,
    pub year: i32,
    pub session_name: String,
    pub country_name: String,
    pub circuit_name: String,
    /// End timestamp as reported upstream (RFC 3339).
    pub date_end: String,
}

impl Document for Race {
    const COLLECTION: &'static str = "races";

    fn key(&self) -> String {
        self.session_key.to_string()
    }
}

/// A driver, keyed by full name (natural key).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub full_name: String,
    pub broadcast_name: Option<String>,
    pub team: Option<String>,
    pub country_code: Option<String>,
    pub driver_number: i64,
    pub headshot_url: Option<String>,
}

impl Driver {
    /// A driver record is only persistable when team and country code are
    /// real values (the API serializes absent ones as the string "null")
    /// and the car number is positive.
    pub fn is_valid(&self) -> bool {
        is_present(&self.team) && is_present(&self.country_code) && self.driver_number > 0
    }
}

fn is_present(field: &Option<String>) -> bool {
    matches!(field, Some(v) if v != "null")
}

impl Document for Driver {
    const COLLECTION: &'static str = "drivers";

    fn key(&self) -> String {
        self.full_name.clone()
    }
}

/// One lap, keyed by (session, driver, lap number).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lap {
    pub session_key: i64,
    pub driver_number: i64,
    pub lap_number: i64,
    pub lap_duration: f64,
    pub sector_1: f64,
    pub sector_2: f64,
    pub sector_3: f64,
    pub speed_trap_speed: i64,
    pub is_pit_out_lap: bool,
}

impl Document for Lap {
    const COLLECTION: &'static str = "laps";

    fn key(&self) -> String {
        format!(
            "{}_{}_{}",
            self.session_key, self.driver_number, self.lap_number
        )
    }
}

/// Final classified position of one driver in one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub session_key: i64,
    pub driver_number: i64,
    pub position: i64,
}

impl Document for Position {
    const COLLECTION: &'static str = "positions";

    fn key(&self) -> String {
        format!("{}_{}", self.session_key, self.driver_number)
    }
}

/// Singleton marker recording the most recently imported session; gates
/// re-import and bounds the race query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestSession {
    pub session_key: i64,
    /// Session end date, `yyyy-mm-dd`.
    pub session_end_date: String,
    /// Human-readable label, e.g. "Singapore Race 2023".
    pub display_name: String,
}

impl Document for LatestSession {
    const COLLECTION: &'static str = "latest_session";

    fn key(&self) -> String {
        LATEST_SESSION_ID.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(team: Option<&str>, country: Option<&str>, number: i64) -> Driver {
        Driver {
            full_name: "Lewis HAMILTON".to_string(),
            broadcast_name: Some("L HAMILTON".to_string()),
            team: team.map(String::from),
            country_code: country.map(String::from),
            driver_number: number,
            headshot_url: None,
        }
    }

    #[test]
    fn lap_key_is_deterministic() {
        let lap = Lap {
            session_key: 1,
            driver_number: 44,
            lap_number: 12,
            lap_duration: 92.5,
            sector_1: 30.0,
            sector_2: 31.0,
            sector_3: 31.5,
            speed_trap_speed: 310,
            is_pit_out_lap: false,
        };
        assert_eq!(lap.key(), "1_44_12");
        // key depends only on identity fields
        let slower = Lap {
            lap_duration: 99.9,
            ..lap.clone()
        };
        assert_eq!(lap.key(), slower.key());
    }

    #[test]
    fn position_key_is_deterministic() {
        let pos = Position {
            session_key: 9158,
            driver_number: 1,
            position: 3,
        };
        assert_eq!(pos.key(), "9158_1");
    }

    #[test]
    fn distinct_tuples_never_collide() {
        let a = Lap {
            session_key: 1,
            driver_number: 44,
            lap_number: 12,
            lap_duration: 0.0,
            sector_1: 0.0,
            sector_2: 0.0,
            sector_3: 0.0,
            speed_trap_speed: 0,
            is_pit_out_lap: false,
        };
        let b = Lap {
            driver_number: 4,
            lap_number: 412,
            ..a.clone()
        };
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn valid_driver() {
        assert!(driver(Some("Mercedes"), Some("GBR"), 44).is_valid());
    }

    #[test]
    fn driver_with_null_team_is_invalid() {
        assert!(!driver(None, Some("GBR"), 44).is_valid());
        assert!(!driver(Some("null"), Some("GBR"), 44).is_valid());
    }

    #[test]
    fn driver_with_bad_number_is_invalid() {
        assert!(!driver(Some("Mercedes"), Some("GBR"), 0).is_valid());
        assert!(!driver(Some("Mercedes"), Some("GBR"), -3).is_valid());
    }

    #[test]
    fn marker_key_is_fixed() {
        let marker = LatestSession {
            session_key: 9158,
            session_end_date: "2024-03-02".to_string(),
            display_name: "Bahrain Race 2024".to_string(),
        };
        assert_eq!(marker.key(), LATEST_SESSION_ID);
    }
}
