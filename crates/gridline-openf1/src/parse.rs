//! Raw API rows and their normalization into domain records.
//!
//! Responses are JSON arrays of flat objects. A body that is not an array
//! is malformed and yields zero records from that unit; an unreadable row
//! inside an otherwise valid array is skipped at debug level. Optional
//! numeric fields default to 0 / 0.0 rather than failing the record.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use gridline_core::UnitError;

use crate::model::{Driver, Lap, LatestSession, Position, Race};

fn parse_array(body: &str) -> Result<Vec<serde_json::Value>, UnitError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| UnitError::Malformed(e.to_string()))?;
    match value {
        serde_json::Value::Array(rows) => Ok(rows),
        _ => Err(UnitError::Malformed("expected a JSON array".to_string())),
    }
}

/// Decode each array element, skipping rows that don't fit the shape.
fn rows<R: DeserializeOwned>(body: &str, what: &str) -> Result<Vec<R>, UnitError> {
    let mut out = Vec::new();
    for row in parse_array(body)? {
        match serde_json::from_value(row) {
            Ok(r) => out.push(r),
            Err(e) => log::debug!("skipping unreadable {what} row: {e}"),
        }
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct RawSession {
    session_key: i64,
    #[serde(default)]
    year: i32,
    #[serde(default)]
    session_name: String,
    #[serde(default)]
    country_name: String,
    #[serde(default)]
    circuit_short_name: String,
    #[serde(default)]
    date_end: String,
}

pub fn parse_races(body: &str) -> Result<Vec<Race>, UnitError> {
    Ok(rows::<RawSession>(body, "session")?
        .into_iter()
        .map(|raw| Race {
            session_key: raw.session_key,
            year: raw.year,
            session_name: raw.session_name,
            country_name: raw.country_name,
            circuit_name: raw.circuit_short_name,
            date_end: raw.date_end,
        })
        .collect())
}

/// The API's latest-session descriptor: first element of the array, with
/// the end timestamp reduced to its calendar date and the circuit, session
/// name, and year joined into a readable label ("Singapore Race 2023").
pub fn parse_latest_session(body: &str) -> Result<LatestSession, UnitError> {
    let raw = rows::<RawSession>(body, "session")?
        .into_iter()
        .next()
        .ok_or_else(|| UnitError::Malformed("empty latest-session response".to_string()))?;
    let end_date = chrono::DateTime::parse_from_rfc3339(&raw.date_end)
        .map_err(|e| UnitError::Malformed(format!("bad date_end {:?}: {e}", raw.date_end)))?;
    Ok(LatestSession {
        session_key: raw.session_key,
        session_end_date: end_date.date_naive().format("%Y-%m-%d").to_string(),
        display_name: format!(
            "{} {} {}",
            raw.circuit_short_name, raw.session_name, raw.year
        ),
    })
}

#[derive(Debug, Deserialize)]
struct RawDriver {
    full_name: String,
    #[serde(default)]
    broadcast_name: Option<String>,
    #[serde(default)]
    team_name: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    driver_number: i64,
    #[serde(default)]
    headshot_url: Option<String>,
}

/// Parse drivers, keeping only valid ones. A batch where every driver is
/// invalid is an empty batch, not an error.
pub fn parse_drivers(body: &str) -> Result<Vec<Driver>, UnitError> {
    let mut drivers = Vec::new();
    for raw in rows::<RawDriver>(body, "driver")? {
        let driver = Driver {
            full_name: raw.full_name,
            broadcast_name: raw.broadcast_name,
            team: raw.team_name,
            country_code: raw.country_code,
            driver_number: raw.driver_number,
            headshot_url: raw.headshot_url,
        };
        if driver.is_valid() {
            drivers.push(driver);
        } else {
            log::debug!("skipping invalid driver: {}", driver.full_name);
        }
    }
    Ok(drivers)
}

#[derive(Debug, Deserialize)]
struct RawLap {
    lap_number: i64,
    #[serde(default)]
    lap_duration: Option<f64>,
    #[serde(default)]
    duration_sector_1: Option<f64>,
    #[serde(default)]
    duration_sector_2: Option<f64>,
    #[serde(default)]
    duration_sector_3: Option<f64>,
    #[serde(default)]
    st_speed: Option<i64>,
    #[serde(default)]
    is_pit_out_lap: bool,
}

pub fn parse_laps(body: &str, session_key: i64, driver_number: i64) -> Result<Vec<Lap>, UnitError> {
    Ok(rows::<RawLap>(body, "lap")?
        .into_iter()
        .map(|raw| Lap {
            session_key,
            driver_number,
            lap_number: raw.lap_number,
            lap_duration: raw.lap_duration.unwrap_or(0.0),
            sector_1: raw.duration_sector_1.unwrap_or(0.0),
            sector_2: raw.duration_sector_2.unwrap_or(0.0),
            sector_3: raw.duration_sector_3.unwrap_or(0.0),
            speed_trap_speed: raw.st_speed.unwrap_or(0),
            is_pit_out_lap: raw.is_pit_out_lap,
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct RawPositionUpdate {
    position: i64,
}

/// Final classified position: the *last* element of the chronological
/// update array. An empty array means no classification for this pair.
pub fn parse_final_position(
    body: &str,
    session_key: i64,
    driver_number: i64,
) -> Result<Option<Position>, UnitError> {
    let updates = rows::<RawPositionUpdate>(body, "position")?;
    match updates.last() {
        Some(last) => Ok(Some(Position {
            session_key,
            driver_number,
            position: last.position,
        })),
        None => {
            log::debug!("no position updates for session {session_key} driver {driver_number}");
            Ok(None)
        }
    }
}
