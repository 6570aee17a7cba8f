//! OpenF1 endpoint URL construction.

pub const DEFAULT_BASE_URL: &str = "https://api.openf1.org/v1";

/// URL builder over a configurable API base.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Race sessions that started after `lower_bound` (yyyy-mm-dd).
    /// The filter operator `>` must be percent-encoded in the query.
    pub fn races_since(&self, lower_bound: &str) -> String {
        format!(
            "{}/sessions?session_type=Race&date_start%3E{lower_bound}",
            self.base
        )
    }

    /// Descriptor of the most recent session upstream.
    pub fn latest_session(&self) -> String {
        format!("{}/sessions?session_key=latest", self.base)
    }

    pub fn drivers(&self, session_key: i64) -> String {
        format!("{}/drivers?session_key={session_key}", self.base)
    }

    pub fn laps(&self, session_key: i64, driver_number: i64) -> String {
        format!(
            "{}/laps?session_key={session_key}&driver_number={driver_number}",
            self.base
        )
    }

    pub fn positions(&self, session_key: i64, driver_number: i64) -> String {
        format!(
            "{}/position?session_key={session_key}&driver_number={driver_number}",
            self.base
        )
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let ep = Endpoints::new("https://api.openf1.org/v1/");
        assert_eq!(
            ep.latest_session(),
            "https://api.openf1.org/v1/sessions?session_key=latest"
        );
    }

    #[test]
    fn races_filter_is_encoded() {
        let ep = Endpoints::default();
        assert_eq!(
            ep.races_since("2024-01-01"),
            "https://api.openf1.org/v1/sessions?session_type=Race&date_start%3E2024-01-01"
        );
    }

    #[test]
    fn per_entity_urls() {
        let ep = Endpoints::default();
        assert_eq!(
            ep.drivers(9158),
            "https://api.openf1.org/v1/drivers?session_key=9158"
        );
        assert_eq!(
            ep.laps(9158, 44),
            "https://api.openf1.org/v1/laps?session_key=9158&driver_number=44"
        );
        assert_eq!(
            ep.positions(9158, 44),
            "https://api.openf1.org/v1/position?session_key=9158&driver_number=44"
        );
    }
}
