//! Staleness gate: decides whether an import run is needed at all.

use anyhow::Context;

use gridline_core::{fetch_with_backoff, Fetcher, RetryPolicy};
use gridline_store::Repository;

use crate::api::Endpoints;
use crate::model::{LatestSession, LATEST_SESSION_ID};
use crate::parse;

/// Compares the locally recorded import marker against the API's current
/// latest session. Two states: up to date (skip the run) or stale (import).
pub struct StalenessGate<'a> {
    fetcher: &'a dyn Fetcher,
    policy: &'a RetryPolicy,
    endpoints: &'a Endpoints,
    markers: &'a dyn Repository<LatestSession>,
}

impl<'a> StalenessGate<'a> {
    pub fn new(
        fetcher: &'a dyn Fetcher,
        policy: &'a RetryPolicy,
        endpoints: &'a Endpoints,
        markers: &'a dyn Repository<LatestSession>,
    ) -> Self {
        Self {
            fetcher,
            policy,
            endpoints,
            markers,
        }
    }

    /// The API's current latest-session descriptor.
    pub async fn latest_upstream(&self) -> anyhow::Result<LatestSession> {
        let url = self.endpoints.latest_session();
        let body = fetch_with_backoff(self.fetcher, self.policy, &url)
            .await
            .context("failed to fetch latest session")?;
        parse::parse_latest_session(&body).context("failed to parse latest session")
    }

    /// The locally stored marker, absent on first run.
    pub fn marker(&self) -> anyhow::Result<Option<LatestSession>> {
        self.markers
            .find_by_id(LATEST_SESSION_ID)
            .context("failed to read import marker")
    }

    /// Stale when no marker exists yet, or when the upstream session key
    /// differs from the marker's.
    pub async fn is_import_needed(&self) -> anyhow::Result<bool> {
        let upstream = self.latest_upstream().await?;
        match self.marker()? {
            Some(marker) => Ok(marker.session_key != upstream.session_key),
            None => Ok(true),
        }
    }

    /// Record the current upstream session as imported. Called only after
    /// a run's stages have completed, never eagerly.
    pub async fn update_marker(&self) -> anyhow::Result<()> {
        let latest = self.latest_upstream().await?;
        self.markers
            .save(&latest)
            .context("failed to write import marker")?;
        log::info!(
            "import marker updated: session {} ({})",
            latest.session_key,
            latest.session_end_date
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use gridline_core::{FetchError, FetchOutcome};
    use gridline_store::MemoryStore;

    use super::*;

    struct LatestFetcher {
        body: String,
    }

    #[async_trait]
    impl Fetcher for LatestFetcher {
        async fn fetch(&self, _url: &str) -> Result<FetchOutcome, FetchError> {
            Ok(FetchOutcome::Success(self.body.clone()))
        }
    }

    fn latest_body(session_key: i64) -> String {
        format!(
            r#"[{{"session_key": {session_key}, "year": 2024,
                 "session_name": "Race", "circuit_short_name": "Sakhir",
                 "date_end": "2024-03-02T17:00:00+00:00"}}]"#
        )
    }

    #[tokio::test]
    async fn first_run_is_stale() {
        let fetcher = LatestFetcher {
            body: latest_body(9480),
        };
        let policy = RetryPolicy::default();
        let endpoints = Endpoints::default();
        let markers = MemoryStore::new();
        let gate = StalenessGate::new(&fetcher, &policy, &endpoints, &markers);
        assert!(gate.is_import_needed().await.unwrap());
    }

    #[tokio::test]
    async fn matching_marker_is_up_to_date() {
        let fetcher = LatestFetcher {
            body: latest_body(9480),
        };
        let policy = RetryPolicy::default();
        let endpoints = Endpoints::default();
        let markers = MemoryStore::new();
        markers
            .save(&LatestSession {
                session_key: 9480,
                session_end_date: "2024-03-02".to_string(),
                display_name: "Sakhir Race 2024".to_string(),
            })
            .unwrap();
        let gate = StalenessGate::new(&fetcher, &policy, &endpoints, &markers);
        assert!(!gate.is_import_needed().await.unwrap());
    }

    #[tokio::test]
    async fn differing_marker_is_stale() {
        let fetcher = LatestFetcher {
            body: latest_body(9500),
        };
        let policy = RetryPolicy::default();
        let endpoints = Endpoints::default();
        let markers = MemoryStore::new();
        markers
            .save(&LatestSession {
                session_key: 9480,
                session_end_date: "2024-03-02".to_string(),
                display_name: "Sakhir Race 2024".to_string(),
            })
            .unwrap();
        let gate = StalenessGate::new(&fetcher, &policy, &endpoints, &markers);
        assert!(gate.is_import_needed().await.unwrap());
    }

    #[tokio::test]
    async fn update_marker_writes_singleton() {
        let fetcher = LatestFetcher {
            body: latest_body(9480),
        };
        let policy = RetryPolicy::default();
        let endpoints = Endpoints::default();
        let markers = MemoryStore::new();
        let gate = StalenessGate::new(&fetcher, &policy, &endpoints, &markers);
        gate.update_marker().await.unwrap();
        gate.update_marker().await.unwrap();
        assert_eq!(markers.len(), 1);
        let marker = markers.find_by_id(LATEST_SESSION_ID).unwrap().unwrap();
        assert_eq!(marker.session_key, 9480);
        assert_eq!(marker.session_end_date, "2024-03-02");
    }
}
