// Listing, identity, trend and log endpoints.
//
// Listing and identity payloads come back as raw JSON: their shape varies
// between backend versions and `bmsdash-core` normalizes them. Trend and log
// envelopes are handed to the caller untouched.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::Value;

use crate::client::ApiClient;
use crate::domain::Domain;
use crate::envelope::Envelope;
use crate::error::Error;

/// Default trend lookback.
pub const DEFAULT_TREND_HOURS: i64 = 6;

/// Closed time range for series queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// The `hours` leading up to `now`.
    pub fn last_hours(hours: i64, now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::hours(hours),
            end: now,
        }
    }

    fn params(&self) -> [(&'static str, String); 2] {
        [
            ("start", format_ts(self.start)),
            ("end", format_ts(self.end)),
        ]
    }
}

/// Trend query for one named parameter (e.g. `voltage`, `temperature`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendQuery {
    pub parameter: String,
    /// `None` means the last [`DEFAULT_TREND_HOURS`] hours.
    pub window: Option<TimeWindow>,
    /// Max points; the backend's own default when unset.
    pub limit: Option<u32>,
}

impl TrendQuery {
    pub fn new(parameter: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            window: None,
            limit: None,
        }
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn params(&self, now: DateTime<Utc>) -> Vec<(&'static str, String)> {
        let window = self
            .window
            .unwrap_or_else(|| TimeWindow::last_hours(DEFAULT_TREND_HOURS, now));
        let mut params = vec![("parameter", self.parameter.clone())];
        params.extend(window.params());
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

/// Log query with optional range and paging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl LogQuery {
    pub(crate) fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(start) = self.start {
            params.push(("start", format_ts(start)));
        }
        if let Some(end) = self.end {
            params.push(("end", format_ts(end)));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset", offset.to_string()));
        }
        params
    }
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl ApiClient {
    /// Primary listing for a domain: machines with their latest metrics.
    pub async fn list_machines(&self, domain: Domain) -> Result<Value, Error> {
        self.get(&domain.listing_path(), &[]).await
    }

    /// Identity listing for a domain: registered machine identifiers.
    pub async fn list_identities(&self, domain: Domain) -> Result<Value, Error> {
        self.get(&domain.identity_path(), &[]).await
    }

    /// Trend series for one machine and parameter.
    pub async fn trend(
        &self,
        domain: Domain,
        machine_id: &str,
        query: &TrendQuery,
    ) -> Result<Envelope<Value>, Error> {
        let url = self.segment_url(&domain.trend_segments(machine_id))?;
        self.get_url(url, &query.params(Utc::now())).await
    }

    /// Reading log for one machine.
    pub async fn logs(
        &self,
        domain: Domain,
        machine_id: &str,
        query: &LogQuery,
    ) -> Result<Envelope<Value>, Error> {
        let url = self.segment_url(&domain.logs_segments(machine_id))?;
        self.get_url(url, &query.params()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn trend_defaults_to_last_six_hours() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let params = TrendQuery::new("voltage").params(now);

        assert_eq!(
            params,
            vec![
                ("parameter", "voltage".to_owned()),
                ("start", "2024-06-15T06:00:00Z".to_owned()),
                ("end", "2024-06-15T12:00:00Z".to_owned()),
            ]
        );
    }

    #[test]
    fn explicit_window_wins() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let window = TimeWindow::last_hours(1, now);
        let params = TrendQuery::new("humidity").with_window(window).params(now);

        assert_eq!(params[1], ("start", "2024-06-15T11:00:00Z".to_owned()));
    }

    #[test]
    fn trend_limit_is_appended() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let params = TrendQuery::new("voltage").with_limit(24).params(now);

        assert_eq!(params.last(), Some(&("limit", "24".to_owned())));
    }

    #[test]
    fn log_query_skips_unset_fields() {
        let query = LogQuery {
            limit: Some(50),
            offset: Some(100),
            ..LogQuery::default()
        };
        assert_eq!(
            query.params(),
            vec![("limit", "50".to_owned()), ("offset", "100".to_owned())]
        );
    }
}
