//! Flight status operations: single flight, arrivals and departures

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use super::client::LhApiClient;
use crate::error::LhApiError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Parse a `yyyy-MM-ddTHH:mm` command-line argument.
pub fn parse_date_time(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, DATE_TIME_FORMAT)
        .map_err(|e| format!("expected yyyy-MM-ddTHH:mm, got '{}': {}", s, e))
}

impl LhApiClient {
    /// Status of one flight on a given day.
    pub async fn flight_status(
        &self,
        flight_number: &str,
        date: NaiveDate,
    ) -> Result<Value, LhApiError> {
        let date = date.format(DATE_FORMAT).to_string();
        self.get_json(&["operations", "flightstatus", flight_number, date.as_str()], &[])
            .await
    }

    /// Flights arriving at `airport_code` between `from` and `until`.
    pub async fn arrivals_status(
        &self,
        airport_code: &str,
        from: NaiveDateTime,
        until: NaiveDateTime,
    ) -> Result<Value, LhApiError> {
        self.window_status("arrivals", airport_code, from, until)
            .await
    }

    /// Flights departing from `airport_code` between `from` and `until`.
    pub async fn departures_status(
        &self,
        airport_code: &str,
        from: NaiveDateTime,
        until: NaiveDateTime,
    ) -> Result<Value, LhApiError> {
        self.window_status("departures", airport_code, from, until)
            .await
    }

    async fn window_status(
        &self,
        direction: &str,
        airport_code: &str,
        from: NaiveDateTime,
        until: NaiveDateTime,
    ) -> Result<Value, LhApiError> {
        let from = from.format(DATE_TIME_FORMAT).to_string();
        let until = until.format(DATE_TIME_FORMAT).to_string();
        self.get_json(
            &["operations", "flightstatus", direction, airport_code, from.as_str(), until.as_str()],
            &[],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::ClientOptions;
    use crate::auth::Credentials;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> LhApiClient {
        server.mock(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(200).json_body(json!({
                "access_token": "tok1",
                "token_type": "bearer",
                "expires_in": 129600
            }));
        });
        LhApiClient::new(
            Credentials::new("abc", "xyz").unwrap(),
            ClientOptions {
                base_url: Some(server.base_url()),
                ..ClientOptions::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_parse_date_time() {
        let parsed = parse_date_time("2016-02-16T10:30").unwrap();
        assert_eq!(parsed.format(DATE_TIME_FORMAT).to_string(), "2016-02-16T10:30");
        assert!(parse_date_time("2016-02-16").is_err());
    }

    #[tokio::test]
    async fn test_flight_status_path() {
        let server = MockServer::start();
        let api = server.mock(|when, then| {
            when.method(GET)
                .path("/operations/flightstatus/LH400/2016-02-16")
                .header("authorization", "Bearer tok1");
            then.status(200)
                .json_body(json!({"FlightStatusResource": {"Flights": {}}}));
        });

        let client = client(&server);
        let date = NaiveDate::from_ymd_opt(2016, 2, 16).unwrap();
        let value = client.flight_status("LH400", date).await.unwrap();

        assert!(value.get("FlightStatusResource").is_some());
        api.assert();
    }

    #[tokio::test]
    async fn test_arrivals_and_departures_paths() {
        let server = MockServer::start();
        let arrivals = server.mock(|when, then| {
            when.method(GET)
                .path("/operations/flightstatus/arrivals/FRA/2016-02-16T00:00/2016-02-16T00:10");
            then.status(200).json_body(json!({}));
        });
        let departures = server.mock(|when, then| {
            when.method(GET)
                .path("/operations/flightstatus/departures/FRA/2016-02-16T00:00/2016-02-16T00:10");
            then.status(200).json_body(json!({}));
        });

        let client = client(&server);
        let from = parse_date_time("2016-02-16T00:00").unwrap();
        let until = parse_date_time("2016-02-16T00:10").unwrap();
        client.arrivals_status("FRA", from, until).await.unwrap();
        client.departures_status("FRA", from, until).await.unwrap();

        arrivals.assert();
        departures.assert();
    }
}
