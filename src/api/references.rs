//! Reference data: airports and nearest airports

use serde_json::Value;

use super::client::LhApiClient;
use crate::error::LhApiError;

pub const DEFAULT_LANG: &str = "EN";

impl LhApiClient {
    /// All airports, or a single one when `airport_code` is given.
    pub async fn airports(
        &self,
        airport_code: Option<&str>,
        lang: Option<&str>,
        lh_operated: Option<bool>,
    ) -> Result<Value, LhApiError> {
        let mut query = vec![("lang", lang.unwrap_or(DEFAULT_LANG).to_string())];
        if let Some(lh) = lh_operated {
            query.push(("LHoperated", lh.to_string()));
        }

        match airport_code {
            Some(code) => {
                self.get_json(&["references", "airports", code], &query)
                    .await
            }
            None => self.get_json(&["references", "airports"], &query).await,
        }
    }

    /// Airports closest to a coordinate.
    pub async fn nearest_airports(
        &self,
        latitude: f64,
        longitude: f64,
        lang: Option<&str>,
    ) -> Result<Value, LhApiError> {
        let position = format!("{},{}", latitude, longitude);
        let query = [("lang", lang.unwrap_or(DEFAULT_LANG).to_string())];
        self.get_json(&["references", "airports", "nearest", position.as_str()], &query)
            .await
    }
}
