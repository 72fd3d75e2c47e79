// SPDX-License-Identifier: GPL-3.0-only
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::gateway::{Gateway, GatewayError, GatewayResult};
use crate::geocoder::{FoundGeoObject, GeocodeOptions, GeocodeRequest, SuggestEntry, SuggestOptions};

/// Geocoder hit, with coordinates flipped to the host's lat/lon order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeResult {
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    pub description: Option<String>,
}

impl From<FoundGeoObject> for GeocodeResult {
    fn from(found: FoundGeoObject) -> Self {
        let [lon, lat] = found.coordinates;
        Self {
            lat,
            lon,
            name: found.name,
            description: found.description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestResult {
    pub display_name: String,
    pub value: String,
}

impl From<SuggestEntry> for SuggestResult {
    fn from(entry: SuggestEntry) -> Self {
        Self {
            display_name: entry.display_name,
            value: entry.value,
        }
    }
}

impl Gateway {
    /// Forward geocode an address, or reverse geocode a `[lon, lat]` point
    pub async fn geocode(
        &self,
        request: &GeocodeRequest,
        options: &GeocodeOptions,
    ) -> GatewayResult<Vec<GeocodeResult>> {
        match self.geocoder.geocode(request, options).await {
            Ok(found) => {
                debug!(query = %request.to_query(), results = found.len(), "Geocode completed");
                Ok(found.into_iter().map(GeocodeResult::from).collect())
            }
            Err(e) => {
                error!(error = %e, query = %request.to_query(), "Geocode failed");
                Err(GatewayError::Geocoder(e))
            }
        }
    }

    pub async fn suggest(&self, text: &str, options: &SuggestOptions) -> GatewayResult<Vec<SuggestResult>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        match self.geocoder.suggest(text, options).await {
            Ok(entries) => Ok(entries.into_iter().map(SuggestResult::from).collect()),
            Err(e) => {
                error!(error = %e, text = %text, "Suggest failed");
                Err(GatewayError::Geocoder(e))
            }
        }
    }
}
