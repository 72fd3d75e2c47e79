// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What to geocode: a free-text address, or a `[lon, lat]` pair for reverse
/// geocoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeocodeRequest {
    Address(String),
    Coordinates([f64; 2]),
}

impl GeocodeRequest {
    /// Query string form understood by the geocoder ("lon,lat" for points)
    pub fn to_query(&self) -> String {
        match self {
            GeocodeRequest::Address(address) => address.clone(),
            GeocodeRequest::Coordinates([lon, lat]) => format!("{},{}", lon, lat),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeOptions {
    /// Maximum number of results
    #[serde(default)]
    pub results: Option<u32>,

    #[serde(default)]
    pub skip: Option<u32>,

    #[serde(default)]
    pub lang: Option<String>,

    /// Toponym kind filter for reverse geocoding (house, street, locality, ...)
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestOptions {
    #[serde(default)]
    pub results: Option<u32>,

    #[serde(default)]
    pub lang: Option<String>,
}

/// A geo-object as returned by the geocoder
#[derive(Debug, Clone, PartialEq)]
pub struct FoundGeoObject {
    /// Native service order: `[lon, lat]`
    pub coordinates: [f64; 2],
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuggestEntry {
    pub display_name: String,
    pub value: String,
}

#[async_trait]
pub trait GeocodingService: Send + Sync {
    /// Forward or reverse geocode
    async fn geocode(
        &self,
        request: &GeocodeRequest,
        options: &GeocodeOptions,
    ) -> anyhow::Result<Vec<FoundGeoObject>>;

    /// Address autocompletion for a partial input
    async fn suggest(&self, text: &str, options: &SuggestOptions) -> anyhow::Result<Vec<SuggestEntry>>;
}
