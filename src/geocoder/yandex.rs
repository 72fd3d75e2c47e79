// SPDX-License-Identifier: GPL-3.0-only
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::geocoder::traits::{
    FoundGeoObject, GeocodeOptions, GeocodeRequest, GeocodingService, SuggestEntry, SuggestOptions,
};

/// HTTP client for the Yandex Geocoder and Geosuggest APIs
#[derive(Debug, Clone)]
pub struct YandexGeocoder {
    client: Client,
    geocoder_url: String,
    suggest_url: String,
    api_key: Option<String>,
    suggest_api_key: Option<String>,
}

impl YandexGeocoder {
    pub fn new(
        geocoder_url: String,
        suggest_url: String,
        api_key: Option<String>,
        suggest_api_key: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("map-bridge/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            geocoder_url,
            suggest_url,
            api_key,
            suggest_api_key,
        })
    }

    fn build_geocode_url(&self, request: &GeocodeRequest, options: &GeocodeOptions) -> anyhow::Result<Url> {
        let mut params: Vec<(&str, String)> = vec![
            ("geocode", request.to_query()),
            ("format", "json".to_string()),
        ];
        if let Some(ref key) = self.api_key {
            params.push(("apikey", key.clone()));
        }
        if let Some(results) = options.results {
            params.push(("results", results.to_string()));
        }
        if let Some(skip) = options.skip {
            params.push(("skip", skip.to_string()));
        }
        if let Some(ref lang) = options.lang {
            params.push(("lang", lang.clone()));
        }
        if let Some(ref kind) = options.kind {
            params.push(("kind", kind.clone()));
        }

        Url::parse_with_params(&self.geocoder_url, &params).context("Invalid geocoder URL")
    }

    fn build_suggest_url(&self, text: &str, options: &SuggestOptions) -> anyhow::Result<Url> {
        let mut params: Vec<(&str, String)> = vec![("text", text.to_string())];
        // The suggest API has its own key; fall back to the geocoder key
        if let Some(key) = self.suggest_api_key.as_ref().or(self.api_key.as_ref()) {
            params.push(("apikey", key.clone()));
        }
        if let Some(results) = options.results {
            params.push(("results", results.to_string()));
        }
        if let Some(ref lang) = options.lang {
            params.push(("lang", lang.clone()));
        }

        Url::parse_with_params(&self.suggest_url, &params).context("Invalid suggest URL")
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: Url, service: &str) -> anyhow::Result<T> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("{} request failed: {} - {}", service, status, text));
        }

        response
            .json()
            .await
            .with_context(|| format!("Malformed {} response", service))
    }
}

#[derive(Deserialize)]
struct GeocoderResponse {
    response: GeocoderBody,
}

#[derive(Deserialize)]
struct GeocoderBody {
    #[serde(rename = "GeoObjectCollection")]
    collection: GeoObjectCollection,
}

#[derive(Deserialize)]
struct GeoObjectCollection {
    #[serde(rename = "featureMember", default)]
    members: Vec<FeatureMember>,
}

#[derive(Deserialize)]
struct FeatureMember {
    #[serde(rename = "GeoObject")]
    geo_object: RawGeoObject,
}

#[derive(Deserialize)]
struct RawGeoObject {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "Point")]
    point: RawPoint,
}

#[derive(Deserialize)]
struct RawPoint {
    /// "lon lat"
    pos: String,
}

fn parse_pos(pos: &str) -> anyhow::Result<[f64; 2]> {
    let mut parts = pos.split_whitespace();
    let (Some(lon), Some(lat), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(anyhow::anyhow!("Malformed point position '{}'", pos));
    };
    let lon: f64 = lon.parse().with_context(|| format!("Malformed longitude in '{}'", pos))?;
    let lat: f64 = lat.parse().with_context(|| format!("Malformed latitude in '{}'", pos))?;
    Ok([lon, lat])
}

#[derive(Deserialize)]
struct SuggestResponse {
    #[serde(default)]
    results: Vec<RawSuggestion>,
}

#[derive(Deserialize)]
struct RawSuggestion {
    title: RawText,
    #[serde(default)]
    subtitle: Option<RawText>,
    #[serde(default)]
    address: Option<RawAddress>,
}

#[derive(Deserialize)]
struct RawText {
    text: String,
}

#[derive(Deserialize)]
struct RawAddress {
    formatted_address: Option<String>,
}

impl From<RawSuggestion> for SuggestEntry {
    fn from(raw: RawSuggestion) -> Self {
        let display_name = match raw.subtitle {
            Some(subtitle) if !subtitle.text.is_empty() => {
                format!("{}, {}", raw.title.text, subtitle.text)
            }
            _ => raw.title.text,
        };
        let value = raw
            .address
            .and_then(|address| address.formatted_address)
            .unwrap_or_else(|| display_name.clone());

        SuggestEntry { display_name, value }
    }
}

#[async_trait]
impl GeocodingService for YandexGeocoder {
    async fn geocode(
        &self,
        request: &GeocodeRequest,
        options: &GeocodeOptions,
    ) -> anyhow::Result<Vec<FoundGeoObject>> {
        let url = self.build_geocode_url(request, options)?;
        debug!(query = %request.to_query(), "Sending geocode request");

        let body: GeocoderResponse = self.get_json(url, "Geocoder").await?;

        let mut found = Vec::with_capacity(body.response.collection.members.len());
        for member in body.response.collection.members {
            let object = member.geo_object;
            let coordinates = parse_pos(&object.point.pos)
                .with_context(|| format!("Malformed geocoder response for '{}'", object.name))?;
            found.push(FoundGeoObject {
                coordinates,
                name: object.name,
                description: object.description,
            });
        }

        Ok(found)
    }

    async fn suggest(&self, text: &str, options: &SuggestOptions) -> anyhow::Result<Vec<SuggestEntry>> {
        let url = self.build_suggest_url(text, options)?;
        debug!(text = %text, "Sending suggest request");

        let body: SuggestResponse = self.get_json(url, "Suggest").await?;
        Ok(body.results.into_iter().map(SuggestEntry::from).collect())
    }
}
