// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::backend::InMemoryBackend;
use crate::config::Config;
use crate::container::{HostContainers, WaitPolicy};
use crate::gateway::{Gateway, GatewaySettings, InitRequest};
use crate::geocoder::{
    FoundGeoObject, GeocodeOptions, GeocodeRequest, GeocodingService, SuggestEntry, SuggestOptions,
};
use crate::registry::models::{LatLon, MapState, PropertyBag};

/// Canned geocoding service that counts calls and can be told to fail
#[derive(Default)]
pub struct StubGeocoder {
    pub found: Vec<FoundGeoObject>,
    pub suggestions: Vec<SuggestEntry>,
    pub failure: Option<String>,
    calls: AtomicUsize,
}

impl StubGeocoder {
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn with_found(found: Vec<FoundGeoObject>) -> Self {
        Self {
            found,
            ..Default::default()
        }
    }

    pub fn with_suggestions(suggestions: Vec<SuggestEntry>) -> Self {
        Self {
            suggestions,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            Some(ref message) => Err(anyhow::anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl GeocodingService for StubGeocoder {
    async fn geocode(
        &self,
        _request: &GeocodeRequest,
        _options: &GeocodeOptions,
    ) -> anyhow::Result<Vec<FoundGeoObject>> {
        self.record_call()?;
        Ok(self.found.clone())
    }

    async fn suggest(&self, _text: &str, _options: &SuggestOptions) -> anyhow::Result<Vec<SuggestEntry>> {
        self.record_call()?;
        Ok(self.suggestions.clone())
    }
}

/// Gateway wired to in-memory collaborators, with handles to each of them
pub struct TestGateway {
    pub gateway: Arc<Gateway>,
    pub backend: Arc<InMemoryBackend>,
    pub containers: Arc<HostContainers>,
    pub geocoder: Arc<StubGeocoder>,
}

/// Short container waits so timeouts resolve quickly in tests
pub fn fast_settings() -> GatewaySettings {
    GatewaySettings {
        default_animation: Duration::from_millis(300),
        container_wait: WaitPolicy {
            poll_interval: Duration::from_millis(5),
            timeout: Duration::from_millis(200),
        },
    }
}

pub fn setup_test_gateway() -> TestGateway {
    setup_test_gateway_with(InMemoryBackend::new(), StubGeocoder::default())
}

pub fn setup_test_gateway_with(backend: InMemoryBackend, geocoder: StubGeocoder) -> TestGateway {
    let backend = Arc::new(backend);
    let containers = Arc::new(HostContainers::new());
    let geocoder = Arc::new(geocoder);

    let gateway = Arc::new(Gateway::new(
        backend.clone(),
        geocoder.clone(),
        containers.clone(),
        fast_settings(),
    ));

    TestGateway {
        gateway,
        backend,
        containers,
        geocoder,
    }
}

/// Mount a container and initialize an empty map centered on Moscow
pub async fn setup_test_map(test: &TestGateway, map_id: &str) {
    test.containers.mount(map_id).await;
    let request = InitRequest {
        map_id: map_id.to_string(),
        state: MapState {
            center: LatLon::new(55.75, 37.61),
            zoom: 10.0,
            map_type: None,
        },
        ..Default::default()
    };
    test.gateway
        .initialize(request, &tokio_util::sync::CancellationToken::new())
        .await
        .expect("Failed to initialize test map");
}

/// Build a property bag from a JSON object literal
pub fn bag(value: serde_json::Value) -> PropertyBag {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

/// Create a test configuration bound to an ephemeral port
pub fn create_test_config() -> Config {
    Config {
        local_api_bind: SocketAddr::from_str("127.0.0.1:0").unwrap(), // Use port 0 to auto-assign
        log_level: "error".to_string(), // Reduce log noise in tests
        ..Config::default()
    }
}
