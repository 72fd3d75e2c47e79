// SPDX-License-Identifier: GPL-3.0-only
pub mod error;
pub mod geo_objects;
pub mod lifecycle;
pub mod search;
pub mod view;

use std::sync::Arc;
use std::time::Duration;

use crate::backend::{MapBackend, MapInstance};
use crate::container::{ContainerProbe, WaitPolicy};
use crate::geocoder::GeocodingService;
use crate::registry::Registry;

pub use error::{GatewayError, GatewayResult};
pub use lifecycle::InitRequest;

#[derive(Debug, Clone, Copy)]
pub struct GatewaySettings {
    /// Animation length used when the caller passes none (or zero)
    pub default_animation: Duration,
    pub container_wait: WaitPolicy,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            default_animation: Duration::from_millis(300),
            container_wait: WaitPolicy::default(),
        }
    }
}

/// Named operations over the registry and the mapping library.
///
/// The gateway owns the registry; every operation looks up what it needs,
/// delegates to the backend or geocoder and returns a result or a fault.
pub struct Gateway {
    registry: Arc<Registry>,
    backend: Arc<dyn MapBackend>,
    geocoder: Arc<dyn GeocodingService>,
    containers: Arc<dyn ContainerProbe>,
    settings: GatewaySettings,
}

impl Gateway {
    pub fn new(
        backend: Arc<dyn MapBackend>,
        geocoder: Arc<dyn GeocodingService>,
        containers: Arc<dyn ContainerProbe>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            backend,
            geocoder,
            containers,
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    async fn require_map(&self, map_id: &str) -> GatewayResult<Arc<dyn MapInstance>> {
        self.registry
            .map(map_id)
            .await
            .ok_or(GatewayError::MapNotInitialized)
    }

    fn animation(&self, duration: Option<Duration>) -> Duration {
        duration
            .filter(|d| !d.is_zero())
            .unwrap_or(self.settings.default_animation)
    }
}
