// SPDX-License-Identifier: GPL-3.0-only
use anyhow::Context;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

use crate::backend::traits::{GeoObject, MapBackend, MapInstance};
use crate::registry::models::{
    Behavior, Bounds, GeoObjectKind, Geometry, LatLon, MapState, MapType, PropertyBag,
};

/// Highest zoom level the library renders
pub const MAX_ZOOM: f64 = 23.0;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Headless mapping library keeping the whole observable object model in
/// process: view state, behaviors, base layer and geo-object collections.
pub struct InMemoryBackend {
    ready_tx: watch::Sender<bool>,
    maps: Mutex<HashMap<String, Arc<MemoryMap>>>,
    maps_created: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_ready(true)
    }

    /// A backend whose `ready()` blocks until `mark_ready` is called
    #[cfg(test)]
    pub fn loading() -> Self {
        Self::with_ready(false)
    }

    fn with_ready(ready: bool) -> Self {
        let (ready_tx, _) = watch::channel(ready);
        Self {
            ready_tx,
            maps: Mutex::new(HashMap::new()),
            maps_created: AtomicUsize::new(0),
        }
    }

    #[cfg(test)]
    pub fn mark_ready(&self) {
        self.ready_tx.send_replace(true);
    }

    /// Number of maps constructed over the backend's lifetime
    #[cfg(test)]
    pub fn maps_created(&self) -> usize {
        self.maps_created.load(Ordering::SeqCst)
    }

    /// Maps constructed and not yet destroyed
    #[cfg(test)]
    pub fn live_maps(&self) -> usize {
        lock(&self.maps).len()
    }

    /// Most recent map constructed for a container
    #[cfg(test)]
    pub fn map(&self, container_id: &str) -> Option<Arc<MemoryMap>> {
        lock(&self.maps).get(container_id).cloned()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MapBackend for InMemoryBackend {
    async fn ready(&self) -> anyhow::Result<()> {
        let mut rx = self.ready_tx.subscribe();
        rx.wait_for(|ready| *ready)
            .await
            .context("Map library ready signal closed")?;
        Ok(())
    }

    fn create_map(
        &self,
        container_id: &str,
        state: &MapState,
        options: &PropertyBag,
    ) -> anyhow::Result<Arc<dyn MapInstance>> {
        if !state.center.is_valid() {
            return Err(anyhow::anyhow!(
                "Invalid map center [{}, {}]",
                state.center.lat,
                state.center.lon
            ));
        }

        let map = Arc::new(MemoryMap::new(container_id, state, options.clone()));
        lock(&self.maps).insert(container_id.to_string(), Arc::clone(&map));
        let total = self.maps_created.fetch_add(1, Ordering::SeqCst) + 1;

        debug!(container_id = %container_id, zoom = state.zoom, total, "Constructed map");
        Ok(map)
    }

    fn destroy_map(&self, container_id: &str) -> anyhow::Result<()> {
        if let Some(map) = lock(&self.maps).remove(container_id) {
            lock(&map.geo_objects).clear();
            debug!(container_id = %container_id, "Destroyed map");
        }
        Ok(())
    }

    fn create_geo_object(
        &self,
        kind: GeoObjectKind,
        geometry: Geometry,
        properties: PropertyBag,
        options: PropertyBag,
    ) -> anyhow::Result<Arc<dyn GeoObject>> {
        if !kind.accepts(&geometry) {
            return Err(anyhow::anyhow!("Geometry does not describe a {}", kind));
        }

        Ok(Arc::new(MemoryGeoObject {
            kind,
            geometry: Mutex::new(geometry),
            properties: Mutex::new(properties),
            options: Mutex::new(options),
        }))
    }
}

#[derive(Debug, Clone)]
struct ViewState {
    center: LatLon,
    zoom: f64,
    map_type: MapType,
    behaviors: HashSet<Behavior>,
}

pub struct MemoryMap {
    container_id: String,
    options: PropertyBag,
    view: Mutex<ViewState>,
    geo_objects: Mutex<Vec<Arc<dyn GeoObject>>>,
}

impl MemoryMap {
    fn new(container_id: &str, state: &MapState, options: PropertyBag) -> Self {
        Self {
            container_id: container_id.to_string(),
            options,
            view: Mutex::new(ViewState {
                center: state.center,
                zoom: state.zoom.clamp(0.0, MAX_ZOOM),
                map_type: state.map_type.unwrap_or(MapType::Map),
                behaviors: HashSet::from([Behavior::ScrollZoom, Behavior::Drag]),
            }),
            geo_objects: Mutex::new(Vec::new()),
        }
    }

    #[cfg(test)]
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    #[cfg(test)]
    pub fn is_behavior_enabled(&self, behavior: Behavior) -> bool {
        lock(&self.view).behaviors.contains(&behavior)
    }
}

#[async_trait]
impl MapInstance for MemoryMap {
    async fn set_center(&self, center: LatLon, zoom: f64, duration: Duration) -> anyhow::Result<()> {
        let mut view = lock(&self.view);
        view.center = center;
        view.zoom = zoom.clamp(0.0, MAX_ZOOM);
        debug!(
            container_id = %self.container_id,
            lat = center.lat,
            lon = center.lon,
            zoom = view.zoom,
            duration_ms = duration.as_millis() as u64,
            "Moved map center"
        );
        Ok(())
    }

    async fn set_zoom(&self, zoom: f64, duration: Duration) -> anyhow::Result<()> {
        let mut view = lock(&self.view);
        view.zoom = zoom.clamp(0.0, MAX_ZOOM);
        debug!(
            container_id = %self.container_id,
            zoom = view.zoom,
            duration_ms = duration.as_millis() as u64,
            "Changed map zoom"
        );
        Ok(())
    }

    fn zoom(&self) -> f64 {
        lock(&self.view).zoom
    }

    fn center(&self) -> [f64; 2] {
        let center = lock(&self.view).center;
        [center.lon, center.lat]
    }

    fn map_type(&self) -> MapType {
        lock(&self.view).map_type
    }

    fn options(&self) -> PropertyBag {
        self.options.clone()
    }

    async fn set_bounds(&self, bounds: Bounds, duration: Duration) -> anyhow::Result<()> {
        if !bounds.is_valid() {
            return Err(anyhow::anyhow!("Invalid bounds"));
        }

        let sw = bounds.south_west;
        let ne = bounds.north_east;
        // Bounds crossing the antimeridian have ne.lon < sw.lon
        let lon_span = if ne.lon >= sw.lon {
            ne.lon - sw.lon
        } else {
            360.0 - (sw.lon - ne.lon)
        };
        let lat_span = ne.lat - sw.lat;
        let span = lon_span.max(lat_span);

        let zoom = if span <= 0.0 {
            MAX_ZOOM
        } else {
            (360.0 / span).log2().floor().clamp(0.0, MAX_ZOOM)
        };
        let mut center_lon = sw.lon + lon_span / 2.0;
        if center_lon > 180.0 {
            center_lon -= 360.0;
        }

        let mut view = lock(&self.view);
        view.center = LatLon::new((sw.lat + ne.lat) / 2.0, center_lon);
        view.zoom = zoom;
        debug!(
            container_id = %self.container_id,
            zoom,
            duration_ms = duration.as_millis() as u64,
            "Fitted map to bounds"
        );
        Ok(())
    }

    fn set_behavior(&self, behavior: Behavior, enabled: bool) -> anyhow::Result<()> {
        let mut view = lock(&self.view);
        if enabled {
            view.behaviors.insert(behavior);
        } else {
            view.behaviors.remove(&behavior);
        }
        debug!(
            container_id = %self.container_id,
            behavior = behavior.name(),
            enabled,
            "Toggled map behavior"
        );
        Ok(())
    }

    fn set_type(&self, map_type: MapType) -> anyhow::Result<()> {
        lock(&self.view).map_type = map_type;
        debug!(container_id = %self.container_id, layer = map_type.layer_name(), "Switched base layer");
        Ok(())
    }

    fn add_geo_object(&self, object: Arc<dyn GeoObject>) -> anyhow::Result<()> {
        lock(&self.geo_objects).push(object);
        Ok(())
    }

    fn remove_geo_object(&self, object: &Arc<dyn GeoObject>) -> anyhow::Result<()> {
        lock(&self.geo_objects)
            .retain(|held| !std::ptr::addr_eq(Arc::as_ptr(held), Arc::as_ptr(object)));
        Ok(())
    }

    fn geo_object_count(&self) -> usize {
        lock(&self.geo_objects).len()
    }
}

pub struct MemoryGeoObject {
    kind: GeoObjectKind,
    geometry: Mutex<Geometry>,
    properties: Mutex<PropertyBag>,
    options: Mutex<PropertyBag>,
}

impl GeoObject for MemoryGeoObject {
    fn kind(&self) -> GeoObjectKind {
        self.kind
    }

    fn geometry(&self) -> Geometry {
        lock(&self.geometry).clone()
    }

    fn set_geometry(&self, geometry: Geometry) -> anyhow::Result<()> {
        if !self.kind.accepts(&geometry) {
            return Err(anyhow::anyhow!("Geometry does not describe a {}", self.kind));
        }
        *lock(&self.geometry) = geometry;
        Ok(())
    }

    fn properties(&self) -> PropertyBag {
        lock(&self.properties).clone()
    }

    fn set_properties(&self, properties: PropertyBag) -> anyhow::Result<()> {
        lock(&self.properties).extend(properties);
        Ok(())
    }

    fn options(&self) -> PropertyBag {
        lock(&self.options).clone()
    }

    fn set_options(&self, options: PropertyBag) -> anyhow::Result<()> {
        lock(&self.options).extend(options);
        Ok(())
    }
}
