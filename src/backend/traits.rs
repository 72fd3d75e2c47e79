// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::registry::models::{
    Behavior, Bounds, GeoObjectKind, Geometry, LatLon, MapState, MapType, PropertyBag,
};

/// Entry point into the mapping library
#[async_trait]
pub trait MapBackend: Send + Sync {
    /// Resolves once the library has finished loading
    async fn ready(&self) -> anyhow::Result<()>;

    /// Construct a map rendered into the container with the given id
    fn create_map(
        &self,
        container_id: &str,
        state: &MapState,
        options: &PropertyBag,
    ) -> anyhow::Result<Arc<dyn MapInstance>>;

    /// Tear down the map rendered into the container and release its
    /// geo-objects. Destroying an unknown container is a no-op.
    fn destroy_map(&self, container_id: &str) -> anyhow::Result<()>;

    /// Construct a detached placemark, polygon or polyline
    fn create_geo_object(
        &self,
        kind: GeoObjectKind,
        geometry: Geometry,
        properties: PropertyBag,
        options: PropertyBag,
    ) -> anyhow::Result<Arc<dyn GeoObject>>;
}

/// A live map owned by the mapping library
#[async_trait]
pub trait MapInstance: Send + Sync {
    async fn set_center(&self, center: LatLon, zoom: f64, duration: Duration) -> anyhow::Result<()>;

    async fn set_zoom(&self, zoom: f64, duration: Duration) -> anyhow::Result<()>;

    fn zoom(&self) -> f64;

    /// Current center as the library reports it, `[lon, lat]`
    fn center(&self) -> [f64; 2];

    fn map_type(&self) -> MapType;

    /// Options the map was constructed with
    fn options(&self) -> PropertyBag;

    /// Animate the viewport so it contains the bounds. Rejected animations
    /// surface as errors.
    async fn set_bounds(&self, bounds: Bounds, duration: Duration) -> anyhow::Result<()>;

    fn set_behavior(&self, behavior: Behavior, enabled: bool) -> anyhow::Result<()>;

    fn set_type(&self, map_type: MapType) -> anyhow::Result<()>;

    /// Attach a geo-object to this map's collection
    fn add_geo_object(&self, object: Arc<dyn GeoObject>) -> anyhow::Result<()>;

    /// Detach a geo-object from this map's collection. Detaching an object
    /// the map does not hold is a no-op.
    fn remove_geo_object(&self, object: &Arc<dyn GeoObject>) -> anyhow::Result<()>;

    fn geo_object_count(&self) -> usize;
}

/// A placemark, polygon or polyline owned by the mapping library
pub trait GeoObject: Send + Sync {
    fn kind(&self) -> GeoObjectKind;

    fn geometry(&self) -> Geometry;

    /// Replace the coordinates in place
    fn set_geometry(&self, geometry: Geometry) -> anyhow::Result<()>;

    fn properties(&self) -> PropertyBag;

    /// Set the named properties, leaving the others untouched
    fn set_properties(&self, properties: PropertyBag) -> anyhow::Result<()>;

    fn options(&self) -> PropertyBag;

    /// Set the named display options, leaving the others untouched
    fn set_options(&self, options: PropertyBag) -> anyhow::Result<()>;
}
