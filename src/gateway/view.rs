// SPDX-License-Identifier: GPL-3.0-only
use std::time::Duration;

use crate::gateway::{Gateway, GatewayError, GatewayResult};
use crate::registry::models::{Behavior, Bounds, LatLon, MapType};

impl Gateway {
    pub async fn move_to(
        &self,
        map_id: &str,
        center: LatLon,
        zoom: f64,
        duration: Option<Duration>,
    ) -> GatewayResult<()> {
        let map = self.require_map(map_id).await?;
        map.set_center(center, zoom, self.animation(duration))
            .await
            .map_err(GatewayError::Backend)
    }

    pub async fn set_zoom(&self, map_id: &str, zoom: f64, duration: Option<Duration>) -> GatewayResult<()> {
        let map = self.require_map(map_id).await?;
        map.set_zoom(zoom, self.animation(duration))
            .await
            .map_err(GatewayError::Backend)
    }

    pub async fn zoom_in(&self, map_id: &str, duration: Option<Duration>) -> GatewayResult<()> {
        self.zoom_by(map_id, 1.0, duration).await
    }

    pub async fn zoom_out(&self, map_id: &str, duration: Option<Duration>) -> GatewayResult<()> {
        self.zoom_by(map_id, -1.0, duration).await
    }

    async fn zoom_by(&self, map_id: &str, step: f64, duration: Option<Duration>) -> GatewayResult<()> {
        let map = self.require_map(map_id).await?;
        let target = map.zoom() + step;
        map.set_zoom(target, self.animation(duration))
            .await
            .map_err(GatewayError::Backend)
    }

    pub async fn get_zoom(&self, map_id: &str) -> GatewayResult<f64> {
        Ok(self.require_map(map_id).await?.zoom())
    }

    /// Map center exactly as the library reports it, `[lon, lat]`
    pub async fn get_center(&self, map_id: &str) -> GatewayResult<[f64; 2]> {
        Ok(self.require_map(map_id).await?.center())
    }

    pub async fn fit_bounds(
        &self,
        map_id: &str,
        bounds: Bounds,
        duration: Option<Duration>,
    ) -> GatewayResult<()> {
        let map = self.require_map(map_id).await?;
        map.set_bounds(bounds, self.animation(duration))
            .await
            .map_err(GatewayError::Backend)
    }

    pub async fn enable_scroll_zoom(&self, map_id: &str, enabled: bool) -> GatewayResult<()> {
        self.toggle_behavior(map_id, Behavior::ScrollZoom, enabled).await
    }

    pub async fn enable_drag(&self, map_id: &str, enabled: bool) -> GatewayResult<()> {
        self.toggle_behavior(map_id, Behavior::Drag, enabled).await
    }

    async fn toggle_behavior(&self, map_id: &str, behavior: Behavior, enabled: bool) -> GatewayResult<()> {
        let map = self.require_map(map_id).await?;
        map.set_behavior(behavior, enabled)
            .map_err(GatewayError::Backend)
    }

    /// Switch the base layer: "map", "satellite" or "hybrid"
    pub async fn set_map_type(&self, map_id: &str, map_type: &str) -> GatewayResult<()> {
        let map = self.require_map(map_id).await?;
        let map_type = MapType::parse(map_type)
            .ok_or_else(|| GatewayError::UnknownMapType(map_type.to_string()))?;
        map.set_type(map_type).map_err(GatewayError::Backend)
    }
}
