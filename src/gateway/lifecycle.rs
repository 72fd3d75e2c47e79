// SPDX-License-Identifier: GPL-3.0-only
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::backend::GeoObject;
use crate::container::wait_for_container;
use crate::gateway::{Gateway, GatewayError, GatewayResult};
use crate::registry::models::{GeoObjectKind, GeoObjectSeed, MapState, PropertyBag};
use crate::registry::{GeoObjectEntry, MapEntry};

/// Everything needed to bring a map up in one call
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitRequest {
    pub map_id: String,

    #[serde(default)]
    pub state: MapState,

    #[serde(default)]
    pub options: PropertyBag,

    #[serde(default)]
    pub placemarks: Vec<GeoObjectSeed>,

    #[serde(default)]
    pub polygons: Vec<GeoObjectSeed>,

    #[serde(default)]
    pub polylines: Vec<GeoObjectSeed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum InitOutcome {
    /// A new map was constructed; counts are the seeds that were registered
    Created {
        placemarks: usize,
        polygons: usize,
        polylines: usize,
    },

    /// The map id was already live, nothing changed
    AlreadyInitialized,
}

impl Gateway {
    /// Wait for the map's container and the mapping library, then construct
    /// the map with its seed geo-objects and register everything.
    ///
    /// Re-initializing a live map id is a no-op. Seeds whose id is already
    /// registered are skipped. Either the map and all accepted seeds are
    /// registered, or nothing is.
    pub async fn initialize(
        &self,
        request: InitRequest,
        cancel: &CancellationToken,
    ) -> GatewayResult<InitOutcome> {
        let InitRequest {
            map_id,
            state,
            options,
            placemarks,
            polygons,
            polylines,
        } = request;

        wait_for_container(
            self.containers.as_ref(),
            &map_id,
            self.settings.container_wait,
            cancel,
        )
        .await?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
            ready = self.backend.ready() => ready.map_err(GatewayError::Backend)?,
        }

        let mut maps = self.registry.maps().write().await;
        if maps.contains_key(&map_id) {
            info!(map_id = %map_id, "Map already initialized, skipping");
            return Ok(InitOutcome::AlreadyInitialized);
        }

        let seeds = [
            (GeoObjectKind::Placemark, placemarks),
            (GeoObjectKind::Polygon, polygons),
            (GeoObjectKind::Polyline, polylines),
        ];
        for (kind, list) in &seeds {
            if list.iter().any(|seed| !kind.accepts(&seed.geometry)) {
                return Err(GatewayError::InvalidGeometry(*kind));
            }
        }

        // Lock order: maps, placemarks, polygons, polylines
        let mut placemark_table = self.registry.geo_objects(GeoObjectKind::Placemark).write().await;
        let mut polygon_table = self.registry.geo_objects(GeoObjectKind::Polygon).write().await;
        let mut polyline_table = self.registry.geo_objects(GeoObjectKind::Polyline).write().await;

        let map = self
            .backend
            .create_map(&map_id, &state, &options)
            .map_err(GatewayError::Backend)?;

        let mut staged: Vec<(GeoObjectKind, String, Arc<dyn GeoObject>)> = Vec::new();
        for (kind, list) in seeds {
            let table = match kind {
                GeoObjectKind::Placemark => &placemark_table,
                GeoObjectKind::Polygon => &polygon_table,
                GeoObjectKind::Polyline => &polyline_table,
            };

            for seed in list {
                let duplicate = staged.iter().any(|(k, id, _)| *k == kind && *id == seed.id);
                if duplicate || table.contains_key(&seed.id) {
                    warn!(map_id = %map_id, kind = %kind, object_id = %seed.id, "Seed id already registered, skipping");
                    continue;
                }

                let object = self
                    .backend
                    .create_geo_object(kind, seed.geometry, seed.properties, seed.options)
                    .map_err(GatewayError::Backend)?;
                map.add_geo_object(Arc::clone(&object))
                    .map_err(GatewayError::Backend)?;
                staged.push((kind, seed.id, object));
            }
        }

        let mut outcome = (0, 0, 0);
        for (kind, object_id, object) in staged {
            let entry = GeoObjectEntry::new(&map_id, object);
            match kind {
                GeoObjectKind::Placemark => {
                    placemark_table.insert(object_id, entry);
                    outcome.0 += 1;
                }
                GeoObjectKind::Polygon => {
                    polygon_table.insert(object_id, entry);
                    outcome.1 += 1;
                }
                GeoObjectKind::Polyline => {
                    polyline_table.insert(object_id, entry);
                    outcome.2 += 1;
                }
            }
        }

        maps.insert(map_id.clone(), MapEntry::new(map));

        info!(
            map_id = %map_id,
            placemarks = outcome.0,
            polygons = outcome.1,
            polylines = outcome.2,
            "Map initialized"
        );

        Ok(InitOutcome::Created {
            placemarks: outcome.0,
            polygons: outcome.1,
            polylines: outcome.2,
        })
    }

    /// Drop a map and every geo-object that was added to it. Returns the
    /// number of geo-objects removed.
    pub async fn destroy(&self, map_id: &str) -> GatewayResult<usize> {
        let mut maps = self.registry.maps().write().await;
        let entry = maps.remove(map_id).ok_or(GatewayError::MapNotInitialized)?;

        let mut removed = 0;
        for kind in GeoObjectKind::ALL {
            let mut table = self.registry.geo_objects(kind).write().await;
            table.retain(|object_id, object| {
                if object.map_id != map_id {
                    return true;
                }
                if let Err(e) = entry.handle.remove_geo_object(&object.handle) {
                    warn!(error = %e, map_id = %map_id, object_id = %object_id, "Failed to detach geo-object");
                }
                removed += 1;
                false
            });
        }

        if let Err(e) = self.backend.destroy_map(map_id) {
            warn!(error = %e, map_id = %map_id, "Failed to destroy map in library");
        }

        info!(map_id = %map_id, removed, "Map destroyed");
        Ok(removed)
    }
}
