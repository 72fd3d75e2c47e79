// SPDX-License-Identifier: GPL-3.0-only
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::backend::{GeoObject, MapInstance};
use crate::registry::models::{GeoObjectKind, GeoObjectSnapshot, MapSummary, RegistryCounts};

pub type GeoObjectTable = HashMap<String, GeoObjectEntry>;
pub type MapTable = HashMap<String, MapEntry>;

#[derive(Clone)]
pub struct MapEntry {
    pub handle: Arc<dyn MapInstance>,
    pub created_at: DateTime<Utc>,
}

impl MapEntry {
    pub fn new(handle: Arc<dyn MapInstance>) -> Self {
        Self {
            handle,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct GeoObjectEntry {
    /// Map the object was attached to when it was added
    pub map_id: String,
    pub handle: Arc<dyn GeoObject>,
}

impl GeoObjectEntry {
    pub fn new(map_id: &str, handle: Arc<dyn GeoObject>) -> Self {
        Self {
            map_id: map_id.to_string(),
            handle,
        }
    }
}

/// Identifier-keyed tables of live map and geo-object handles.
///
/// Each kind has its own table and lock. Operations that check for an id
/// and then insert it hold the table's write lock for the whole sequence.
#[derive(Default)]
pub struct Registry {
    maps: RwLock<MapTable>,
    placemarks: RwLock<GeoObjectTable>,
    polygons: RwLock<GeoObjectTable>,
    polylines: RwLock<GeoObjectTable>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn maps(&self) -> &RwLock<MapTable> {
        &self.maps
    }

    pub fn geo_objects(&self, kind: GeoObjectKind) -> &RwLock<GeoObjectTable> {
        match kind {
            GeoObjectKind::Placemark => &self.placemarks,
            GeoObjectKind::Polygon => &self.polygons,
            GeoObjectKind::Polyline => &self.polylines,
        }
    }

    pub async fn map(&self, map_id: &str) -> Option<Arc<dyn MapInstance>> {
        self.maps
            .read()
            .await
            .get(map_id)
            .map(|entry| Arc::clone(&entry.handle))
    }

    pub async fn geo_object(&self, kind: GeoObjectKind, object_id: &str) -> Option<Arc<dyn GeoObject>> {
        self.geo_objects(kind)
            .read()
            .await
            .get(object_id)
            .map(|entry| Arc::clone(&entry.handle))
    }

    #[cfg(test)]
    pub async fn contains_geo_object(&self, kind: GeoObjectKind, object_id: &str) -> bool {
        self.geo_objects(kind).read().await.contains_key(object_id)
    }

    pub async fn snapshot(&self, kind: GeoObjectKind, object_id: &str) -> Option<GeoObjectSnapshot> {
        let table = self.geo_objects(kind).read().await;
        let entry = table.get(object_id)?;
        Some(GeoObjectSnapshot {
            id: object_id.to_string(),
            kind,
            map_id: entry.map_id.clone(),
            geometry: entry.handle.geometry(),
            properties: entry.handle.properties(),
            options: entry.handle.options(),
        })
    }

    pub async fn counts(&self) -> RegistryCounts {
        RegistryCounts {
            maps: self.maps.read().await.len(),
            placemarks: self.placemarks.read().await.len(),
            polygons: self.polygons.read().await.len(),
            polylines: self.polylines.read().await.len(),
        }
    }

    /// Summaries of all live maps, ordered by id
    pub async fn map_summaries(&self) -> Vec<MapSummary> {
        let maps = self.maps.read().await;
        let mut summaries: Vec<MapSummary> = maps
            .iter()
            .map(|(id, entry)| MapSummary {
                id: id.clone(),
                zoom: entry.handle.zoom(),
                center: entry.handle.center(),
                map_type: entry.handle.map_type(),
                options: entry.handle.options(),
                geo_objects: entry.handle.geo_object_count(),
                created_at: entry.created_at,
            })
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }
}
