// SPDX-License-Identifier: GPL-3.0-only
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Free-form key/value bag used for geo-object properties and display options
pub type PropertyBag = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoObjectKind {
    Placemark,
    Polygon,
    Polyline,
}

impl GeoObjectKind {
    pub const ALL: [GeoObjectKind; 3] = [
        GeoObjectKind::Placemark,
        GeoObjectKind::Polygon,
        GeoObjectKind::Polyline,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            GeoObjectKind::Placemark => "Placemark",
            GeoObjectKind::Polygon => "Polygon",
            GeoObjectKind::Polyline => "Polyline",
        }
    }

    /// Whether the geometry has the shape this kind is built from.
    /// Empty coordinate lists are never accepted.
    pub fn accepts(&self, geometry: &Geometry) -> bool {
        match (self, geometry) {
            (GeoObjectKind::Placemark, Geometry::Point(_)) => true,
            (GeoObjectKind::Polyline, Geometry::LineString(points)) => !points.is_empty(),
            (GeoObjectKind::Polygon, Geometry::Polygon(rings)) => {
                !rings.is_empty() && rings.iter().all(|ring| !ring.is_empty())
            }
            _ => false,
        }
    }
}

impl fmt::Display for GeoObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A coordinate pair, written on the wire as `[lat, lon]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

impl From<[f64; 2]> for LatLon {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

impl From<LatLon> for [f64; 2] {
    fn from(point: LatLon) -> Self {
        [point.lat, point.lon]
    }
}

/// Geometry of a geo-object. Placemarks are points, polylines are line
/// strings and polygons are a list of rings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Geometry {
    Point(LatLon),
    LineString(Vec<LatLon>),
    Polygon(Vec<Vec<LatLon>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapType {
    Map,
    Satellite,
    Hybrid,
}

impl MapType {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "map" => Some(MapType::Map),
            "satellite" => Some(MapType::Satellite),
            "hybrid" => Some(MapType::Hybrid),
            _ => None,
        }
    }

    /// Base layer name understood by the mapping library
    pub fn layer_name(&self) -> &'static str {
        match self {
            MapType::Map => "yandex#map",
            MapType::Satellite => "yandex#satellite",
            MapType::Hybrid => "yandex#hybrid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Behavior {
    ScrollZoom,
    Drag,
}

impl Behavior {
    pub fn name(&self) -> &'static str {
        match self {
            Behavior::ScrollZoom => "scrollZoom",
            Behavior::Drag => "drag",
        }
    }
}

/// South-west / north-east viewport rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south_west: LatLon,
    pub north_east: LatLon,
}

impl Bounds {
    pub fn new(south_west: LatLon, north_east: LatLon) -> Self {
        Self { south_west, north_east }
    }

    pub fn is_valid(&self) -> bool {
        self.south_west.is_valid()
            && self.north_east.is_valid()
            && self.south_west.lat <= self.north_east.lat
    }
}

/// Initial state a map is constructed with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapState {
    pub center: LatLon,
    pub zoom: f64,

    #[serde(default, rename = "type")]
    pub map_type: Option<MapType>,
}

impl Default for MapState {
    fn default() -> Self {
        Self {
            center: LatLon::new(0.0, 0.0),
            zoom: 0.0,
            map_type: None,
        }
    }
}

/// A geo-object created together with its map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoObjectSeed {
    pub id: String,
    pub geometry: Geometry,

    #[serde(default)]
    pub properties: PropertyBag,

    #[serde(default)]
    pub options: PropertyBag,
}

/// Point-in-time copy of a registered geo-object
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoObjectSnapshot {
    pub id: String,
    pub kind: GeoObjectKind,
    pub map_id: String,
    pub geometry: Geometry,
    pub properties: PropertyBag,
    pub options: PropertyBag,
}

/// Per-map line of the registry status report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSummary {
    pub id: String,
    pub zoom: f64,
    pub center: [f64; 2],
    pub map_type: MapType,
    pub options: PropertyBag,
    pub geo_objects: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryCounts {
    pub maps: usize,
    pub placemarks: usize,
    pub polygons: usize,
    pub polylines: usize,
}
