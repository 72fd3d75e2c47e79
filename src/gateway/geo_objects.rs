// SPDX-License-Identifier: GPL-3.0-only
use std::sync::Arc;
use tracing::info;

use crate::backend::GeoObject;
use crate::gateway::{Gateway, GatewayError, GatewayResult};
use crate::registry::GeoObjectEntry;
use crate::registry::models::{GeoObjectKind, GeoObjectSnapshot, Geometry, PropertyBag};

impl Gateway {
    /// Construct a geo-object, attach it to the map and register it
    pub async fn add_geo_object(
        &self,
        kind: GeoObjectKind,
        map_id: &str,
        object_id: &str,
        geometry: Geometry,
        properties: PropertyBag,
        options: PropertyBag,
    ) -> GatewayResult<()> {
        let map = self.require_map(map_id).await?;

        let mut table = self.registry.geo_objects(kind).write().await;
        if table.contains_key(object_id) {
            return Err(GatewayError::AlreadyExists(kind));
        }
        if !kind.accepts(&geometry) {
            return Err(GatewayError::InvalidGeometry(kind));
        }

        let object = self
            .backend
            .create_geo_object(kind, geometry, properties, options)
            .map_err(GatewayError::Backend)?;
        map.add_geo_object(Arc::clone(&object))
            .map_err(GatewayError::Backend)?;
        table.insert(object_id.to_string(), GeoObjectEntry::new(map_id, object));

        info!(map_id = %map_id, kind = %kind, object_id = %object_id, "Added geo-object");
        Ok(())
    }

    /// Detach a geo-object from the given map's collection and drop it from
    /// the registry
    pub async fn remove_geo_object(
        &self,
        kind: GeoObjectKind,
        object_id: &str,
        map_id: &str,
    ) -> GatewayResult<()> {
        let map = self.require_map(map_id).await?;

        let mut table = self.registry.geo_objects(kind).write().await;
        let entry = table.get(object_id).ok_or(GatewayError::NotFound(kind))?;
        map.remove_geo_object(&entry.handle)
            .map_err(GatewayError::Backend)?;
        table.remove(object_id);

        info!(map_id = %map_id, kind = %kind, object_id = %object_id, "Removed geo-object");
        Ok(())
    }

    pub async fn update_geometry(
        &self,
        kind: GeoObjectKind,
        object_id: &str,
        geometry: Geometry,
    ) -> GatewayResult<()> {
        let object = self.require_geo_object(kind, object_id).await?;
        if !object.kind().accepts(&geometry) {
            return Err(GatewayError::InvalidGeometry(kind));
        }
        object.set_geometry(geometry).map_err(GatewayError::Backend)
    }

    /// Set the named properties; keys not mentioned keep their values
    pub async fn update_properties(
        &self,
        kind: GeoObjectKind,
        object_id: &str,
        properties: PropertyBag,
    ) -> GatewayResult<()> {
        let object = self.require_geo_object(kind, object_id).await?;
        object.set_properties(properties).map_err(GatewayError::Backend)
    }

    /// Set the named display options; keys not mentioned keep their values
    pub async fn update_options(
        &self,
        kind: GeoObjectKind,
        object_id: &str,
        options: PropertyBag,
    ) -> GatewayResult<()> {
        let object = self.require_geo_object(kind, object_id).await?;
        object.set_options(options).map_err(GatewayError::Backend)
    }

    pub async fn get_geo_object(
        &self,
        kind: GeoObjectKind,
        object_id: &str,
    ) -> GatewayResult<GeoObjectSnapshot> {
        self.registry
            .snapshot(kind, object_id)
            .await
            .ok_or(GatewayError::NotFound(kind))
    }

    async fn require_geo_object(
        &self,
        kind: GeoObjectKind,
        object_id: &str,
    ) -> GatewayResult<Arc<dyn GeoObject>> {
        self.registry
            .geo_object(kind, object_id)
            .await
            .ok_or(GatewayError::NotFound(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::models::LatLon;
    use crate::test_helpers::{self, bag, TestGateway};
    use serde_json::json;

    fn geometry_for(kind: GeoObjectKind, offset: f64) -> Geometry {
        let a = LatLon::new(55.0 + offset, 37.0);
        let b = LatLon::new(56.0 + offset, 38.0);
        let c = LatLon::new(55.0 + offset, 38.0);
        match kind {
            GeoObjectKind::Placemark => Geometry::Point(a),
            GeoObjectKind::Polyline => Geometry::LineString(vec![a, b]),
            GeoObjectKind::Polygon => Geometry::Polygon(vec![vec![a, b, c, a]]),
        }
    }

    async fn add(test: &TestGateway, kind: GeoObjectKind, object_id: &str, offset: f64) -> GatewayResult<()> {
        test.gateway
            .add_geo_object(
                kind,
                "map-1",
                object_id,
                geometry_for(kind, offset),
                bag(json!({"hintContent": "first", "balloonContent": "details"})),
                bag(json!({"preset": "islands#redIcon"})),
            )
            .await
    }

    async fn test_with_map() -> TestGateway {
        let test = test_helpers::setup_test_gateway();
        test_helpers::setup_test_map(&test, "map-1").await;
        test
    }

    #[tokio::test]
    async fn test_duplicate_add_keeps_first_object() {
        let test = test_with_map().await;

        for kind in GeoObjectKind::ALL {
            add(&test, kind, "obj-1", 0.0).await.unwrap();

            let fault = add(&test, kind, "obj-1", 1.0).await.unwrap_err();
            assert!(matches!(fault, GatewayError::AlreadyExists(k) if k == kind));
            assert_eq!(fault.to_string(), format!("{} already exists", kind.label()));

            let snapshot = test.gateway.get_geo_object(kind, "obj-1").await.unwrap();
            assert_eq!(snapshot.geometry, geometry_for(kind, 0.0));
        }

        let map = test.gateway.registry().map("map-1").await.unwrap();
        assert_eq!(map.geo_object_count(), 3);
    }

    #[tokio::test]
    async fn test_add_requires_map() {
        let test = test_helpers::setup_test_gateway();

        for kind in GeoObjectKind::ALL {
            let fault = add(&test, kind, "obj-1", 0.0).await.unwrap_err();
            assert!(matches!(fault, GatewayError::MapNotInitialized));
            assert!(!test.gateway.registry().contains_geo_object(kind, "obj-1").await);
        }
    }

    #[tokio::test]
    async fn test_add_rejects_mismatched_geometry() {
        let test = test_with_map().await;

        let fault = test
            .gateway
            .add_geo_object(
                GeoObjectKind::Polygon,
                "map-1",
                "pg-1",
                Geometry::Point(LatLon::new(55.0, 37.0)),
                PropertyBag::new(),
                PropertyBag::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(fault, GatewayError::InvalidGeometry(GeoObjectKind::Polygon)));
        assert!(!test.gateway.registry().contains_geo_object(GeoObjectKind::Polygon, "pg-1").await);
    }

    #[tokio::test]
    async fn test_add_rejects_empty_coordinates() {
        let test = test_with_map().await;

        for kind in [GeoObjectKind::Polygon, GeoObjectKind::Polyline] {
            let empty: Geometry = serde_json::from_value(json!([])).unwrap();
            let fault = test
                .gateway
                .add_geo_object(kind, "map-1", "empty", empty, PropertyBag::new(), PropertyBag::new())
                .await
                .unwrap_err();
            assert!(matches!(fault, GatewayError::InvalidGeometry(k) if k == kind));
            assert!(!test.gateway.registry().contains_geo_object(kind, "empty").await);
        }

        let map = test.gateway.registry().map("map-1").await.unwrap();
        assert_eq!(map.geo_object_count(), 0);
    }

    #[tokio::test]
    async fn test_remove_lifecycle() {
        let test = test_with_map().await;
        let map = test.gateway.registry().map("map-1").await.unwrap();

        for kind in GeoObjectKind::ALL {
            let fault = test.gateway.remove_geo_object(kind, "obj-1", "map-1").await.unwrap_err();
            assert_eq!(fault.to_string(), format!("{} not found", kind.label()));

            add(&test, kind, "obj-1", 0.0).await.unwrap();
            assert_eq!(map.geo_object_count(), 1);

            test.gateway.remove_geo_object(kind, "obj-1", "map-1").await.unwrap();
            assert_eq!(map.geo_object_count(), 0);
            assert!(!test.gateway.registry().contains_geo_object(kind, "obj-1").await);

            let fault = test.gateway.remove_geo_object(kind, "obj-1", "map-1").await.unwrap_err();
            assert!(matches!(fault, GatewayError::NotFound(k) if k == kind));
        }
    }

    #[tokio::test]
    async fn test_remove_requires_map() {
        let test = test_with_map().await;
        add(&test, GeoObjectKind::Placemark, "pm-1", 0.0).await.unwrap();

        let fault = test
            .gateway
            .remove_geo_object(GeoObjectKind::Placemark, "pm-1", "other-map")
            .await
            .unwrap_err();
        assert!(matches!(fault, GatewayError::MapNotInitialized));
        assert!(test.gateway.registry().contains_geo_object(GeoObjectKind::Placemark, "pm-1").await);
    }

    #[tokio::test]
    async fn test_updates_on_missing_objects_fail() {
        let test = test_with_map().await;

        for kind in GeoObjectKind::ALL {
            let geometry = test.gateway.update_geometry(kind, "ghost", geometry_for(kind, 0.0)).await;
            assert!(matches!(geometry, Err(GatewayError::NotFound(k)) if k == kind));

            let properties = test.gateway.update_properties(kind, "ghost", PropertyBag::new()).await;
            assert!(matches!(properties, Err(GatewayError::NotFound(_))));

            let options = test.gateway.update_options(kind, "ghost", PropertyBag::new()).await;
            assert!(matches!(options, Err(GatewayError::NotFound(_))));

            // Removed objects behave like never-added ones
            add(&test, kind, "gone", 0.0).await.unwrap();
            test.gateway.remove_geo_object(kind, "gone", "map-1").await.unwrap();
            let result = test.gateway.update_geometry(kind, "gone", geometry_for(kind, 1.0)).await;
            assert!(matches!(result, Err(GatewayError::NotFound(k)) if k == kind));
            let result = test.gateway.update_properties(kind, "gone", PropertyBag::new()).await;
            assert!(matches!(result, Err(GatewayError::NotFound(k)) if k == kind));
            let result = test.gateway.update_options(kind, "gone", PropertyBag::new()).await;
            assert!(matches!(result, Err(GatewayError::NotFound(k)) if k == kind));
        }
    }

    #[tokio::test]
    async fn test_update_geometry_touches_only_geometry() {
        let test = test_with_map().await;

        for kind in GeoObjectKind::ALL {
            add(&test, kind, "obj-1", 0.0).await.unwrap();
            let before = test.gateway.get_geo_object(kind, "obj-1").await.unwrap();

            test.gateway
                .update_geometry(kind, "obj-1", geometry_for(kind, 2.0))
                .await
                .unwrap();

            let after = test.gateway.get_geo_object(kind, "obj-1").await.unwrap();
            assert_eq!(after.geometry, geometry_for(kind, 2.0));
            assert_eq!(after.properties, before.properties);
            assert_eq!(after.options, before.options);
        }
    }

    #[tokio::test]
    async fn test_update_geometry_rejects_wrong_shape() {
        let test = test_with_map().await;
        add(&test, GeoObjectKind::Placemark, "pm-1", 0.0).await.unwrap();

        let fault = test
            .gateway
            .update_geometry(
                GeoObjectKind::Placemark,
                "pm-1",
                geometry_for(GeoObjectKind::Polyline, 0.0),
            )
            .await
            .unwrap_err();
        assert!(matches!(fault, GatewayError::InvalidGeometry(GeoObjectKind::Placemark)));

        let snapshot = test.gateway.get_geo_object(GeoObjectKind::Placemark, "pm-1").await.unwrap();
        assert_eq!(snapshot.geometry, geometry_for(GeoObjectKind::Placemark, 0.0));
    }

    #[tokio::test]
    async fn test_update_properties_merges() {
        let test = test_with_map().await;

        for kind in GeoObjectKind::ALL {
            add(&test, kind, "obj-1", 0.0).await.unwrap();
            let before = test.gateway.get_geo_object(kind, "obj-1").await.unwrap();

            test.gateway
                .update_properties(kind, "obj-1", bag(json!({"hintContent": "second", "iconCaption": "A"})))
                .await
                .unwrap();

            let after = test.gateway.get_geo_object(kind, "obj-1").await.unwrap();
            assert_eq!(after.properties["hintContent"], json!("second"));
            assert_eq!(after.properties["balloonContent"], json!("details"));
            assert_eq!(after.properties["iconCaption"], json!("A"));
            assert_eq!(after.geometry, before.geometry);
            assert_eq!(after.options, before.options);
        }
    }

    #[tokio::test]
    async fn test_update_options_merges() {
        let test = test_with_map().await;

        for kind in GeoObjectKind::ALL {
            add(&test, kind, "obj-1", 0.0).await.unwrap();
            let before = test.gateway.get_geo_object(kind, "obj-1").await.unwrap();

            test.gateway
                .update_options(kind, "obj-1", bag(json!({"draggable": true})))
                .await
                .unwrap();

            let after = test.gateway.get_geo_object(kind, "obj-1").await.unwrap();
            assert_eq!(after.options["draggable"], json!(true));
            assert_eq!(after.options["preset"], json!("islands#redIcon"));
            assert_eq!(after.properties, before.properties);
            assert_eq!(after.geometry, before.geometry);
        }
    }

    #[tokio::test]
    async fn test_updates_ignore_which_map_holds_object() {
        let test = test_with_map().await;
        test_helpers::setup_test_map(&test, "map-2").await;
        test.gateway
            .add_geo_object(
                GeoObjectKind::Placemark,
                "map-2",
                "pm-2",
                geometry_for(GeoObjectKind::Placemark, 0.0),
                PropertyBag::new(),
                PropertyBag::new(),
            )
            .await
            .unwrap();

        test.gateway.destroy("map-1").await.unwrap();
        test.gateway
            .update_properties(GeoObjectKind::Placemark, "pm-2", bag(json!({"name": "still here"})))
            .await
            .unwrap();

        let snapshot = test.gateway.get_geo_object(GeoObjectKind::Placemark, "pm-2").await.unwrap();
        assert_eq!(snapshot.properties["name"], json!("still here"));
    }

    #[tokio::test]
    async fn test_concurrent_adds_of_same_id_yield_one_success() {
        let test = test_with_map().await;

        let mut tasks = Vec::new();
        for i in 0..8 {
            let gateway = Arc::clone(&test.gateway);
            tasks.push(tokio::spawn(async move {
                gateway
                    .add_geo_object(
                        GeoObjectKind::Placemark,
                        "map-1",
                        "contested",
                        Geometry::Point(LatLon::new(50.0 + i as f64, 30.0)),
                        PropertyBag::new(),
                        PropertyBag::new(),
                    )
                    .await
            }));
        }

        let mut successes = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(()) => successes += 1,
                Err(fault) => assert!(matches!(fault, GatewayError::AlreadyExists(_))),
            }
        }
        assert_eq!(successes, 1);

        let map = test.gateway.registry().map("map-1").await.unwrap();
        assert_eq!(map.geo_object_count(), 1);
    }
}
