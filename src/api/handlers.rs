// SPDX-License-Identifier: GPL-3.0-only
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::container::HostContainers;
use crate::gateway::{Gateway, GatewayResult, InitRequest};
use crate::geocoder::{GeocodeOptions, GeocodeRequest, SuggestOptions};
use crate::registry::models::{
    Bounds, GeoObjectKind, Geometry, LatLon, MapSummary, PropertyBag, RegistryCounts,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapArgs {
    pub map_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveToArgs {
    pub map_id: String,
    pub lat: f64,
    pub lon: f64,
    pub zoom: f64,
    /// Milliseconds; absent or zero uses the default animation
    #[serde(default)]
    pub duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetZoomArgs {
    pub map_id: String,
    pub zoom: f64,
    #[serde(default)]
    pub duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomStepArgs {
    pub map_id: String,
    #[serde(default)]
    pub duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitBoundsArgs {
    pub map_id: String,
    pub sw_lat: f64,
    pub sw_lon: f64,
    pub ne_lat: f64,
    pub ne_lon: f64,
    #[serde(default)]
    pub duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleArgs {
    pub map_id: String,
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapTypeArgs {
    pub map_id: String,
    #[serde(rename = "type")]
    pub map_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddArgs {
    pub map_id: String,
    #[serde(alias = "placemarkId", alias = "polygonId", alias = "polylineId")]
    pub object_id: String,
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: PropertyBag,
    #[serde(default)]
    pub options: PropertyBag,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveArgs {
    pub map_id: String,
    #[serde(alias = "placemarkId", alias = "polygonId", alias = "polylineId")]
    pub object_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectArgs {
    #[serde(alias = "placemarkId", alias = "polygonId", alias = "polylineId")]
    pub object_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGeometryArgs {
    #[serde(alias = "placemarkId", alias = "polygonId", alias = "polylineId")]
    pub object_id: String,
    #[serde(alias = "newGeometry")]
    pub geometry: Geometry,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePropertiesArgs {
    #[serde(alias = "placemarkId", alias = "polygonId", alias = "polylineId")]
    pub object_id: String,
    #[serde(alias = "newProperties")]
    pub properties: PropertyBag,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOptionsArgs {
    #[serde(alias = "placemarkId", alias = "polygonId", alias = "polylineId")]
    pub object_id: String,
    #[serde(alias = "newOptions")]
    pub options: PropertyBag,
}

#[derive(Debug, Deserialize)]
pub struct GeocodeArgs {
    pub request: GeocodeRequest,
    #[serde(default)]
    pub options: GeocodeOptions,
}

#[derive(Debug, Deserialize)]
pub struct SuggestArgs {
    pub request: String,
    #[serde(default)]
    pub options: SuggestOptions,
}

#[derive(Debug, Deserialize)]
pub struct ContainerArgs {
    pub id: String,
}

/// A host command, selected by its `op` field
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Command {
    Initialize(InitRequest),
    Destroy(MapArgs),

    MoveTo(MoveToArgs),
    SetZoom(SetZoomArgs),
    ZoomIn(ZoomStepArgs),
    ZoomOut(ZoomStepArgs),
    GetZoom(MapArgs),
    GetCenter(MapArgs),
    FitBounds(FitBoundsArgs),
    EnableScrollZoom(ToggleArgs),
    EnableDrag(ToggleArgs),
    SetMapType(MapTypeArgs),

    AddPlacemark(AddArgs),
    RemovePlacemark(RemoveArgs),
    UpdatePlacemarkGeometry(UpdateGeometryArgs),
    UpdatePlacemarkProperties(UpdatePropertiesArgs),
    UpdatePlacemarkOptions(UpdateOptionsArgs),
    GetPlacemark(ObjectArgs),

    AddPolygon(AddArgs),
    RemovePolygon(RemoveArgs),
    UpdatePolygonGeometry(UpdateGeometryArgs),
    UpdatePolygonProperties(UpdatePropertiesArgs),
    UpdatePolygonOptions(UpdateOptionsArgs),
    GetPolygon(ObjectArgs),

    AddPolyline(AddArgs),
    RemovePolyline(RemoveArgs),
    UpdatePolylineGeometry(UpdateGeometryArgs),
    UpdatePolylineProperties(UpdatePropertiesArgs),
    UpdatePolylineOptions(UpdateOptionsArgs),
    GetPolyline(ObjectArgs),

    Geocode(GeocodeArgs),
    Suggest(SuggestArgs),

    MountContainer(ContainerArgs),
    UnmountContainer(ContainerArgs),
    Status,
}

/// Command plus the optional correlation id echoed in the response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEnvelope {
    #[serde(default)]
    pub request_id: Option<Value>,

    #[serde(flatten)]
    pub command: Command,
}

impl CommandEnvelope {
    pub fn parse(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| format!("Invalid command: {}", e))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,

    #[serde(rename = "requestId", default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Value>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            request_id: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: Option<Value>) -> Self {
        self.request_id = request_id;
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub counts: RegistryCounts,
    pub maps: Vec<MapSummary>,
    pub mounted_containers: usize,
}

/// Executes host commands against the gateway
pub struct ApiHandlers {
    gateway: Arc<Gateway>,
    containers: Arc<HostContainers>,
    shutdown: CancellationToken,
}

fn animation(duration: Option<u64>) -> Option<Duration> {
    duration.map(Duration::from_millis)
}

fn to_data<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}

impl ApiHandlers {
    pub fn new(gateway: Arc<Gateway>, containers: Arc<HostContainers>, shutdown: CancellationToken) -> Self {
        Self {
            gateway,
            containers,
            shutdown,
        }
    }

    pub async fn health() -> ApiResponse<&'static str> {
        ApiResponse::success("ok")
    }

    pub async fn status(&self) -> StatusReport {
        let registry = self.gateway.registry();
        StatusReport {
            counts: registry.counts().await,
            maps: registry.map_summaries().await,
            mounted_containers: self.containers.mounted_count().await,
        }
    }

    pub async fn execute(&self, command: Command) -> GatewayResult<Value> {
        debug!(command = ?command, "Executing command");

        let gateway = &self.gateway;
        let data = match command {
            Command::Initialize(request) => {
                self.spawn_initialize(request);
                Value::Null
            }
            Command::Destroy(args) => to_data(gateway.destroy(&args.map_id).await?),

            Command::MoveTo(args) => {
                let center = LatLon::new(args.lat, args.lon);
                gateway
                    .move_to(&args.map_id, center, args.zoom, animation(args.duration))
                    .await?;
                Value::Null
            }
            Command::SetZoom(args) => {
                gateway.set_zoom(&args.map_id, args.zoom, animation(args.duration)).await?;
                Value::Null
            }
            Command::ZoomIn(args) => {
                gateway.zoom_in(&args.map_id, animation(args.duration)).await?;
                Value::Null
            }
            Command::ZoomOut(args) => {
                gateway.zoom_out(&args.map_id, animation(args.duration)).await?;
                Value::Null
            }
            Command::GetZoom(args) => to_data(gateway.get_zoom(&args.map_id).await?),
            Command::GetCenter(args) => to_data(gateway.get_center(&args.map_id).await?),
            Command::FitBounds(args) => {
                let bounds = Bounds::new(
                    LatLon::new(args.sw_lat, args.sw_lon),
                    LatLon::new(args.ne_lat, args.ne_lon),
                );
                gateway.fit_bounds(&args.map_id, bounds, animation(args.duration)).await?;
                Value::Null
            }
            Command::EnableScrollZoom(args) => {
                gateway.enable_scroll_zoom(&args.map_id, args.enabled).await?;
                Value::Null
            }
            Command::EnableDrag(args) => {
                gateway.enable_drag(&args.map_id, args.enabled).await?;
                Value::Null
            }
            Command::SetMapType(args) => {
                gateway.set_map_type(&args.map_id, &args.map_type).await?;
                Value::Null
            }

            Command::AddPlacemark(args) => self.add(GeoObjectKind::Placemark, args).await?,
            Command::AddPolygon(args) => self.add(GeoObjectKind::Polygon, args).await?,
            Command::AddPolyline(args) => self.add(GeoObjectKind::Polyline, args).await?,

            Command::RemovePlacemark(args) => self.remove(GeoObjectKind::Placemark, args).await?,
            Command::RemovePolygon(args) => self.remove(GeoObjectKind::Polygon, args).await?,
            Command::RemovePolyline(args) => self.remove(GeoObjectKind::Polyline, args).await?,

            Command::UpdatePlacemarkGeometry(args) => {
                self.update_geometry(GeoObjectKind::Placemark, args).await?
            }
            Command::UpdatePolygonGeometry(args) => {
                self.update_geometry(GeoObjectKind::Polygon, args).await?
            }
            Command::UpdatePolylineGeometry(args) => {
                self.update_geometry(GeoObjectKind::Polyline, args).await?
            }

            Command::UpdatePlacemarkProperties(args) => {
                self.update_properties(GeoObjectKind::Placemark, args).await?
            }
            Command::UpdatePolygonProperties(args) => {
                self.update_properties(GeoObjectKind::Polygon, args).await?
            }
            Command::UpdatePolylineProperties(args) => {
                self.update_properties(GeoObjectKind::Polyline, args).await?
            }

            Command::UpdatePlacemarkOptions(args) => {
                self.update_options(GeoObjectKind::Placemark, args).await?
            }
            Command::UpdatePolygonOptions(args) => {
                self.update_options(GeoObjectKind::Polygon, args).await?
            }
            Command::UpdatePolylineOptions(args) => {
                self.update_options(GeoObjectKind::Polyline, args).await?
            }

            Command::GetPlacemark(args) => {
                to_data(gateway.get_geo_object(GeoObjectKind::Placemark, &args.object_id).await?)
            }
            Command::GetPolygon(args) => {
                to_data(gateway.get_geo_object(GeoObjectKind::Polygon, &args.object_id).await?)
            }
            Command::GetPolyline(args) => {
                to_data(gateway.get_geo_object(GeoObjectKind::Polyline, &args.object_id).await?)
            }

            Command::Geocode(args) => to_data(gateway.geocode(&args.request, &args.options).await?),
            Command::Suggest(args) => to_data(gateway.suggest(&args.request, &args.options).await?),

            Command::MountContainer(args) => to_data(self.containers.mount(&args.id).await),
            Command::UnmountContainer(args) => to_data(self.containers.unmount(&args.id).await),
            Command::Status => to_data(self.status().await),
        };

        Ok(data)
    }

    /// Initialize runs detached; the host learns the result from the registry
    fn spawn_initialize(&self, request: InitRequest) {
        let gateway = Arc::clone(&self.gateway);
        let cancel = self.shutdown.child_token();
        let map_id = request.map_id.clone();

        info!(map_id = %map_id, "Initialize requested");
        tokio::spawn(async move {
            match gateway.initialize(request, &cancel).await {
                Ok(outcome) => debug!(map_id = %map_id, outcome = ?outcome, "Initialize finished"),
                Err(e) => error!(error = %e, map_id = %map_id, "Initialize failed"),
            }
        });
    }

    async fn add(&self, kind: GeoObjectKind, args: AddArgs) -> GatewayResult<Value> {
        self.gateway
            .add_geo_object(
                kind,
                &args.map_id,
                &args.object_id,
                args.geometry,
                args.properties,
                args.options,
            )
            .await?;
        Ok(Value::Null)
    }

    async fn remove(&self, kind: GeoObjectKind, args: RemoveArgs) -> GatewayResult<Value> {
        self.gateway
            .remove_geo_object(kind, &args.object_id, &args.map_id)
            .await?;
        Ok(Value::Null)
    }

    async fn update_geometry(&self, kind: GeoObjectKind, args: UpdateGeometryArgs) -> GatewayResult<Value> {
        self.gateway
            .update_geometry(kind, &args.object_id, args.geometry)
            .await?;
        Ok(Value::Null)
    }

    async fn update_properties(&self, kind: GeoObjectKind, args: UpdatePropertiesArgs) -> GatewayResult<Value> {
        self.gateway
            .update_properties(kind, &args.object_id, args.properties)
            .await?;
        Ok(Value::Null)
    }

    async fn update_options(&self, kind: GeoObjectKind, args: UpdateOptionsArgs) -> GatewayResult<Value> {
        self.gateway
            .update_options(kind, &args.object_id, args.options)
            .await?;
        Ok(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;
    use crate::test_helpers::{self, TestGateway};
    use serde_json::json;

    fn handlers_for(test: &TestGateway) -> ApiHandlers {
        ApiHandlers::new(
            Arc::clone(&test.gateway),
            Arc::clone(&test.containers),
            CancellationToken::new(),
        )
    }

    fn command(value: Value) -> Command {
        CommandEnvelope::parse(&value.to_string()).unwrap().command
    }

    #[test]
    fn test_parse_add_placemark() {
        let envelope = CommandEnvelope::parse(
            r#"{"op":"addPlacemark","geometry":[55.75,37.61],"mapId":"m","placemarkId":"p","requestId":7}"#,
        )
        .unwrap();

        assert_eq!(envelope.request_id, Some(json!(7)));
        match envelope.command {
            Command::AddPlacemark(args) => {
                assert_eq!(args.map_id, "m");
                assert_eq!(args.object_id, "p");
                assert_eq!(args.geometry, Geometry::Point(LatLon::new(55.75, 37.61)));
                assert!(args.properties.is_empty());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_update_with_new_prefixed_fields() {
        let parsed = command(json!({
            "op": "updatePolylineGeometry",
            "polylineId": "route",
            "newGeometry": [[55.0, 37.0], [56.0, 38.0]],
        }));
        assert!(matches!(parsed, Command::UpdatePolylineGeometry(ref args) if args.object_id == "route"));

        let parsed = command(json!({
            "op": "updatePolygonOptions",
            "polygonId": "zone",
            "newOptions": {"fillColor": "#ff000088"},
        }));
        match parsed {
            Command::UpdatePolygonOptions(args) => assert_eq!(args.options["fillColor"], json!("#ff000088")),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_op() {
        let fault = CommandEnvelope::parse(r#"{"op":"launchRocket"}"#).unwrap_err();
        assert!(fault.starts_with("Invalid command:"));

        let fault = CommandEnvelope::parse("not json").unwrap_err();
        assert!(fault.starts_with("Invalid command:"));
    }

    #[tokio::test]
    async fn test_execute_view_commands() {
        let test = test_helpers::setup_test_gateway();
        test_helpers::setup_test_map(&test, "map-1").await;
        let handlers = handlers_for(&test);

        handlers
            .execute(command(json!({"op": "setZoom", "mapId": "map-1", "zoom": 7})))
            .await
            .unwrap();
        let zoom = handlers
            .execute(command(json!({"op": "getZoom", "mapId": "map-1"})))
            .await
            .unwrap();
        assert_eq!(zoom, json!(7.0));

        handlers
            .execute(command(json!({
                "op": "moveTo", "mapId": "map-1", "lat": 59.93, "lon": 30.31, "zoom": 11, "duration": 0
            })))
            .await
            .unwrap();
        let center = handlers
            .execute(command(json!({"op": "getCenter", "mapId": "map-1"})))
            .await
            .unwrap();
        assert_eq!(center, json!([30.31, 59.93]));

        let fault = handlers
            .execute(command(json!({"op": "zoomIn", "mapId": "missing"})))
            .await
            .unwrap_err();
        assert!(matches!(fault, GatewayError::MapNotInitialized));
    }

    #[tokio::test]
    async fn test_execute_geo_object_commands() {
        let test = test_helpers::setup_test_gateway();
        test_helpers::setup_test_map(&test, "map-1").await;
        let handlers = handlers_for(&test);

        handlers
            .execute(command(json!({
                "op": "addPolygon",
                "mapId": "map-1",
                "polygonId": "zone",
                "geometry": [[[55.0, 37.0], [56.0, 38.0], [55.0, 38.0], [55.0, 37.0]]],
                "properties": {"hintContent": "Zone"},
            })))
            .await
            .unwrap();

        handlers
            .execute(command(json!({
                "op": "updatePolygonProperties",
                "polygonId": "zone",
                "newProperties": {"balloonContent": "Details"},
            })))
            .await
            .unwrap();

        let snapshot = handlers
            .execute(command(json!({"op": "getPolygon", "polygonId": "zone"})))
            .await
            .unwrap();
        assert_eq!(snapshot["mapId"], json!("map-1"));
        assert_eq!(snapshot["kind"], json!("polygon"));
        assert_eq!(snapshot["properties"]["hintContent"], json!("Zone"));
        assert_eq!(snapshot["properties"]["balloonContent"], json!("Details"));

        let fault = handlers
            .execute(command(json!({
                "op": "addPolygon",
                "mapId": "map-1",
                "polygonId": "zone",
                "geometry": [[[55.0, 37.0], [56.0, 38.0], [55.0, 37.0]]],
            })))
            .await
            .unwrap_err();
        assert_eq!(fault.to_string(), "Polygon already exists");

        handlers
            .execute(command(json!({"op": "removePolygon", "mapId": "map-1", "polygonId": "zone"})))
            .await
            .unwrap();
        let fault = handlers
            .execute(command(json!({"op": "getPolygon", "polygonId": "zone"})))
            .await
            .unwrap_err();
        assert_eq!(fault.to_string(), "Polygon not found");
    }

    #[tokio::test]
    async fn test_initialize_runs_in_background() {
        let test = test_helpers::setup_test_gateway();
        let handlers = handlers_for(&test);

        let data = handlers
            .execute(command(json!({
                "op": "initialize",
                "mapId": "map-1",
                "state": {"center": [55.75, 37.61], "zoom": 9},
                "placemarks": [{"id": "pm-1", "geometry": [55.75, 37.61]}],
            })))
            .await
            .unwrap();
        assert_eq!(data, Value::Null);

        // The map appears only once its container is mounted
        assert_eq!(test.gateway.registry().counts().await.maps, 0);
        handlers
            .execute(command(json!({"op": "mountContainer", "id": "map-1"})))
            .await
            .unwrap();

        let mut counts = RegistryCounts::default();
        for _ in 0..50 {
            counts = test.gateway.registry().counts().await;
            if counts.maps == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(counts.maps, 1);
        assert_eq!(counts.placemarks, 1);
    }

    #[tokio::test]
    async fn test_status_reports_counts() {
        let test = test_helpers::setup_test_gateway();
        test_helpers::setup_test_map(&test, "map-1").await;
        let handlers = handlers_for(&test);

        let status = handlers.execute(Command::Status).await.unwrap();
        assert_eq!(status["counts"]["maps"], json!(1));
        assert_eq!(status["mountedContainers"], json!(1));
        assert_eq!(status["maps"][0]["id"], json!("map-1"));
        assert_eq!(status["maps"][0]["mapType"], json!("map"));
        assert_eq!(status["maps"][0]["options"], json!({}));
    }

    #[test]
    fn test_response_echoes_request_id() {
        let response = ApiResponse::success(json!(3)).with_request_id(Some(json!("abc")));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, json!({"success": true, "data": 3, "error": null, "requestId": "abc"}));

        let response: ApiResponse<Value> = ApiResponse::error("Map not initialized".to_string());
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("requestId").is_none());
    }
}
