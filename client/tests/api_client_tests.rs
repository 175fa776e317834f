//! REST client integration tests against a mock backend

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use shared::{AdvisoryParams, AdvisoryResult, PressureLevel};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use farmdesk::external::{ApiClient, FarmApi};
use farmdesk::services::AdvisoryService;
use farmdesk::{AppError, Session};

fn token() -> String {
    #[derive(serde::Serialize)]
    struct Claims {
        sub: String,
        exp: i64,
    }
    encode(
        &Header::default(),
        &Claims {
            sub: "agent-17".to_string(),
            exp: Utc::now().timestamp() + 3600,
        },
        &EncodingKey::from_secret(b"backend-secret"),
    )
    .unwrap()
}

async fn client(server: &MockServer) -> (ApiClient, String) {
    let token = token();
    let session = Session::from_token(token.clone()).unwrap();
    (ApiClient::with_base_url(server.uri(), session), token)
}

#[tokio::test]
async fn test_search_sends_bearer_and_query() {
    let server = MockServer::start().await;
    let (api, token) = client(&server).await;

    Mock::given(method("GET"))
        .and(path("/farmers/search"))
        .and(query_param("q", "amina"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "first_name": "Amina",
            "last_name": "Bello",
            "phone_number": "08031234567",
            "lga": "Zaria",
            "farm_count": 2
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let farmers = api.search_farmers("amina").await.unwrap();
    assert_eq!(farmers.len(), 1);
    assert_eq!(farmers[0].farm_count, 2);
}

#[tokio::test]
async fn test_error_statuses_map_to_app_errors() {
    let server = MockServer::start().await;
    let (api, _) = client(&server).await;
    let missing = Uuid::new_v4();
    let forbidden = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!("/farmers/{}", missing)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Farmer not found"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/farmers/{}", forbidden)))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Token revoked"})))
        .mount(&server)
        .await;

    assert!(matches!(
        api.get_farmer(missing).await,
        Err(AppError::NotFound(ref m)) if m == "Farmer not found"
    ));
    assert!(matches!(
        api.get_farmer(forbidden).await,
        Err(AppError::Unauthorized(ref m)) if m == "Token revoked"
    ));
}

#[tokio::test]
async fn test_existing_boundaries_skip_unreadable_geometry() {
    let server = MockServer::start().await;
    let (api, _) = client(&server).await;
    let good = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/farms/geometries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "farm_id": good,
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[7.0, 9.0], [7.001, 9.0], [7.001, 9.001], [7.0, 9.0]]]]
                }
            },
            {
                "farm_id": Uuid::new_v4(),
                "geometry": {"type": "Point", "coordinates": [7.0, 9.0]}
            }
        ])))
        .mount(&server)
        .await;

    let boundaries = api.existing_boundaries().await.unwrap();
    assert_eq!(boundaries.len(), 1);
    assert_eq!(boundaries[0].farm_id, good);
    assert_eq!(boundaries[0].ring.vertex_count(), 3);
    // Positions on the wire are [lng, lat]
    assert_eq!(boundaries[0].ring.points()[1].lng, 7.001);
}

#[tokio::test]
async fn test_advisory_envelopes_settle_independently() {
    let server = MockServer::start().await;
    let (api, _) = client(&server).await;
    let farm_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!("/advisory/{}/fertilizer", farm_id)))
        .and(query_param("weed_pressure", "high"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"crop_type": "Maize", "recommendations": []}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/advisory/{}/crop_health", farm_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "No imagery for this season"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/advisory/{}/water_stress", farm_id)))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "success": false,
            "error": "Model crashed"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/advisory/{}/herbicide_pesticide", farm_id)))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let params = AdvisoryParams {
        weed_pressure: Some(PressureLevel::High),
        ..Default::default()
    };
    let report = AdvisoryService::new(std::sync::Arc::new(api))
        .fetch_report(farm_id, &params)
        .await;

    assert!(report.fertilizer.is_success());
    assert_eq!(
        report.crop_health,
        AdvisoryResult::Error("No imagery for this season".to_string())
    );
    assert_eq!(report.water_stress.error(), Some("Model crashed"));
    assert!(report.herbicide_pesticide.error().is_some());
    assert_eq!(report.status().to_string(), "Partial Data (1/4)");
}

#[tokio::test]
async fn test_create_farm_posts_payload() {
    let server = MockServer::start().await;
    let (api, _) = client(&server).await;
    let farmer_id = Uuid::new_v4();
    let farm_id = Uuid::new_v4();

    let draft = shared::FarmDraft {
        farmer_id: Some(farmer_id),
        farm_type: Some(shared::FarmType::Livestock),
        livestock_type: Some("Goats".to_string()),
        livestock_count: Some(20),
        ownership_status: Some(shared::OwnershipStatus::Family),
        geometry: Some(
            shared::BoundaryRing::close(vec![
                shared::LatLng::new(9.0, 7.0),
                shared::LatLng::new(9.0, 7.001),
                shared::LatLng::new(9.001, 7.001),
            ])
            .unwrap(),
        ),
        ..Default::default()
    };
    let payload = shared::compose_farm_payload(&draft).unwrap();

    Mock::given(method("POST"))
        .and(path("/farms"))
        .and(body_partial_json(json!({
            "farm_type": "livestock",
            "livestock_count": 20,
            "geometry": {"type": "MultiPolygon"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": farm_id,
            "farmer_id": farmer_id,
            "geometry": payload.geometry,
            "farm_type": "livestock",
            "ownership_status": "family",
            "livestock_type": "Goats",
            "livestock_count": 20,
            "calculated_area": payload.calculated_area,
            "created_at": Utc::now()
        })))
        .expect(1)
        .mount(&server)
        .await;

    let farm = api.create_farm(&payload).await.unwrap();
    assert_eq!(farm.id, farm_id);
    assert_eq!(farm.boundary().unwrap().vertex_count(), 3);
}
