//! Tests for the collection HTTP API

use super::*;
use crate::config::SavePolicy;
use crate::models::make_test_variant;
use axum::body::Body;
use axum::http::Request;
use tempfile::TempDir;
use tower::ServiceExt;

fn create_test_state(save_policy: SavePolicy) -> (AppState, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let catalog = Catalog::new(vec![
        make_test_variant(
            "Dark Magician",
            "Legend of Blue Eyes White Dragon",
            "LOB-005",
            "Ultra Rare",
            0,
        ),
        make_test_variant("Dark Magician", "Starter Deck", "SDY-006", "Ultra Rare", 0),
        make_test_variant(
            "Blue-Eyes White Dragon",
            "Legend of Blue Eyes White Dragon",
            "LOB-001",
            "Ultra Rare",
            0,
        ),
    ]);
    let settings = Settings {
        data_dir: temp_dir.path().to_path_buf(),
        save_policy,
        ..Settings::default()
    };
    (AppState::new(catalog, settings), temp_dir)
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn put_quantity(user: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(format!("/api/users/{}/cards", user))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[test]
fn test_app_state_clone() {
    let (state, _temp_dir) = create_test_state(SavePolicy::Manual);
    let _state2 = state.clone();
}

#[test]
fn test_cards_params_into_events() {
    let params = CardsParams {
        q: Some("dragon".to_string()),
        owned_only: Some(true),
        sets: Some("Starter Deck| Metal Raiders |".to_string()),
        sort: Some("rarity".to_string()),
        page: Some(2),
    };

    let events = params.into_events().unwrap();
    assert_eq!(events[0], EditEvent::ResetFilters);
    assert_eq!(events[1], EditEvent::SetSearch("dragon".to_string()));
    assert_eq!(events[2], EditEvent::SetOwnedOnly(true));
    assert_eq!(
        events[3],
        EditEvent::SetSets(vec![
            "Starter Deck".to_string(),
            "Metal Raiders".to_string()
        ])
    );
    assert_eq!(events[4], EditEvent::SetSort(Some(SortKey::Rarity)));
    assert_eq!(events[5], EditEvent::GoToPage(2));
}

#[test]
fn test_cards_params_rejects_unknown_sort() {
    let params = CardsParams {
        sort: Some("price".to_string()),
        ..CardsParams::default()
    };
    assert!(params.into_events().is_err());
}

#[test]
fn test_api_response_error_serialization() {
    let response: ApiResponse<()> = ApiResponse {
        success: false,
        data: None,
        error: Some("Test error".to_string()),
        warning: None,
    };

    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"success\":false"));
    assert!(json.contains("\"error\":\"Test error\""));
    assert!(!json.contains("\"data\""));
    assert!(!json.contains("\"warning\""));
}

#[tokio::test]
async fn test_sets_endpoint() {
    let (state, _temp_dir) = create_test_state(SavePolicy::Manual);
    let response = create_router(state).oneshot(get_request("/api/sets")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["data"],
        serde_json::json!(["Legend of Blue Eyes White Dragon", "Starter Deck"])
    );
}

#[tokio::test]
async fn test_cards_endpoint_filters() {
    let (state, _temp_dir) = create_test_state(SavePolicy::Manual);
    let response = create_router(state)
        .oneshot(get_request("/api/users/yugi/cards?q=DRAGON"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["total_rows"], 1);
    assert_eq!(json["data"]["rows"][0]["name"], "Blue-Eyes White Dragon");
    assert_eq!(json["data"]["rows"][0]["index"], 2);
}

#[tokio::test]
async fn test_cards_endpoint_bad_sort_is_bad_request() {
    let (state, _temp_dir) = create_test_state(SavePolicy::Manual);
    let response = create_router(state)
        .oneshot(get_request("/api/users/yugi/cards?sort=price"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_update_quantity_auto_saves() {
    let (state, temp_dir) = create_test_state(SavePolicy::Auto);
    let router = create_router(state);

    let response = router
        .clone()
        .oneshot(put_quantity(
            "yugi",
            r#"{"name": "Dark Magician", "set_name": "Starter Deck", "set_code": "SDY-006", "rarity": "Ultra Rare", "quantity": 3}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["card"]["owned_quantity"], 3);
    assert_eq!(json["data"]["previous"], 0);
    assert_eq!(json["data"]["saved"], true);
    assert!(temp_dir.path().join("collection_yugi.csv").exists());

    // The session keeps the edit between requests
    let response = router
        .oneshot(get_request("/api/users/yugi/cards?owned_only=true"))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["data"]["total_rows"], 1);
}

#[tokio::test]
async fn test_update_unknown_card_is_not_found() {
    let (state, _temp_dir) = create_test_state(SavePolicy::Manual);
    let response = create_router(state)
        .oneshot(put_quantity(
            "yugi",
            r#"{"name": "Exodia the Forbidden One", "set_name": "Starter Deck", "quantity": 1}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_negative_quantity_is_rejected() {
    let (state, _temp_dir) = create_test_state(SavePolicy::Manual);
    let response = create_router(state)
        .oneshot(put_quantity(
            "yugi",
            r#"{"name": "Dark Magician", "set_name": "Starter Deck", "quantity": -1}"#,
        ))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_manual_save_and_export() {
    let (state, temp_dir) = create_test_state(SavePolicy::Manual);
    let router = create_router(state);

    router
        .clone()
        .oneshot(put_quantity(
            "Yugi",
            r#"{"name": "Dark Magician", "set_name": "Starter Deck", "quantity": 2}"#,
        ))
        .await
        .unwrap();
    assert!(!temp_dir.path().join("collection_yugi.csv").exists());

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users/yugi/save")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["owned_printings"], 1);
    assert_eq!(json["data"]["total_cards"], 2);
    assert!(temp_dir.path().join("collection_yugi.csv").exists());

    let response = router
        .oneshot(get_request("/api/users/yugi/export"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("Dark Magician,Starter Deck,SDY-006,Ultra Rare,,2"));
}

#[tokio::test]
async fn test_invalid_user_is_bad_request() {
    let (state, _temp_dir) = create_test_state(SavePolicy::Manual);
    let response = create_router(state)
        .oneshot(get_request("/api/users/%20%20/cards"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_corrupt_collection_is_reported_until_saved() {
    let (state, temp_dir) = create_test_state(SavePolicy::Auto);
    std::fs::write(
        temp_dir.path().join("collection_yugi.csv"),
        "Name,Set,OwnedQuantity\nDark Magician,Starter Deck,-2\n",
    )
    .unwrap();
    let router = create_router(state);

    let response = router
        .clone()
        .oneshot(get_request("/api/users/yugi/cards"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert!(json["warning"].as_str().unwrap().contains("corrupt"));

    // The edit that overwrites the file still carries the warning
    let response = router
        .clone()
        .oneshot(put_quantity(
            "yugi",
            r#"{"name": "Dark Magician", "set_name": "Starter Deck", "quantity": 1}"#,
        ))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["data"]["saved"], true);
    assert!(json["warning"].is_string());

    let response = router
        .oneshot(get_request("/api/users/yugi/cards"))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert!(json.get("warning").is_none());
}

#[test]
fn test_flush_sessions_saves_dirty_sessions() {
    let (state, temp_dir) = create_test_state(SavePolicy::Manual);
    state
        .with_session("yugi", |session| {
            session.apply(EditEvent::SetQuantity {
                key: CardKey::legacy("Dark Magician", "Starter Deck"),
                quantity: 1,
            })
        })
        .unwrap();

    state.flush_sessions();
    assert!(temp_dir.path().join("collection_yugi.csv").exists());
}
