use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use devcamper_core::AppError;

use crate::integration::common::{
    BOSTON, NEW_YORK, PROVIDENCE, bootcamp_body, setup_test_app,
};

#[tokio::test]
async fn root_and_health() {
    let app = setup_test_app().await;

    let (status, json) = app.get("/api/v1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "DevCamper API");

    let (status, json) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], "ok");
}

#[tokio::test]
async fn responses_do_not_advertise_the_framework() {
    let app = setup_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/api/v1/bootcamps").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-powered-by").is_none());
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_get_update_delete_bootcamp() {
    let app = setup_test_app().await;

    let (status, json) = app
        .post_json(
            "/api/v1/bootcamps",
            &bootcamp_body("Devworks Bootcamp", BOSTON, &["Web Development", "UI/UX"]),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], true);

    let data = &json["data"];
    let id = data["id"].as_str().unwrap().to_string();
    assert_eq!(data["slug"], "devworks-bootcamp");
    assert_eq!(data["photo"], "no-photo.jpg");
    assert_eq!(data["location"]["type"], "Point");
    assert_eq!(
        data["location"]["coordinates"],
        serde_json::json!([-71.0589, 42.3601])
    );
    assert_eq!(data["location"]["zipcode"], "02215");
    assert!(data.get("address").is_none());
    assert!(data["averageCost"].is_null());

    let (status, json) = app.get(&format!("/api/v1/bootcamps/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["name"], "Devworks Bootcamp");
    assert_eq!(json["data"]["housing"], true);

    // Moving the bootcamp re-geocodes it; renaming refreshes the slug.
    let (status, json) = app
        .put_json(
            &format!("/api/v1/bootcamps/{id}"),
            &serde_json::json!({"name": "Devworks Providence", "address": PROVIDENCE}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["slug"], "devworks-providence");
    assert_eq!(json["data"]["location"]["zipcode"], "02903");
    assert_eq!(json["data"]["description"], "Devworks Bootcamp is a full stack bootcamp");

    let (status, json) = app.delete(&format!("/api/v1/bootcamps/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({"success": true, "data": {}}));

    let (status, json) = app.get(&format!("/api/v1/bootcamps/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], format!("Bootcamp not found with id of {id}"));
}

#[tokio::test]
async fn malformed_id_is_not_found() {
    let app = setup_test_app().await;

    let (status, json) = app.get("/api/v1/bootcamps/5d725a1b7b292f5f8ceff788").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        json["error"],
        "Resource not found with id of 5d725a1b7b292f5f8ceff788"
    );

    let (status, _) = app.delete("/api/v1/courses/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_fields_are_reported_together() {
    let app = setup_test_app().await;

    let (status, json) = app
        .post_json("/api/v1/bootcamps", &serde_json::json!({"careers": ["Business"]}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = json["error"].as_str().unwrap();
    assert!(error.contains("Please add a name"), "{error}");
    assert!(error.contains("Please add a description"), "{error}");
    assert!(error.contains("Please add an address"), "{error}");

    // Nothing reached the geocoder.
    assert!(app.geocoder.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_json_is_bad_request() {
    let app = setup_test_app().await;

    let response = app
        .send(
            Request::post("/api/v1/bootcamps")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.0, StatusCode::BAD_REQUEST);
    assert_eq!(response.1["success"], false);
}

#[tokio::test]
async fn duplicate_name_is_bad_request() {
    let app = setup_test_app().await;
    app.create_bootcamp("ModernTech", BOSTON, &["Business"]).await;

    let (status, json) = app
        .post_json(
            "/api/v1/bootcamps",
            &bootcamp_body("ModernTech", PROVIDENCE, &["Business"]),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Duplicate field value entered");
}

#[tokio::test]
async fn unknown_address_is_bad_request() {
    let app = setup_test_app().await;

    let (status, json) = app
        .post_json(
            "/api/v1/bootcamps",
            &bootcamp_body("Nowhere Academy", "1 Nowhere Lane", &["Other"]),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("1 Nowhere Lane"));
}

#[tokio::test]
async fn geocoder_outage_is_bad_gateway() {
    let app = setup_test_app().await;
    let _ = app
        .geocoder
        .clone()
        .with_error(AppError::GeocoderError("quota exceeded".into()));

    let (status, json) = app
        .post_json(
            "/api/v1/bootcamps",
            &bootcamp_body("Devcentral", BOSTON, &["Web Development"]),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"], "Geocoder error: quota exceeded");

    let (_, json) = app.get("/api/v1/bootcamps").await;
    assert_eq!(json["count"], 0);
}

#[tokio::test]
async fn update_missing_bootcamp_skips_geocoding() {
    let app = setup_test_app().await;
    let id = uuid::Uuid::new_v4();

    let (status, _) = app
        .put_json(
            &format!("/api/v1/bootcamps/{id}"),
            &serde_json::json!({"address": BOSTON}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.geocoder.queries.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_paginates_with_links() {
    let app = setup_test_app().await;
    for name in ["Alpha Camp", "Bravo Camp", "Charlie Camp"] {
        app.create_bootcamp(name, BOSTON, &["Web Development"]).await;
    }

    let (status, json) = app.get("/api/v1/bootcamps?limit=2&sort=name").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["count"], 2);
    assert_eq!(json["data"][0]["name"], "Alpha Camp");
    assert_eq!(
        json["pagination"],
        serde_json::json!({"next": {"page": 2, "limit": 2}})
    );

    let (_, json) = app.get("/api/v1/bootcamps?limit=2&page=2&sort=name").await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["data"][0]["name"], "Charlie Camp");
    assert_eq!(
        json["pagination"],
        serde_json::json!({"prev": {"page": 1, "limit": 2}})
    );
}

#[tokio::test]
async fn list_defaults_to_newest_first() {
    let app = setup_test_app().await;
    app.create_bootcamp("First Camp", BOSTON, &["Business"]).await;
    app.create_bootcamp("Second Camp", BOSTON, &["Business"]).await;

    let (_, json) = app.get("/api/v1/bootcamps").await;
    assert_eq!(json["data"][0]["name"], "Second Camp");
    assert_eq!(json["data"][1]["name"], "First Camp");
}

#[tokio::test]
async fn list_filters_and_selects() {
    let app = setup_test_app().await;
    app.create_bootcamp("Web Camp", BOSTON, &["Web Development"]).await;
    app.create_bootcamp("Data Camp", PROVIDENCE, &["Data Science", "Business"])
        .await;

    let (status, json) = app
        .get("/api/v1/bootcamps?careers%5Bin%5D=Data%20Science&select=name,careers")
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["count"], 1);

    let record = json["data"][0].as_object().unwrap();
    assert_eq!(record["name"], "Data Camp");
    let mut keys: Vec<&str> = record.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, ["careers", "id", "name"]);

    let (_, json) = app.get("/api/v1/bootcamps?location.zipcode=02903").await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["data"][0]["name"], "Data Camp");

    let (_, json) = app.get("/api/v1/bootcamps?housing=true").await;
    assert_eq!(json["count"], 2);
}

#[tokio::test]
async fn list_rejects_unknown_fields() {
    let app = setup_test_app().await;

    let (status, json) = app.get("/api/v1/bootcamps?password=x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Unknown filter field 'password'");

    let (status, _) = app.get("/api/v1/bootcamps?sort=-secret").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/v1/bootcamps?averageCost%5Bregex%5D=.*").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_embeds_courses() {
    let app = setup_test_app().await;
    let id = app.create_bootcamp("Course Camp", BOSTON, &["Web Development"]).await;
    app.create_course(&id, "Front End Web Development", 8000.0).await;

    let (_, json) = app.get("/api/v1/bootcamps").await;
    let courses = json["data"][0]["courses"].as_array().unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0]["title"], "Front End Web Development");
    assert_eq!(courses[0]["bootcamp"], id.as_str());

    // The single-record read does not embed them.
    let (_, json) = app.get(&format!("/api/v1/bootcamps/{id}")).await;
    assert!(json["data"].get("courses").is_none());
}

// ---------------------------------------------------------------------------
// Radius
// ---------------------------------------------------------------------------

#[tokio::test]
async fn radius_search_uses_configured_unit() {
    let app = setup_test_app().await;
    app.create_bootcamp("Boston Camp", BOSTON, &["Business"]).await;
    app.create_bootcamp("Providence Camp", PROVIDENCE, &["Business"]).await;
    app.create_bootcamp("New York Camp", NEW_YORK, &["Business"]).await;

    // Providence is about 41 miles from Boston, New York about 190.
    let (status, json) = app.get("/api/v1/bootcamps/radius/02215/50").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["count"], 2);
    let names: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"Boston Camp"));
    assert!(names.contains(&"Providence Camp"));

    let (_, json) = app.get("/api/v1/bootcamps/radius/02215/250").await;
    assert_eq!(json["count"], 3);
}

#[tokio::test]
async fn radius_search_rejects_bad_input() {
    let app = setup_test_app().await;

    let (status, _) = app.get("/api/v1/bootcamps/radius/02215/far").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/v1/bootcamps/radius/02215/-5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/v1/bootcamps/radius/00000/10").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
