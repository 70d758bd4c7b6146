use axum::http::StatusCode;

use crate::integration::common::{BOSTON, TEST_MAX_UPLOAD, json_request, multipart_request, setup_test_app};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nnot really a png";

#[tokio::test]
async fn upload_stores_photo_and_updates_bootcamp() {
    let app = setup_test_app().await;
    let id = app.create_bootcamp("Photo Camp", BOSTON, &["UI/UX"]).await;
    let uri = format!("/api/v1/bootcamps/{id}/photo");

    let (status, json) = app
        .send(multipart_request(&uri, "file", "team.PNG", "image/png", PNG))
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    let file_name = format!("photo_{id}.png");
    assert_eq!(json, serde_json::json!({"success": true, "data": file_name}));

    let stored = std::fs::read(app.upload_dir.join(&file_name)).unwrap();
    assert_eq!(stored, PNG);

    let (_, json) = app.get(&format!("/api/v1/bootcamps/{id}")).await;
    assert_eq!(json["data"]["photo"], file_name.as_str());
}

#[tokio::test]
async fn upload_extension_follows_content_type() {
    let app = setup_test_app().await;
    let id = app.create_bootcamp("Script Camp", BOSTON, &["UI/UX"]).await;
    let uri = format!("/api/v1/bootcamps/{id}/photo");

    let (status, json) = app
        .send(multipart_request(&uri, "file", "avatar.html", "image/png", PNG))
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"], format!("photo_{id}.png"));
    assert!(!app.upload_dir.join(format!("photo_{id}.html")).exists());

    let (status, json) = app
        .send(multipart_request(
            &uri,
            "file",
            "logo.svg",
            "image/svg+xml",
            b"<svg onload=\"alert(1)\"/>",
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Please upload an image file");
}

#[tokio::test]
async fn upload_rejects_non_images() {
    let app = setup_test_app().await;
    let id = app.create_bootcamp("Text Camp", BOSTON, &["UI/UX"]).await;

    let (status, json) = app
        .send(multipart_request(
            &format!("/api/v1/bootcamps/{id}/photo"),
            "file",
            "notes.txt",
            "text/plain",
            b"hello",
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Please upload an image file");
}

#[tokio::test]
async fn upload_rejects_oversized_images() {
    let app = setup_test_app().await;
    let id = app.create_bootcamp("Big Camp", BOSTON, &["UI/UX"]).await;

    let bytes = vec![0u8; TEST_MAX_UPLOAD + 1];
    let (status, json) = app
        .send(multipart_request(
            &format!("/api/v1/bootcamps/{id}/photo"),
            "file",
            "huge.jpg",
            "image/jpeg",
            &bytes,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["error"],
        format!("Please upload an image less than {TEST_MAX_UPLOAD} bytes")
    );
    assert!(!app.upload_dir.join(format!("photo_{id}.jpg")).exists());
}

#[tokio::test]
async fn upload_requires_a_file() {
    let app = setup_test_app().await;
    let id = app.create_bootcamp("Empty Camp", BOSTON, &["UI/UX"]).await;
    let uri = format!("/api/v1/bootcamps/{id}/photo");

    let (status, json) = app
        .send(multipart_request(&uri, "avatar", "me.png", "image/png", PNG))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Please upload a file");

    let (status, json) = app
        .send(json_request("PUT", &uri, &serde_json::json!({"file": "me.png"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().starts_with("Please upload a file"));
}

#[tokio::test]
async fn upload_to_missing_bootcamp_is_not_found() {
    let app = setup_test_app().await;
    let missing = uuid::Uuid::new_v4();

    let (status, _) = app
        .send(multipart_request(
            &format!("/api/v1/bootcamps/{missing}/photo"),
            "file",
            "team.png",
            "image/png",
            PNG,
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!app.upload_dir.exists());
}
