use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use tower::ServiceExt;

use devcamper_core::testutil::FixedGeocoder;
use devcamper_db::Database;
use devcamper_server::config::ServerConfig;
use devcamper_server::routes;
use devcamper_server::state::AppState;

pub const BOSTON: &str = "233 Bay State Rd Boston MA 02215";
pub const PROVIDENCE: &str = "1 Empire St Providence RI 02903";
pub const NEW_YORK: &str = "20 W 34th St New York NY 10001";

/// Small enough to exceed cheaply in tests.
pub const TEST_MAX_UPLOAD: usize = 1024;

pub struct TestApp {
    pub router: Router,
    pub geocoder: FixedGeocoder,
    pub upload_dir: PathBuf,
    _uploads: tempfile::TempDir,
    _container: ContainerAsync<GenericImage>,
}

/// Geocoder knowing three addresses and their zipcodes.
pub fn test_geocoder() -> FixedGeocoder {
    FixedGeocoder::new()
        .with_place(BOSTON, -71.0589, 42.3601, "02215")
        .with_place("02215", -71.0589, 42.3601, "02215")
        .with_place(PROVIDENCE, -71.4128, 41.824, "02903")
        .with_place(NEW_YORK, -74.006, 40.7128, "10001")
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(ServerConfig::default(), test_geocoder()).await
}

/// Spin up a PostgreSQL container and build the router around it.
pub async fn setup_test_app_with(mut config: ServerConfig, geocoder: FixedGeocoder) -> TestApp {
    let container = GenericImage::new("postgres", "16")
        .with_exposed_port(ContainerPort::Tcp(5432))
        .with_wait_for(WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
        .with_env_var("POSTGRES_PASSWORD", "postgres")
        .with_env_var("POSTGRES_DB", "devcamper_test")
        .start()
        .await
        .expect("Failed to start PostgreSQL container");

    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get port");

    let url = format!("postgresql://postgres:postgres@{host}:{port}/devcamper_test");
    let pool = retry_connect(&url).await;

    let db = Database::from_pool(pool);
    db.migrate().await.expect("Failed to run migrations");

    let uploads = tempfile::tempdir().expect("Failed to create upload dir");
    config.file_upload_path = uploads.path().join("uploads");
    config.max_file_upload = TEST_MAX_UPLOAD;

    let state = Arc::new(AppState {
        db,
        geocoder: Arc::new(geocoder.clone()),
        config: config.clone(),
    });

    TestApp {
        router: routes::router(state),
        geocoder,
        upload_dir: config.file_upload_path,
        _uploads: uploads,
        _container: container,
    }
}

async fn retry_connect(url: &str) -> PgPool {
    for _ in 0..30 {
        if let Ok(pool) = PgPoolOptions::new().max_connections(5).connect(url).await {
            return pool;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    panic!("Failed to connect to test database");
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send(Request::delete(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        body: &serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        self.send(json_request("POST", uri, body)).await
    }

    pub async fn put_json(
        &self,
        uri: &str,
        body: &serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        self.send(json_request("PUT", uri, body)).await
    }

    /// Create a bootcamp and return its id.
    pub async fn create_bootcamp(&self, name: &str, address: &str, careers: &[&str]) -> String {
        let (status, json) = self
            .post_json("/api/v1/bootcamps", &bootcamp_body(name, address, careers))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["data"]["id"].as_str().unwrap().to_string()
    }

    /// Create a course under `bootcamp_id` and return its id.
    pub async fn create_course(&self, bootcamp_id: &str, title: &str, tuition: f64) -> String {
        let (status, json) = self
            .post_json(
                &format!("/api/v1/bootcamps/{bootcamp_id}/courses"),
                &course_body(title, tuition, "beginner"),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["data"]["id"].as_str().unwrap().to_string()
    }
}

pub fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub fn bootcamp_body(name: &str, address: &str, careers: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "description": format!("{name} is a full stack bootcamp"),
        "website": "https://example.com",
        "email": "enroll@example.com",
        "address": address,
        "careers": careers,
        "housing": true,
        "jobAssistance": true
    })
}

pub fn course_body(title: &str, tuition: f64, skill: &str) -> serde_json::Value {
    serde_json::json!({
        "title": title,
        "description": format!("{title} from scratch"),
        "weeks": "8",
        "tuition": tuition,
        "minimumSkill": skill,
        "scholarshipAvailable": false
    })
}

/// Build a `multipart/form-data` request with a single file part.
pub fn multipart_request(
    uri: &str,
    field: &str,
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> Request<Body> {
    const BOUNDARY: &str = "devcamper-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::put(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}
