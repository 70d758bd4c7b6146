use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use devcamper_core::AppError;
use devcamper_core::geo::{RadiusQuery, parse_distance};
use devcamper_core::models::{BOOTCAMP_FIELDS, BootcampInput, COURSE_FIELDS, Course, CourseInput};
use devcamper_core::query::{Relation, ResultQuery, project};
use devcamper_core::traits::resolve;

use crate::dto::{
    BootcampRequest, BootcampResponse, CollectionResponse, CourseRequest, CourseResponse,
    DataResponse, HealthResponse, ListResponse, MessageResponse,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;
use crate::upload;

type Params = Result<Query<Vec<(String, String)>>, QueryRejection>;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let photo_limit = state
        .config
        .max_file_upload
        .saturating_add(upload::MULTIPART_OVERHEAD);

    let api = Router::new()
        .route("/", get(api_root))
        .route("/bootcamps", get(list_bootcamps).post(create_bootcamp))
        .route(
            "/bootcamps/radius/{zipcode}/{distance}",
            get(bootcamps_in_radius),
        )
        .route(
            "/bootcamps/{id}",
            get(get_bootcamp).put(update_bootcamp).delete(delete_bootcamp),
        )
        .route(
            "/bootcamps/{id}/photo",
            put(upload_photo).layer(DefaultBodyLimit::max(photo_limit)),
        )
        .route(
            "/bootcamps/{id}/courses",
            get(list_bootcamp_courses).post(create_bootcamp_course),
        )
        .route("/courses", get(list_courses).post(create_course))
        .route(
            "/courses/{id}",
            get(get_course).put(update_course).delete(delete_course),
        );

    let public = Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest_service("/uploads", ServeDir::new(&state.config.file_upload_path));

    public.nest(&state.config.base_uri, api).with_state(state)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::MalformedId(raw.to_string()))
}

/// Serialize a response record. A failure here is ours, not the client's.
fn to_json<T: Serialize>(value: T) -> Result<Value, AppError> {
    serde_json::to_value(value)
        .map_err(|e| AppError::Generic(format!("Failed to serialize response: {e}")))
}

/// Apply the requested projection, if any.
fn select_fields(record: Value, select: Option<&[&'static str]>) -> Value {
    match select {
        Some(names) => project(record, names),
        None => record,
    }
}

fn wants(select: Option<&[&'static str]>, field: &str) -> bool {
    select.is_none_or(|names| names.contains(&field))
}

/// Store `related` under the relation's path, narrowed to its sub-projection.
fn attach(record: &mut Value, relation: &Relation, related: Value) {
    let related = match &relation.select {
        Some(names) => {
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            match related {
                Value::Array(items) => {
                    Value::Array(items.into_iter().map(|i| project(i, &names)).collect())
                }
                other => project(other, &names),
            }
        }
        None => related,
    };
    if let Value::Object(map) = record {
        map.insert(relation.path.to_string(), related);
    }
}

/// Serialize courses, replacing each bootcamp id with the related record.
async fn expand_bootcamps(
    state: &AppState,
    courses: Vec<Course>,
    relation: &Relation,
) -> Result<Vec<Value>, AppError> {
    let ids: Vec<Uuid> = courses
        .iter()
        .map(|c| c.bootcamp_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let mut bootcamps = HashMap::new();
    for bootcamp in state.db.bootcamp_repo().get_many(&ids).await? {
        bootcamps.insert(bootcamp.id, to_json(BootcampResponse::from(bootcamp))?);
    }

    courses
        .into_iter()
        .map(|course| {
            let bootcamp = bootcamps.get(&course.bootcamp_id).cloned();
            let mut value = to_json(CourseResponse::from(course))?;
            if let Some(bootcamp) = bootcamp {
                attach(&mut value, relation, bootcamp);
            }
            Ok(value)
        })
        .collect()
}

fn course_relation() -> Relation {
    Relation::new("bootcamp").select("name,description")
}

// ---------------------------------------------------------------------------
// Root
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1",
    responses((status = 200, description = "API banner", body = MessageResponse)),
    tag = "system"
)]
pub async fn api_root() -> impl IntoResponse {
    Json(MessageResponse {
        message: "DevCamper API",
    })
}

// ---------------------------------------------------------------------------
// Bootcamps
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/bootcamps",
    params(
        ("select" = Option<String>, Query, description = "Comma-separated fields to return"),
        ("sort" = Option<String>, Query, description = "Comma-separated sort keys, `-` for descending"),
        ("page" = Option<u64>, Query, description = "1-indexed page (default 1)"),
        ("limit" = Option<u64>, Query, description = "Page size (default 20)"),
    ),
    responses(
        (status = 200, description = "Bootcamps with their courses", body = ListResponse),
        (status = 400, description = "Invalid filter", body = crate::dto::ErrorResponse),
    ),
    tag = "bootcamps"
)]
pub async fn list_bootcamps(
    State(state): State<Arc<AppState>>,
    params: Params,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params?;
    let query = ResultQuery::parse(&params, &BOOTCAMP_FIELDS, &state.config.query)?;
    let select = query.selected_names();
    let select = select.as_deref();

    let page = state.db.bootcamp_repo().list(&query).await?;

    let relation = Relation::new("courses");
    let mut courses: HashMap<Uuid, Vec<Value>> = HashMap::new();
    if wants(select, relation.path) {
        let ids: Vec<Uuid> = page.items.iter().map(|b| b.id).collect();
        for course in state.db.course_repo().for_bootcamps(&ids).await? {
            courses
                .entry(course.bootcamp_id)
                .or_default()
                .push(to_json(CourseResponse::from(course))?);
        }
    }

    let pagination = page.pagination.clone();
    let data = page
        .items
        .into_iter()
        .map(|bootcamp| {
            let id = bootcamp.id;
            let mut value = to_json(BootcampResponse::from(bootcamp))?;
            attach(
                &mut value,
                &relation,
                Value::Array(courses.remove(&id).unwrap_or_default()),
            );
            Ok(select_fields(value, select))
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    Ok(Json(ListResponse::new(data, pagination)))
}

#[utoipa::path(
    get,
    path = "/api/v1/bootcamps/{id}",
    params(("id" = Uuid, Path, description = "Bootcamp ID")),
    responses(
        (status = 200, description = "Bootcamp", body = DataResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    tag = "bootcamps"
)]
pub async fn get_bootcamp(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let bootcamp = state
        .db
        .bootcamp_repo()
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Bootcamp", id))?;

    Ok(Json(DataResponse::new(to_json(BootcampResponse::from(
        bootcamp,
    ))?)))
}

#[utoipa::path(
    post,
    path = "/api/v1/bootcamps",
    request_body = BootcampRequest,
    responses(
        (status = 201, description = "Bootcamp created", body = DataResponse),
        (status = 400, description = "Validation failed or duplicate name", body = crate::dto::ErrorResponse),
        (status = 502, description = "Geocoder unavailable", body = crate::dto::ErrorResponse),
    ),
    tag = "bootcamps"
)]
pub async fn create_bootcamp(
    State(state): State<Arc<AppState>>,
    body: Result<Json<BootcampRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let bootcamp = BootcampInput::from(body).into_new()?;
    let location = resolve(state.geocoder.as_ref(), &bootcamp.address, "address").await?;

    let created = state.db.bootcamp_repo().create(&bootcamp, &location).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(to_json(BootcampResponse::from(created))?)),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/bootcamps/{id}",
    params(("id" = Uuid, Path, description = "Bootcamp ID")),
    request_body = BootcampRequest,
    responses(
        (status = 200, description = "Bootcamp updated", body = DataResponse),
        (status = 400, description = "Validation failed", body = crate::dto::ErrorResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    tag = "bootcamps"
)]
pub async fn update_bootcamp(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<BootcampRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    let changes = BootcampInput::from(body).into_changes()?;
    let repo = state.db.bootcamp_repo();

    // Only spend a geocoder call on a bootcamp that exists.
    let location = match &changes.address {
        Some(address) => {
            if repo.get(id).await?.is_none() {
                return Err(AppError::not_found("Bootcamp", id).into());
            }
            Some(resolve(state.geocoder.as_ref(), address, "address").await?)
        }
        None => None,
    };

    let updated = repo
        .update(id, &changes, location.as_ref())
        .await?
        .ok_or_else(|| AppError::not_found("Bootcamp", id))?;

    Ok(Json(DataResponse::new(to_json(BootcampResponse::from(
        updated,
    ))?)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/bootcamps/{id}",
    params(("id" = Uuid, Path, description = "Bootcamp ID")),
    responses(
        (status = 200, description = "Bootcamp and its courses deleted", body = DataResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    tag = "bootcamps"
)]
pub async fn delete_bootcamp(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    if !state.db.bootcamp_repo().delete(id).await? {
        return Err(AppError::not_found("Bootcamp", id).into());
    }

    Ok(Json(DataResponse::new(serde_json::json!({}))))
}

#[utoipa::path(
    get,
    path = "/api/v1/bootcamps/radius/{zipcode}/{distance}",
    params(
        ("zipcode" = String, Path, description = "Postal code of the centre point"),
        ("distance" = f64, Path, description = "Radius in the configured unit"),
    ),
    responses(
        (status = 200, description = "Bootcamps within the radius", body = CollectionResponse),
        (status = 400, description = "Bad distance or unknown zipcode", body = crate::dto::ErrorResponse),
        (status = 502, description = "Geocoder unavailable", body = crate::dto::ErrorResponse),
    ),
    tag = "bootcamps"
)]
pub async fn bootcamps_in_radius(
    State(state): State<Arc<AppState>>,
    Path((zipcode, distance)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let distance = parse_distance(&distance)?;
    let center = resolve(state.geocoder.as_ref(), &zipcode, "zipcode").await?;
    let radius = RadiusQuery::new(&center, distance, state.config.radius_unit);

    let bootcamps = state.db.bootcamp_repo().within_radius(&radius).await?;
    tracing::debug!(%zipcode, distance, found = bootcamps.len(), "Radius search");

    let data = bootcamps
        .into_iter()
        .map(|b| to_json(BootcampResponse::from(b)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(CollectionResponse::new(data)))
}

#[utoipa::path(
    put,
    path = "/api/v1/bootcamps/{id}/photo",
    params(("id" = Uuid, Path, description = "Bootcamp ID")),
    request_body(content_type = "multipart/form-data", description = "Image in the `file` field"),
    responses(
        (status = 200, description = "Stored file name", body = DataResponse),
        (status = 400, description = "Missing, non-image or oversized file", body = crate::dto::ErrorResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    tag = "bootcamps"
)]
pub async fn upload_photo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let repo = state.db.bootcamp_repo();
    if repo.get(id).await?.is_none() {
        return Err(AppError::not_found("Bootcamp", id).into());
    }

    let mut multipart = multipart?;
    let photo = upload::read_photo(&mut multipart, state.config.max_file_upload).await?;

    let file_name = upload::photo_file_name(id, photo.extension);
    upload::store(&state.config.file_upload_path, &file_name, &photo.bytes).await?;

    repo.set_photo(id, &file_name)
        .await?
        .ok_or_else(|| AppError::not_found("Bootcamp", id))?;

    Ok(Json(DataResponse::new(Value::String(file_name))))
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/courses",
    params(
        ("select" = Option<String>, Query, description = "Comma-separated fields to return"),
        ("sort" = Option<String>, Query, description = "Comma-separated sort keys, `-` for descending"),
        ("page" = Option<u64>, Query, description = "1-indexed page (default 1)"),
        ("limit" = Option<u64>, Query, description = "Page size (default 20)"),
    ),
    responses(
        (status = 200, description = "Courses with bootcamp name and description", body = ListResponse),
        (status = 400, description = "Invalid filter", body = crate::dto::ErrorResponse),
    ),
    tag = "courses"
)]
pub async fn list_courses(
    State(state): State<Arc<AppState>>,
    params: Params,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params?;
    let query = ResultQuery::parse(&params, &COURSE_FIELDS, &state.config.query)?;
    let select = query.selected_names();
    let select = select.as_deref();

    let page = state.db.course_repo().list(&query, None).await?;
    let pagination = page.pagination.clone();

    let relation = course_relation();
    let data = if wants(select, relation.path) {
        expand_bootcamps(&state, page.items, &relation).await?
    } else {
        page.items
            .into_iter()
            .map(|c| to_json(CourseResponse::from(c)))
            .collect::<Result<Vec<_>, _>>()?
    };
    let data = data
        .into_iter()
        .map(|v| select_fields(v, select))
        .collect();

    Ok(Json(ListResponse::new(data, pagination)))
}

#[utoipa::path(
    get,
    path = "/api/v1/bootcamps/{id}/courses",
    params(("id" = Uuid, Path, description = "Bootcamp ID")),
    responses(
        (status = 200, description = "Courses of one bootcamp", body = ListResponse),
        (status = 404, description = "Bootcamp not found", body = crate::dto::ErrorResponse),
    ),
    tag = "courses"
)]
pub async fn list_bootcamp_courses(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    params: Params,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let Query(params) = params?;
    let query = ResultQuery::parse(&params, &COURSE_FIELDS, &state.config.query)?;
    let select = query.selected_names();

    if state.db.bootcamp_repo().get(id).await?.is_none() {
        return Err(AppError::not_found("Bootcamp", id).into());
    }

    let page = state.db.course_repo().list(&query, Some(id)).await?;
    let pagination = page.pagination.clone();
    let data = page
        .items
        .into_iter()
        .map(|c| Ok(select_fields(to_json(CourseResponse::from(c))?, select.as_deref())))
        .collect::<Result<Vec<_>, AppError>>()?;

    Ok(Json(ListResponse::new(data, pagination)))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course with bootcamp name and description", body = DataResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    tag = "courses"
)]
pub async fn get_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let course = state
        .db
        .course_repo()
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Course", id))?;

    let mut data = expand_bootcamps(&state, vec![course], &course_relation()).await?;
    Ok(Json(DataResponse::new(data.pop().unwrap_or(Value::Null))))
}

async fn insert_course(
    state: &AppState,
    input: CourseInput,
    bootcamp_id: Uuid,
) -> Result<(StatusCode, Json<DataResponse>), ApiError> {
    let course = input.into_new(bootcamp_id)?;
    let created = state.db.course_repo().create(&course).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(to_json(CourseResponse::from(created))?)),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses",
    request_body = CourseRequest,
    responses(
        (status = 201, description = "Course created", body = DataResponse),
        (status = 400, description = "Validation failed", body = crate::dto::ErrorResponse),
        (status = 404, description = "Bootcamp not found", body = crate::dto::ErrorResponse),
    ),
    tag = "courses"
)]
pub async fn create_course(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CourseRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let input = CourseInput::from(body);
    let bootcamp_id = input
        .bootcamp
        .ok_or_else(|| AppError::Validation("Please add a bootcamp".into()))?;

    insert_course(&state, input, bootcamp_id).await
}

#[utoipa::path(
    post,
    path = "/api/v1/bootcamps/{id}/courses",
    params(("id" = Uuid, Path, description = "Bootcamp ID")),
    request_body = CourseRequest,
    responses(
        (status = 201, description = "Course created", body = DataResponse),
        (status = 400, description = "Validation failed", body = crate::dto::ErrorResponse),
        (status = 404, description = "Bootcamp not found", body = crate::dto::ErrorResponse),
    ),
    tag = "courses"
)]
pub async fn create_bootcamp_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<CourseRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let bootcamp_id = parse_id(&id)?;
    let Json(body) = body?;

    insert_course(&state, CourseInput::from(body), bootcamp_id).await
}

#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = CourseRequest,
    responses(
        (status = 200, description = "Course updated", body = DataResponse),
        (status = 400, description = "Validation failed", body = crate::dto::ErrorResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    tag = "courses"
)]
pub async fn update_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<CourseRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    let changes = CourseInput::from(body).into_changes()?;

    let updated = state
        .db
        .course_repo()
        .update(id, &changes)
        .await?
        .ok_or_else(|| AppError::not_found("Course", id))?;

    Ok(Json(DataResponse::new(to_json(CourseResponse::from(updated))?)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course deleted", body = DataResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    tag = "courses"
)]
pub async fn delete_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    if !state.db.course_repo().delete(id).await? {
        return Err(AppError::not_found("Course", id).into());
    }

    Ok(Json(DataResponse::new(serde_json::json!({}))))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let db_status = match state.db.health_check().await {
        Ok(()) => "ok",
        Err(_) => "error",
    };

    let status = if db_status == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if db_status == "ok" {
            "healthy"
        } else {
            "unhealthy"
        },
        database: db_status,
    };

    (status, Json(response))
}
