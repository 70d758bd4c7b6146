use utoipa::OpenApi;

/// Paths are documented under the default `/api/v1` mount point.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "DevCamper API",
        version = "0.1.0",
        description = "Bootcamp directory with courses, filtering, pagination and radius search."
    ),
    paths(
        crate::routes::api_root,
        crate::routes::list_bootcamps,
        crate::routes::get_bootcamp,
        crate::routes::create_bootcamp,
        crate::routes::update_bootcamp,
        crate::routes::delete_bootcamp,
        crate::routes::bootcamps_in_radius,
        crate::routes::upload_photo,
        crate::routes::list_courses,
        crate::routes::list_bootcamp_courses,
        crate::routes::get_course,
        crate::routes::create_course,
        crate::routes::create_bootcamp_course,
        crate::routes::update_course,
        crate::routes::delete_course,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::MessageResponse,
        crate::dto::DataResponse,
        crate::dto::CollectionResponse,
        crate::dto::ListResponse,
        crate::dto::PaginationResponse,
        crate::dto::PageRefResponse,
        crate::dto::BootcampRequest,
        crate::dto::BootcampResponse,
        crate::dto::LocationResponse,
        crate::dto::CourseRequest,
        crate::dto::CourseResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "bootcamps", description = "Bootcamp listings, radius search and photos"),
        (name = "courses", description = "Courses offered by bootcamps"),
        (name = "system", description = "Health and API banner"),
    )
)]
pub struct ApiDoc;
