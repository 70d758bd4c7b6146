use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use devcamper_core::models::{Bootcamp, BootcampInput, Course, CourseInput, Location};
use devcamper_core::query::{PageRef, Pagination};

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// `{ success, data }` for single-record responses.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DataResponse {
    pub success: bool,
    #[schema(value_type = Object)]
    pub data: Value,
}

impl DataResponse {
    pub fn new(data: Value) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// `{ success, count, data }` for unpaginated collections.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CollectionResponse {
    pub success: bool,
    pub count: usize,
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Value>,
}

impl CollectionResponse {
    pub fn new(data: Vec<Value>) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PageRefResponse {
    pub page: u64,
    pub limit: u64,
}

impl From<PageRef> for PageRefResponse {
    fn from(r: PageRef) -> Self {
        Self {
            page: r.page,
            limit: r.limit,
        }
    }
}

#[derive(Debug, Default, Serialize, utoipa::ToSchema)]
pub struct PaginationResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRefResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRefResponse>,
}

impl From<Pagination> for PaginationResponse {
    fn from(p: Pagination) -> Self {
        Self {
            next: p.next.map(Into::into),
            prev: p.prev.map(Into::into),
        }
    }
}

/// `{ success, count, pagination, data }` for paginated listings.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ListResponse {
    pub success: bool,
    /// Records on this page.
    pub count: usize,
    pub pagination: PaginationResponse,
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Value>,
}

impl ListResponse {
    pub fn new(data: Vec<Value>, pagination: Pagination) -> Self {
        Self {
            success: true,
            count: data.len(),
            pagination: pagination.into(),
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// Bootcamps
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BootcampRequest {
    /// Unique, at most 50 characters
    pub name: Option<String>,
    /// At most 500 characters
    pub description: Option<String>,
    /// http(s) URL
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Free-form address, geocoded into `location`
    pub address: Option<String>,
    /// Subset of: Web Development, Mobile Development, UI/UX, Data Science, Business, Other
    pub careers: Option<Vec<String>>,
    /// 1 to 10
    pub average_rating: Option<f64>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

impl From<BootcampRequest> for BootcampInput {
    fn from(r: BootcampRequest) -> Self {
        BootcampInput {
            name: r.name,
            description: r.description,
            website: r.website,
            phone: r.phone,
            email: r.email,
            address: r.address,
            careers: r.careers,
            average_rating: r.average_rating,
            housing: r.housing,
            job_assistance: r.job_assistance,
            job_guarantee: r.job_guarantee,
            accept_gi: r.accept_gi,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationResponse {
    /// Always `Point`
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`
    #[schema(value_type = Vec<f64>)]
    pub coordinates: [f64; 2],
    pub formatted_address: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

impl From<Location> for LocationResponse {
    fn from(l: Location) -> Self {
        Self {
            kind: l.kind,
            coordinates: l.coordinates,
            formatted_address: l.formatted_address,
            street: l.street,
            city: l.city,
            state: l.state,
            zipcode: l.zipcode,
            country: l.country,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BootcampResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub location: Option<LocationResponse>,
    pub careers: Vec<String>,
    pub average_rating: Option<f64>,
    pub average_cost: Option<f64>,
    pub photo: String,
    pub housing: bool,
    pub job_assistance: bool,
    pub job_guarantee: bool,
    pub accept_gi: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Bootcamp> for BootcampResponse {
    fn from(b: Bootcamp) -> Self {
        Self {
            id: b.id,
            name: b.name,
            slug: b.slug,
            description: b.description,
            website: b.website,
            phone: b.phone,
            email: b.email,
            location: b.location.map(Into::into),
            careers: b.careers,
            average_rating: b.average_rating,
            average_cost: b.average_cost,
            photo: b.photo,
            housing: b.housing,
            job_assistance: b.job_assistance,
            job_guarantee: b.job_guarantee,
            accept_gi: b.accept_gi,
            created_at: b.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Duration, e.g. `"8"`
    pub weeks: Option<String>,
    pub tuition: Option<f64>,
    /// `beginner`, `intermediate` or `advanced`
    pub minimum_skill: Option<String>,
    pub scholarship_available: Option<bool>,
    /// Owning bootcamp; required on `POST /courses`, ignored when the route names one
    pub bootcamp: Option<Uuid>,
}

impl From<CourseRequest> for CourseInput {
    fn from(r: CourseRequest) -> Self {
        CourseInput {
            title: r.title,
            description: r.description,
            weeks: r.weeks,
            tuition: r.tuition,
            minimum_skill: r.minimum_skill,
            scholarship_available: r.scholarship_available,
            bootcamp: r.bootcamp,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub weeks: String,
    pub tuition: f64,
    pub minimum_skill: String,
    pub scholarship_available: bool,
    pub created_at: DateTime<Utc>,
    /// Owning bootcamp id; expanded to `{ id, name, description }` on
    /// `GET /courses` and `GET /courses/{id}`
    pub bootcamp: Uuid,
}

impl From<Course> for CourseResponse {
    fn from(c: Course) -> Self {
        Self {
            id: c.id,
            title: c.title,
            description: c.description,
            weeks: c.weeks,
            tuition: c.tuition,
            minimum_skill: c.minimum_skill.to_string(),
            scholarship_available: c.scholarship_available,
            created_at: c.created_at,
            bootcamp: c.bootcamp_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}
