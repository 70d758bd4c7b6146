use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::AppError;
use crate::query::{Field, FieldKind};
use crate::util::slugify;

pub const CAREERS: [&str; 6] = [
    "Web Development",
    "Mobile Development",
    "UI/UX",
    "Data Science",
    "Business",
    "Other",
];

const NAME_MAX: usize = 50;
const DESCRIPTION_MAX: usize = 500;
const PHONE_MAX: usize = 20;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$").expect("valid email regex")
});

/// Queryable bootcamp fields, by JSON name.
pub static BOOTCAMP_FIELDS: [Field; 24] = [
    Field::new("id", "id", FieldKind::Id),
    Field::new("name", "name", FieldKind::Text),
    Field::new("slug", "slug", FieldKind::Text),
    Field::new("description", "description", FieldKind::Text),
    Field::new("website", "website", FieldKind::Text),
    Field::new("phone", "phone", FieldKind::Text),
    Field::new("email", "email", FieldKind::Text),
    Field::new("location", "", FieldKind::Object),
    Field::new("location.street", "street", FieldKind::Text),
    Field::new("location.city", "city", FieldKind::Text),
    Field::new("location.state", "state", FieldKind::Text),
    Field::new("location.zipcode", "zipcode", FieldKind::Text),
    Field::new("location.country", "country", FieldKind::Text),
    Field::new("location.formattedAddress", "formatted_address", FieldKind::Text),
    Field::new("careers", "careers", FieldKind::TextList),
    Field::new("averageRating", "average_rating", FieldKind::Number),
    Field::new("averageCost", "average_cost", FieldKind::Number),
    Field::new("photo", "photo", FieldKind::Text),
    Field::new("housing", "housing", FieldKind::Boolean),
    Field::new("jobAssistance", "job_assistance", FieldKind::Boolean),
    Field::new("jobGuarantee", "job_guarantee", FieldKind::Boolean),
    Field::new("acceptGi", "accept_gi", FieldKind::Boolean),
    Field::new("createdAt", "created_at", FieldKind::Timestamp),
    Field::new("courses", "", FieldKind::Object),
];

/// Queryable course fields, by JSON name.
pub static COURSE_FIELDS: [Field; 9] = [
    Field::new("id", "id", FieldKind::Id),
    Field::new("title", "title", FieldKind::Text),
    Field::new("description", "description", FieldKind::Text),
    Field::new("weeks", "weeks", FieldKind::Text),
    Field::new("tuition", "tuition", FieldKind::Number),
    Field::new("minimumSkill", "minimum_skill", FieldKind::Text),
    Field::new("scholarshipAvailable", "scholarship_available", FieldKind::Boolean),
    Field::new("createdAt", "created_at", FieldKind::Timestamp),
    Field::new("bootcamp", "bootcamp_id", FieldKind::Id),
];

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// A geocoded point plus its descriptive address parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
    pub formatted_address: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

impl Location {
    pub fn point(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [longitude, latitude],
            formatted_address: None,
            street: None,
            city: None,
            state: None,
            zipcode: None,
            country: None,
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

// ---------------------------------------------------------------------------
// Bootcamp
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bootcamp {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub location: Option<Location>,
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

/// Validated bootcamp ready for insertion. `address` is geocoded, not stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBootcamp {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: String,
    pub careers: Vec<String>,
    pub average_rating: Option<f64>,
    pub housing: bool,
    pub job_assistance: bool,
    pub job_guarantee: bool,
    pub accept_gi: bool,
}

/// Validated partial update. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BootcampChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub careers: Option<Vec<String>>,
    pub average_rating: Option<f64>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

/// Raw bootcamp fields as submitted by a client or seed file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootcampInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub careers: Option<Vec<String>>,
    pub average_rating: Option<f64>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

impl BootcampInput {
    /// Validate for creation: every required field must be present.
    pub fn into_new(self) -> Result<NewBootcamp, AppError> {
        let mut errors = Errors::default();

        let name = errors.required(self.name, "Please add a name");
        let description = errors.required(self.description, "Please add a description");
        let address = errors.required(self.address, "Please add an address");
        // An absent list is reported by `checked` as empty.
        let careers = self.careers.unwrap_or_default();

        let draft = BootcampChanges {
            name: Some(name),
            slug: None,
            description: Some(description),
            website: self.website,
            phone: self.phone,
            email: self.email,
            address: Some(address),
            careers: Some(careers),
            average_rating: self.average_rating,
            housing: self.housing,
            job_assistance: self.job_assistance,
            job_guarantee: self.job_guarantee,
            accept_gi: self.accept_gi,
        };
        let draft = draft.checked(errors)?;

        let name = draft.name.unwrap_or_default();
        Ok(NewBootcamp {
            slug: slugify(&name),
            name,
            description: draft.description.unwrap_or_default(),
            website: draft.website,
            phone: draft.phone,
            email: draft.email,
            address: draft.address.unwrap_or_default(),
            careers: draft.careers.unwrap_or_default(),
            average_rating: draft.average_rating,
            housing: draft.housing.unwrap_or(false),
            job_assistance: draft.job_assistance.unwrap_or(false),
            job_guarantee: draft.job_guarantee.unwrap_or(false),
            accept_gi: draft.accept_gi.unwrap_or(false),
        })
    }

    /// Validate for a partial update: only supplied fields are checked.
    pub fn into_changes(self) -> Result<BootcampChanges, AppError> {
        let mut errors = Errors::default();
        let name = self
            .name
            .map(|n| errors.required(Some(n), "Please add a name"));
        let description = self
            .description
            .map(|d| errors.required(Some(d), "Please add a description"));
        let address = self
            .address
            .map(|a| errors.required(Some(a), "Please add an address"));

        let mut changes = BootcampChanges {
            name,
            slug: None,
            description,
            website: self.website,
            phone: self.phone,
            email: self.email,
            address,
            careers: self.careers,
            average_rating: self.average_rating,
            housing: self.housing,
            job_assistance: self.job_assistance,
            job_guarantee: self.job_guarantee,
            accept_gi: self.accept_gi,
        }
        .checked(errors)?;

        changes.slug = changes.name.as_deref().map(slugify);
        Ok(changes)
    }
}

impl BootcampChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn checked(self, mut errors: Errors) -> Result<Self, AppError> {
        if let Some(name) = &self.name
            && name.chars().count() > NAME_MAX
        {
            errors.push(format!("Name cannot be more than {NAME_MAX} chars"));
        }
        if let Some(description) = &self.description
            && description.chars().count() > DESCRIPTION_MAX
        {
            errors.push(format!(
                "Description cannot be more than {DESCRIPTION_MAX} chars"
            ));
        }
        if let Some(website) = &self.website
            && !is_web_url(website)
        {
            errors.push("Please use a valid URL with HTTP or HTTPS");
        }
        if let Some(phone) = &self.phone
            && phone.chars().count() > PHONE_MAX
        {
            errors.push(format!(
                "Phone number can not be longer than {PHONE_MAX} characters"
            ));
        }
        if let Some(email) = &self.email
            && !EMAIL.is_match(email)
        {
            errors.push("Please add a valid email");
        }
        if let Some(careers) = &self.careers {
            if careers.is_empty() {
                errors.push("Please add at least one career");
            }
            for career in careers.iter() {
                if !CAREERS.contains(&career.as_str()) {
                    errors.push(format!("`{career}` is not a valid career"));
                }
            }
        }
        if let Some(rating) = self.average_rating {
            if rating < 1.0 {
                errors.push("Rating must be at least 1");
            } else if rating > 10.0 {
                errors.push("Rating can not be more than 10");
            }
        }

        errors.finish()?;
        Ok(self)
    }
}

fn is_web_url(raw: &str) -> bool {
    Url::parse(raw).is_ok_and(|url| {
        matches!(url.scheme(), "http" | "https")
            && url.host_str().is_some_and(|host| host.contains('.'))
    })
}

// ---------------------------------------------------------------------------
// Course
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl SkillLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "beginner",
            SkillLevel::Intermediate => "intermediate",
            SkillLevel::Advanced => "advanced",
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(SkillLevel::Beginner),
            "intermediate" => Ok(SkillLevel::Intermediate),
            "advanced" => Ok(SkillLevel::Advanced),
            other => Err(format!("`{other}` is not a valid minimum skill")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub weeks: String,
    pub tuition: f64,
    pub minimum_skill: SkillLevel,
    pub scholarship_available: bool,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "bootcamp")]
    pub bootcamp_id: Uuid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCourse {
    pub bootcamp_id: Uuid,
    pub title: String,
    pub description: String,
    pub weeks: String,
    pub tuition: f64,
    pub minimum_skill: SkillLevel,
    pub scholarship_available: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub weeks: Option<String>,
    pub tuition: Option<f64>,
    pub minimum_skill: Option<SkillLevel>,
    pub scholarship_available: Option<bool>,
}

impl CourseChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Raw course fields as submitted by a client or seed file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub weeks: Option<String>,
    pub tuition: Option<f64>,
    pub minimum_skill: Option<String>,
    pub scholarship_available: Option<bool>,
    /// Owning bootcamp, when not implied by the route.
    pub bootcamp: Option<Uuid>,
}

impl CourseInput {
    pub fn into_new(self, bootcamp_id: Uuid) -> Result<NewCourse, AppError> {
        let mut errors = Errors::default();

        let title = errors.required(self.title, "Please add a course title");
        let description = errors.required(self.description, "Please add a description");
        let weeks = errors.required(self.weeks, "Please add a number of weeks");
        let tuition = match self.tuition {
            Some(t) => errors.tuition(t),
            None => {
                errors.push("Please add a tuition cost");
                0.0
            }
        };
        let minimum_skill = match self.minimum_skill {
            Some(raw) => errors.skill(&raw),
            None => {
                errors.push("Please add a minimum skill");
                None
            }
        };

        errors.finish()?;
        Ok(NewCourse {
            bootcamp_id,
            title,
            description,
            weeks,
            tuition,
            minimum_skill: minimum_skill.unwrap_or(SkillLevel::Beginner),
            scholarship_available: self.scholarship_available.unwrap_or(false),
        })
    }

    pub fn into_changes(self) -> Result<CourseChanges, AppError> {
        let mut errors = Errors::default();

        let changes = CourseChanges {
            title: self
                .title
                .map(|t| errors.required(Some(t), "Please add a course title")),
            description: self
                .description
                .map(|d| errors.required(Some(d), "Please add a description")),
            weeks: self
                .weeks
                .map(|w| errors.required(Some(w), "Please add a number of weeks")),
            tuition: self.tuition.map(|t| errors.tuition(t)),
            minimum_skill: self.minimum_skill.and_then(|raw| errors.skill(&raw)),
            scholarship_available: self.scholarship_available,
        };

        errors.finish()?;
        Ok(changes)
    }
}

// ---------------------------------------------------------------------------
// Validation accumulator
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Errors(Vec<String>);

impl Errors {
    fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    /// Trim a required text field, recording `message` when missing or blank.
    fn required(&mut self, value: Option<String>, message: &str) -> String {
        let trimmed = value.map(|v| v.trim().to_string()).unwrap_or_default();
        if trimmed.is_empty() {
            self.push(message);
        }
        trimmed
    }

    fn tuition(&mut self, tuition: f64) -> f64 {
        if !tuition.is_finite() || tuition < 0.0 {
            self.push("Tuition can not be negative");
        }
        tuition
    }

    fn skill(&mut self, raw: &str) -> Option<SkillLevel> {
        raw.trim()
            .parse()
            .map_err(|e: String| self.push(e))
            .ok()
    }

    fn finish(self) -> Result<(), AppError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.0.join(", ")))
        }
    }
}
