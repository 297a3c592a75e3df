//! Athlete record model: the registration payload, the stored record, and the
//! values derived from it (display id, age, formatted dates).

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Closed vocabularies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

/// Sports offered at registration. Serialised with their display names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sport {
    #[serde(rename = "Wheelchair Basketball")]
    WheelchairBasketball,
    #[serde(rename = "Para Swimming")]
    ParaSwimming,
    #[serde(rename = "Para Athletics")]
    ParaAthletics,
    #[serde(rename = "Wheelchair Tennis")]
    WheelchairTennis,
    #[serde(rename = "Para Powerlifting")]
    ParaPowerlifting,
    #[serde(rename = "Para Cycling")]
    ParaCycling,
    #[serde(rename = "Wheelchair Rugby")]
    WheelchairRugby,
    #[serde(rename = "Para Table Tennis")]
    ParaTableTennis,
    #[serde(rename = "Para Badminton")]
    ParaBadminton,
    #[serde(rename = "Para Archery")]
    ParaArchery,
    #[serde(rename = "Para Shooting")]
    ParaShooting,
    #[serde(rename = "Para Judo")]
    ParaJudo,
    #[serde(rename = "Para Taekwondo")]
    ParaTaekwondo,
    #[serde(rename = "Para Rowing")]
    ParaRowing,
    #[serde(rename = "Para Canoe")]
    ParaCanoe,
    #[serde(rename = "Para Triathlon")]
    ParaTriathlon,
    #[serde(rename = "Para Alpine Skiing")]
    ParaAlpineSkiing,
    #[serde(rename = "Para Cross-Country Skiing")]
    ParaCrossCountrySkiing,
    #[serde(rename = "Para Snowboarding")]
    ParaSnowboarding,
    #[serde(rename = "Para Ice Hockey")]
    ParaIceHockey,
    Other,
}

impl Sport {
    pub fn as_str(self) -> &'static str {
        match self {
            Sport::WheelchairBasketball => "Wheelchair Basketball",
            Sport::ParaSwimming => "Para Swimming",
            Sport::ParaAthletics => "Para Athletics",
            Sport::WheelchairTennis => "Wheelchair Tennis",
            Sport::ParaPowerlifting => "Para Powerlifting",
            Sport::ParaCycling => "Para Cycling",
            Sport::WheelchairRugby => "Wheelchair Rugby",
            Sport::ParaTableTennis => "Para Table Tennis",
            Sport::ParaBadminton => "Para Badminton",
            Sport::ParaArchery => "Para Archery",
            Sport::ParaShooting => "Para Shooting",
            Sport::ParaJudo => "Para Judo",
            Sport::ParaTaekwondo => "Para Taekwondo",
            Sport::ParaRowing => "Para Rowing",
            Sport::ParaCanoe => "Para Canoe",
            Sport::ParaTriathlon => "Para Triathlon",
            Sport::ParaAlpineSkiing => "Para Alpine Skiing",
            Sport::ParaCrossCountrySkiing => "Para Cross-Country Skiing",
            Sport::ParaSnowboarding => "Para Snowboarding",
            Sport::ParaIceHockey => "Para Ice Hockey",
            Sport::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisabilityType {
    #[serde(rename = "Physical Impairment")]
    Physical,
    #[serde(rename = "Visual Impairment")]
    Visual,
    #[serde(rename = "Intellectual Impairment")]
    Intellectual,
    #[serde(rename = "Hearing Impairment")]
    Hearing,
    #[serde(rename = "Multiple Disabilities")]
    Multiple,
    Other,
}

impl DisabilityType {
    pub fn as_str(self) -> &'static str {
        match self {
            DisabilityType::Physical => "Physical Impairment",
            DisabilityType::Visual => "Visual Impairment",
            DisabilityType::Intellectual => "Intellectual Impairment",
            DisabilityType::Hearing => "Hearing Impairment",
            DisabilityType::Multiple => "Multiple Disabilities",
            DisabilityType::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Advanced,
    Elite,
}

impl ExperienceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ExperienceLevel::Beginner => "Beginner",
            ExperienceLevel::Intermediate => "Intermediate",
            ExperienceLevel::Advanced => "Advanced",
            ExperienceLevel::Elite => "Elite",
        }
    }
}

// ---------------------------------------------------------------------------
// Nested value types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[validate(custom(function = "not_blank"))]
    pub street: String,
    #[validate(custom(function = "not_blank"))]
    pub city: String,
    #[validate(custom(function = "not_blank"))]
    pub state: String,
    #[validate(custom(function = "not_blank"))]
    pub postal_code: String,
    #[validate(custom(function = "not_blank"))]
    pub country: String,
}

impl Address {
    /// Single-line form used on the card: `street, city, state, postal, country`.
    pub fn full(&self) -> String {
        format!(
            "{}, {}, {}, {}, {}",
            self.street, self.city, self.state, self.postal_code, self.country
        )
    }

    /// Sum of the part lengths in characters, separators excluded.
    pub fn content_len(&self) -> usize {
        [
            &self.street,
            &self.city,
            &self.state,
            &self.postal_code,
            &self.country,
        ]
        .iter()
        .map(|s| s.chars().count())
        .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[validate(custom(function = "not_blank"))]
    pub relationship: String,
    #[validate(custom(function = "not_blank"))]
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medications: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
}

/// Card generation and delivery status, owned by the delivery pipeline.
/// Serialised inline on the record as `cardGenerated`, `cardLocation`,
/// `cardSent` and `lastCardError`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardStatus {
    #[serde(rename = "cardGenerated")]
    pub generated: bool,
    #[serde(rename = "cardLocation", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "cardSent")]
    pub sent: bool,
    #[serde(rename = "lastCardError", skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

// ---------------------------------------------------------------------------
// Display id
// ---------------------------------------------------------------------------

/// Human-readable athlete identifier: `PS` + 4-digit year + 4 digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayId(String);

impl DisplayId {
    /// Draw a fresh id for `year`. Uniqueness is the store's job.
    pub fn generate(year: i32) -> Self {
        let n: u32 = rand::rng().random_range(0..10_000);
        Self(format!("PS{year:04}{n:04}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `PS` followed by exactly eight ASCII digits.
    pub fn is_well_formed(s: &str) -> bool {
        s.len() == 10 && s.starts_with("PS") && s[2..].bytes().all(|b| b.is_ascii_digit())
    }
}

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DisplayId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Registration payload
// ---------------------------------------------------------------------------

/// Everything a registration request carries. Identity, card status and
/// timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewAthlete {
    #[validate(custom(function = "not_blank"))]
    pub first_name: String,
    #[validate(custom(function = "not_blank"))]
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    #[validate(custom(function = "not_blank"), email)]
    pub email: String,
    #[validate(custom(function = "not_blank"))]
    pub phone: String,
    #[validate(nested)]
    pub address: Address,
    pub primary_sport: Sport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_sport: Option<Sport>,
    pub disability_type: DisabilityType,
    #[validate(custom(function = "not_blank"))]
    pub disability_classification: String,
    #[validate(custom(function = "not_blank"))]
    pub impairment_description: String,
    pub experience_level: ExperienceLevel,
    pub years_of_experience: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub achievements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coach_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coach_contact: Option<String>,
    #[validate(nested)]
    pub emergency_contact: EmergencyContact,
    #[serde(default)]
    pub medical: MedicalInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<String>,
}

impl NewAthlete {
    /// Field rules from the `Validate` derive, then the birth date against
    /// `today`. Run on a [`normalized`](Self::normalized) payload.
    pub fn validate_on(&self, today: NaiveDate) -> Result<(), ValidationError> {
        if let Err(errors) = self.validate() {
            return Err(first_error(&errors, &self.email));
        }
        if self.date_of_birth > today {
            return Err(ValidationError::BirthDateInFuture(self.date_of_birth));
        }
        Ok(())
    }

    /// Trim names and lowercase the email, the way the store persists them.
    pub fn normalized(mut self) -> Self {
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self
    }
}

fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("required"));
    }
    Ok(())
}

/// Flatten nested `ValidationErrors` into `(path, code)` pairs.
fn collect_errors(errors: &ValidationErrors, prefix: &str, out: &mut Vec<(String, String)>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                out.extend(list.iter().map(|e| (path.clone(), e.code.to_string())));
            }
            ValidationErrorsKind::Struct(inner) => collect_errors(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (i, inner) in items {
                    collect_errors(inner, &format!("{path}[{i}]"), out);
                }
            }
        }
    }
}

/// Pick one error to report, preferring a missing field. Sorted so the
/// same payload always reports the same field.
fn first_error(errors: &ValidationErrors, email: &str) -> ValidationError {
    let mut found = Vec::new();
    collect_errors(errors, "", &mut found);
    found.sort();
    if let Some((path, _)) = found.iter().find(|(_, code)| code == "required") {
        return ValidationError::Missing(path.clone());
    }
    match found.into_iter().next() {
        Some((path, code)) if path == "email" && code == "email" => {
            ValidationError::InvalidEmail(email.to_string())
        }
        Some((field, code)) => ValidationError::Invalid { field, code },
        None => ValidationError::Invalid {
            field: String::new(),
            code: "unknown".into(),
        },
    }
}

// ---------------------------------------------------------------------------
// Stored record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AthleteRecord {
    pub id: Uuid,
    pub display_id: DisplayId,
    #[serde(flatten)]
    pub profile: NewAthlete,
    #[serde(flatten)]
    pub card: CardStatus,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

impl AthleteRecord {
    /// Build a fresh record. Used by stores once they have picked a display id.
    pub fn new(profile: NewAthlete, display_id: DisplayId, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_id,
            profile,
            card: CardStatus::default(),
            registered_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.profile.first_name, self.profile.last_name)
    }

    pub fn age_on(&self, today: NaiveDate) -> i32 {
        age_on(self.profile.date_of_birth, today)
    }
}

/// Elapsed whole years between `birth` and `today`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

/// `dd/mm/yyyy`.
pub fn format_dmy(date: NaiveDate) -> String {
    format!("{:02}/{:02}/{}", date.day(), date.month(), date.year())
}
