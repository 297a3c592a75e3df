//! Sample athlete profiles for testing and demonstration.
//!
//! Each profile exercises a different branch of the card layout.

use chrono::NaiveDate;

use crate::record::{
    Address, DisabilityType, EmergencyContact, ExperienceLevel, Gender, MedicalInfo, NewAthlete,
    Sport,
};

/// Compact profile: no coach, no photo, short address. Stays at the default
/// body font size.
pub fn short_profile() -> NewAthlete {
    NewAthlete {
        first_name: "Asha".into(),
        last_name: "Patel".into(),
        date_of_birth: NaiveDate::from_ymd_opt(1998, 4, 12).unwrap_or_default(),
        gender: Gender::Female,
        email: "asha.patel@example.org".into(),
        phone: "+91 98765 43210".into(),
        address: Address {
            street: "12 Elm St".into(),
            city: "Pune".into(),
            state: "MH".into(),
            postal_code: "411001".into(),
            country: "India".into(),
        },
        primary_sport: Sport::ParaSwimming,
        secondary_sport: None,
        disability_type: DisabilityType::Physical,
        disability_classification: "S6".into(),
        impairment_description: "Limb deficiency".into(),
        experience_level: ExperienceLevel::Intermediate,
        years_of_experience: 4,
        achievements: None,
        coach_name: None,
        coach_contact: None,
        emergency_contact: EmergencyContact {
            name: "Ravi Patel".into(),
            relationship: "Father".into(),
            phone: "+91 91234 56789".into(),
        },
        medical: MedicalInfo::default(),
        profile_photo: None,
    }
}

/// Verbose profile: coach present, long free-text fields and a long address.
/// Its content length is well above the font-downgrade threshold.
pub fn long_profile() -> NewAthlete {
    NewAthlete {
        first_name: "Maximilian Alexander".into(),
        last_name: "Fitzgerald-Worthington".into(),
        date_of_birth: NaiveDate::from_ymd_opt(1989, 11, 30).unwrap_or_default(),
        gender: Gender::Male,
        email: "max.fw@example.com".into(),
        phone: "+44 7700 900123".into(),
        address: Address {
            street: "Flat 4B, The Old Granary, 221 Riverside Embankment Road".into(),
            city: "Kingston upon Thames".into(),
            state: "Greater London".into(),
            postal_code: "KT1 1AA".into(),
            country: "United Kingdom".into(),
        },
        primary_sport: Sport::ParaCrossCountrySkiing,
        secondary_sport: Some(Sport::WheelchairBasketball),
        disability_type: DisabilityType::Multiple,
        disability_classification: "LW10-1 provisional, review pending".into(),
        impairment_description: "Spinal cord injury with partial visual impairment".into(),
        experience_level: ExperienceLevel::Elite,
        years_of_experience: 14,
        achievements: Some("World Cup podium 2022".into()),
        coach_name: Some("Dr. Evangeline Montgomery-Hawthorne".into()),
        coach_contact: Some("evangeline.montgomery@example.com".into()),
        emergency_contact: EmergencyContact {
            name: "Penelope Fitzgerald-Worthington".into(),
            relationship: "Spouse".into(),
            phone: "+44 7700 900456".into(),
        },
        medical: MedicalInfo {
            conditions: Some("Asthma".into()),
            medications: None,
            allergies: Some("Penicillin".into()),
        },
        profile_photo: None,
    }
}

/// Profile with a photo reference (relative to the uploads directory).
pub fn profile_with_photo(photo: &str) -> NewAthlete {
    NewAthlete {
        profile_photo: Some(photo.to_string()),
        email: "photo.athlete@example.org".into(),
        ..short_profile()
    }
}

/// Sample registration payload as JSON, the shape the CLI reads.
pub fn short_profile_json() -> String {
    serde_json::to_string_pretty(&short_profile()).unwrap_or_default()
}
