//! # Service Categories
//!
//! The fixed set of categories a listing can be filed under. One enum,
//! exhaustive `match` everywhere: adding a category forces every consumer
//! to handle it.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Category of a listed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceCategory {
    /// Carrying boxes, furniture, move-in/move-out help.
    #[serde(rename = "Moving Help")]
    MovingHelp,
    /// Rides to and from the airport.
    #[serde(rename = "Airport Rides")]
    AirportRides,
    /// Course tutoring.
    #[serde(rename = "Tutoring")]
    Tutoring,
    /// Room and apartment cleaning.
    #[serde(rename = "Cleaning")]
    Cleaning,
    /// Grocery runs, pickups, deliveries.
    #[serde(rename = "Errands")]
    Errands,
    /// Anything else.
    #[serde(rename = "Other")]
    Other,
}

/// Number of service categories.
pub const SERVICE_CATEGORY_COUNT: usize = 6;

impl ServiceCategory {
    /// All categories, in display order.
    pub fn all() -> &'static [ServiceCategory; SERVICE_CATEGORY_COUNT] {
        &[
            Self::MovingHelp,
            Self::AirportRides,
            Self::Tutoring,
            Self::Cleaning,
            Self::Errands,
            Self::Other,
        ]
    }

    /// The display name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MovingHelp => "Moving Help",
            Self::AirportRides => "Airport Rides",
            Self::Tutoring => "Tutoring",
            Self::Cleaning => "Cleaning",
            Self::Errands => "Errands",
            Self::Other => "Other",
        }
    }
}

impl Default for ServiceCategory {
    fn default() -> Self {
        Self::Other
    }
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the display name, case-insensitively, also accepting kebab-case
/// (`moving-help`) for command-line use.
impl FromStr for ServiceCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', " ");
        Self::all()
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| ValidationError::UnknownCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_has_every_variant_once() {
        let all = ServiceCategory::all();
        assert_eq!(all.len(), SERVICE_CATEGORY_COUNT);
        let mut sorted = all.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), SERVICE_CATEGORY_COUNT);
    }

    #[test]
    fn serde_matches_display_name() {
        for category in ServiceCategory::all() {
            let json = serde_json::to_string(category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
            let parsed: ServiceCategory = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, *category);
        }
    }

    #[test]
    fn from_str_is_lenient_about_case_and_dashes() {
        assert_eq!(
            "airport-rides".parse::<ServiceCategory>().unwrap(),
            ServiceCategory::AirportRides
        );
        assert_eq!(
            "MOVING HELP".parse::<ServiceCategory>().unwrap(),
            ServiceCategory::MovingHelp
        );
        assert!("Babysitting".parse::<ServiceCategory>().is_err());
    }
}
