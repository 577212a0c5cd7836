//! The fixed list of districts queried by the sync routine.
//!
//! Entries are validated once when the registry is built; after that the
//! registry is immutable and shared behind an `Arc`.

use std::collections::HashSet;

use crate::types::District;

/// Kerala's fourteen districts.
const KERALA_DISTRICTS: &[(&str, f64, f64)] = &[
    ("Thiruvananthapuram", 8.4855, 76.9492),
    ("Kollam", 8.8811, 76.5847),
    ("Pathanamthitta", 9.2667, 76.7833),
    ("Alappuzha", 9.49, 76.3264),
    ("Kottayam", 9.5869, 76.5213),
    ("Idukki", 9.85, 76.9667),
    ("Ernakulam", 9.9399, 76.2602),
    ("Thrissur", 10.5167, 76.2167),
    ("Palakkad", 10.7732, 76.6537),
    ("Malappuram", 11.042, 76.0815),
    ("Kozhikode", 11.248, 75.7804),
    ("Wayanad", 11.6994, 76.0773),
    ("Kannur", 11.4454, 75.7387),
    ("Kasaragod", 12.4984, 74.9896),
];

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RegistryError {
    #[error("District registry is empty")]
    Empty,
    #[error("District name must not be blank")]
    BlankName,
    #[error("Duplicate district name: {0}")]
    DuplicateName(String),
    #[error("Latitude {value} for {name} is outside [-90, 90]")]
    InvalidLatitude { name: String, value: f64 },
    #[error("Longitude {value} for {name} is outside [-180, 180]")]
    InvalidLongitude { name: String, value: f64 },
}

/// Immutable, validated list of districts.
#[derive(Debug, Clone)]
pub struct DistrictRegistry {
    districts: Vec<District>,
}

impl DistrictRegistry {
    /// Build a registry, rejecting blank or duplicate names (case-insensitive)
    /// and out-of-range coordinates.
    pub fn new(districts: Vec<District>) -> Result<Self, RegistryError> {
        if districts.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen = HashSet::with_capacity(districts.len());
        for district in &districts {
            let name = district.name.trim();
            if name.is_empty() {
                return Err(RegistryError::BlankName);
            }
            if !seen.insert(name.to_lowercase()) {
                return Err(RegistryError::DuplicateName(name.to_string()));
            }
            if !(-90.0..=90.0).contains(&district.latitude) {
                return Err(RegistryError::InvalidLatitude {
                    name: name.to_string(),
                    value: district.latitude,
                });
            }
            if !(-180.0..=180.0).contains(&district.longitude) {
                return Err(RegistryError::InvalidLongitude {
                    name: name.to_string(),
                    value: district.longitude,
                });
            }
        }

        Ok(Self { districts })
    }

    /// The built-in Kerala district table.
    pub fn kerala() -> Result<Self, RegistryError> {
        Self::new(
            KERALA_DISTRICTS
                .iter()
                .map(|&(name, lat, lon)| District::new(name, lat, lon))
                .collect(),
        )
    }

    /// Case-insensitive lookup; surrounding whitespace in `name` is ignored.
    pub fn find(&self, name: &str) -> Option<&District> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.districts
            .iter()
            .find(|d| d.name.to_lowercase() == needle)
    }

    pub fn iter(&self) -> impl Iterator<Item = &District> {
        self.districts.iter()
    }

    pub fn len(&self) -> usize {
        self.districts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }
}
