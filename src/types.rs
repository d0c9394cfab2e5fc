//! Enumerations accepted by the search endpoint.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SerpshotError;

/// Kind of search to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Search,
    Image,
}

impl SearchType {
    /// Wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Search => "search",
            SearchType::Image => "image",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = SerpshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "search" => Ok(SearchType::Search),
            "image" => Ok(SearchType::Image),
            other => Err(SerpshotError::validation(
                "type",
                format!("unknown search type '{}'", other),
            )),
        }
    }
}

/// Locations known to the backend for local search.
///
/// Any other location string is still accepted by the request builder;
/// these are the presets the API documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationType {
    US,
    IN,
    JP,
    BR,
    GB,
    DE,
    CA,
    FR,
    ID,
    MX,
    SG,
    IR,
}

impl LocationType {
    pub const ALL: [LocationType; 12] = [
        LocationType::US,
        LocationType::IN,
        LocationType::JP,
        LocationType::BR,
        LocationType::GB,
        LocationType::DE,
        LocationType::CA,
        LocationType::FR,
        LocationType::ID,
        LocationType::MX,
        LocationType::SG,
        LocationType::IR,
    ];

    /// Wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::US => "US",
            LocationType::IN => "IN",
            LocationType::JP => "JP",
            LocationType::BR => "BR",
            LocationType::GB => "GB",
            LocationType::DE => "DE",
            LocationType::CA => "CA",
            LocationType::FR => "FR",
            LocationType::ID => "ID",
            LocationType::MX => "MX",
            LocationType::SG => "SG",
            LocationType::IR => "IR",
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationType {
    type Err = SerpshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LocationType::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                SerpshotError::validation("location", format!("unknown location '{}'", s))
            })
    }
}

impl From<LocationType> for String {
    fn from(location: LocationType) -> Self {
        location.as_str().to_string()
    }
}
