//! Typed cache keys for perishable upstream data.

use crate::{KisanError, KisanResult};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Suffix appended to a payload key to form its paired timestamp key.
pub const TIMESTAMP_SUFFIX: &str = ":timestamp";

/// Separator between the segments of a fast cache key.
pub const KEY_SEPARATOR: char = ':';

/// The closed set of perishable data kinds served through the cache.
///
/// Every kind is structurally identical from the cache's point of view;
/// they differ only in key suffix, upstream endpoint and payload type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataKind {
    /// Seven-day district forecast.
    #[serde(rename = "7DAY")]
    SevenDayForecast,
    /// Current surface observation.
    #[serde(rename = "CURRENT")]
    CurrentObservation,
    /// Zero to three hour nowcast.
    #[serde(rename = "NOWCAST")]
    Nowcast,
    /// Severe weather alerts.
    #[serde(rename = "ALERTS")]
    SevereAlert,
    /// Rainfall departure statistics.
    #[serde(rename = "RAINFALL")]
    RainfallDeparture,
    /// Agro-meteorological advisories.
    #[serde(rename = "AGROMET")]
    AgrometAdvisory,
}

impl DataKind {
    /// Every kind, in a stable order.
    pub const ALL: [Self; 6] = [
        Self::SevenDayForecast,
        Self::CurrentObservation,
        Self::Nowcast,
        Self::SevereAlert,
        Self::RainfallDeparture,
        Self::AgrometAdvisory,
    ];

    /// Returns the key token. Casing is preserved in the wire format.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::SevenDayForecast => "7DAY",
            Self::CurrentObservation => "CURRENT",
            Self::Nowcast => "NOWCAST",
            Self::SevereAlert => "ALERTS",
            Self::RainfallDeparture => "RAINFALL",
            Self::AgrometAdvisory => "AGROMET",
        }
    }

    /// Returns the key namespace this kind belongs to.
    #[must_use]
    pub const fn domain(self) -> &'static str {
        "weather"
    }

    /// Returns a human-readable label for user-facing messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SevenDayForecast => "7-day forecast",
            Self::CurrentObservation => "current weather",
            Self::Nowcast => "nowcast",
            Self::SevereAlert => "weather alerts",
            Self::RainfallDeparture => "rainfall statistics",
            Self::AgrometAdvisory => "agromet advisories",
        }
    }
}

impl Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for DataKind {
    type Err = KisanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.token().eq_ignore_ascii_case(token))
            .ok_or_else(|| KisanError::validation(format!("Unknown data kind: '{token}'")))
    }
}

/// A normalized `(district, state)` location.
///
/// Both parts are trimmed and lower-cased on construction, so equality
/// and hashing are case-insensitive with respect to the caller's input.
/// The trimmed input is kept as-is for display.
#[derive(Debug, Clone)]
pub struct LocationKey {
    district: String,
    state: String,
    label: String,
}

impl LocationKey {
    /// Creates a normalized location key.
    ///
    /// Fails when either part is empty after trimming or contains the key
    /// separator `:`.
    pub fn new(district: &str, state: &str) -> KisanResult<Self> {
        let district = check_part("District", district)?;
        let state = check_part("State", state)?;

        Ok(Self {
            label: format!("{district}, {state}"),
            district: district.to_lowercase(),
            state: state.to_lowercase(),
        })
    }

    /// Returns the normalized district.
    #[must_use]
    pub fn district(&self) -> &str {
        &self.district
    }

    /// Returns the normalized state.
    #[must_use]
    pub fn state(&self) -> &str {
        &self.state
    }
}

impl PartialEq for LocationKey {
    fn eq(&self, other: &Self) -> bool {
        self.district == other.district && self.state == other.state
    }
}

impl Eq for LocationKey {}

impl Hash for LocationKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.district.hash(state);
        self.state.hash(state);
    }
}

impl Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

fn check_part<'a>(name: &str, part: &'a str) -> KisanResult<&'a str> {
    let part = part.trim();
    if part.is_empty() {
        return Err(KisanError::validation(format!("{name} must not be empty")));
    }
    if part.contains(KEY_SEPARATOR) {
        return Err(KisanError::validation(format!(
            "{name} must not contain '{KEY_SEPARATOR}'"
        )));
    }
    Ok(part)
}

/// Composite cache identifier: data kind plus normalized location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: DataKind,
    location: LocationKey,
}

impl CacheKey {
    /// Creates a cache key.
    #[must_use]
    pub const fn new(kind: DataKind, location: LocationKey) -> Self {
        Self { kind, location }
    }

    /// Normalizes the raw location parts and builds a key.
    pub fn from_parts(kind: DataKind, district: &str, state: &str) -> KisanResult<Self> {
        Ok(Self::new(kind, LocationKey::new(district, state)?))
    }

    /// Returns the data kind.
    #[must_use]
    pub const fn kind(&self) -> DataKind {
        self.kind
    }

    /// Returns the location.
    #[must_use]
    pub const fn location(&self) -> &LocationKey {
        &self.location
    }

    /// Returns the payload key: `{domain}:{district}:{state}:{KIND}`.
    #[must_use]
    pub fn payload_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.kind.domain(),
            self.location.district,
            self.location.state,
            self.kind.token()
        )
    }

    /// Returns the paired timestamp key (payload key plus `:timestamp`).
    #[must_use]
    pub fn timestamp_key(&self) -> String {
        format!("{}{}", self.payload_key(), TIMESTAMP_SUFFIX)
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.payload_key())
    }
}
