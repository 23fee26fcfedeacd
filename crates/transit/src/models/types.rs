//! Core enums and errors for reference data.

use serde::{Deserialize, Serialize};

use crate::identifiers::*;

// ============================================================================
// Enums
// ============================================================================

/// GTFS route types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
#[repr(u8)]
pub enum RouteType {
    Tram = 0,
    Subway = 1,
    Rail = 2,
    Bus = 3,
    Ferry = 4,
    CableTram = 5,
    AerialLift = 6,
    Funicular = 7,
}

impl RouteType {
    pub fn from_gtfs(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::Tram),
            1 => Some(Self::Subway),
            2 => Some(Self::Rail),
            3 => Some(Self::Bus),
            4 => Some(Self::Ferry),
            5 => Some(Self::CableTram),
            6 => Some(Self::AerialLift),
            7 => Some(Self::Funicular),
            _ => None,
        }
    }
}

impl TryFrom<u16> for RouteType {
    type Error = TransitError;

    fn try_from(value: u16) -> Result<Self> {
        Self::from_gtfs(value)
            .ok_or_else(|| TransitError::InvalidData(format!("unknown route type {value}")))
    }
}

impl From<RouteType> for u16 {
    fn from(value: RouteType) -> Self {
        value as u16
    }
}

/// Trip direction (0 = outbound, 1 = inbound per GTFS)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum DirectionId {
    Outbound = 0,
    Inbound = 1,
}

impl TryFrom<u8> for DirectionId {
    type Error = TransitError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Outbound),
            1 => Ok(Self::Inbound),
            other => Err(TransitError::InvalidData(format!("unknown direction {other}"))),
        }
    }
}

impl From<DirectionId> for u8 {
    fn from(value: DirectionId) -> Self {
        value as u8
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransitError {
    #[error("Route not found: {0}")]
    RouteNotFound(RouteIdentifier),

    #[error("Stop not found: {0}")]
    StopNotFound(StopCode),

    #[error("Stop group not found: {0}")]
    StopGroupNotFound(StopGroupIdentifier),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Fetch failed: {0}")]
    FetchFailed(String),
}

impl From<serde_json::Error> for TransitError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TransitError>;
