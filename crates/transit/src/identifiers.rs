//! Type-safe identifiers for reference-data entities.
//!
//! Each id space gets its own type so a stop code can never be compared with a
//! route id by accident. All identifiers use Arc<str> for cheap cloning, since
//! the same keys are copied into every reconciled selection.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::types::TransitError;

macro_rules! impl_identifier {
    ($name:ident, $label:literal) => {
        #[derive(Clone, Debug, PartialOrd, Ord)]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn new(s: impl AsRef<str>) -> Self {
                Self(s.as_ref().into())
            }

            /// Like `new`, but rejects blank keys.
            pub fn try_new(s: impl AsRef<str>) -> Result<Self, TransitError> {
                let s = s.as_ref();
                if s.trim().is_empty() {
                    return Err(TransitError::InvalidData(format!("empty {}", $label)));
                }
                Ok(Self::new(s))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.hash(state);
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Self::try_new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

impl_identifier!(RouteIdentifier, "route id");
impl_identifier!(StopIdentifier, "stop id");
impl_identifier!(StopCode, "stop code");
impl_identifier!(StopGroupIdentifier, "stop group id");
