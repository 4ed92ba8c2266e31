//! Identity types for maps, hazards and light sources

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Identifier of a map in the content registry
    MapId
);

string_id!(
    /// Identifier of a hazard entity
    ///
    /// Environmental hazards get generated ids, story hazards reuse the id of
    /// the persisted record they were materialized from.
    HazardId
);

string_id!(
    /// Identifier of a light source
    SourceId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_id() {
        let id = MapId::new("marsh");
        assert_eq!(id.as_str(), "marsh");
        assert_eq!(format!("{}", id), "marsh");
    }

    #[test]
    fn test_ids_are_ordered() {
        let mut ids = vec![HazardId::from("b"), HazardId::from("a")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "a");
    }

    #[test]
    fn test_transparent_serde() {
        let id = SourceId::new("brazier-1");
        let text = ron::to_string(&id).expect("serialize");
        assert_eq!(text, "\"brazier-1\"");
    }
}
