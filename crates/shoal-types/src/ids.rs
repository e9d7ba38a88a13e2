//! Type-safe identifiers.
//!
//! Schools and views are keyed by UUID v7 (time-ordered) newtypes so a
//! school id can never be passed where a view id is expected. Species and
//! grid cells are small dense indices because configuration addresses
//! them by position (`.sp0`, `.sp1`, ...).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

define_id! {
    /// Unique identifier for a school (one tracked population unit).
    SchoolId
}

define_id! {
    /// Unique identifier for a view registered in a view graph.
    ViewId
}

/// Dense index of a species, as used by `.sp<index>` configuration keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesId(pub u16);

impl SpeciesId {
    /// The configuration key suffix for this species, e.g. `sp3`.
    pub fn key_suffix(self) -> String {
        format!("sp{}", self.0)
    }

    /// The index as a `usize`, for addressing dense per-species tables.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl core::fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "sp{}", self.0)
    }
}

/// Index of a cell of the spatial grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellId(pub u32);
