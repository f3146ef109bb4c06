// ── Emergency lifecycle status ──

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::CoreError;

/// Lifecycle state of an emergency request.
///
/// `Accepted` and `Active` both mean "assigned, en route"; they have
/// identical outgoing edges in the transition table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum EmergencyStatus {
    Pending,
    Accepted,
    Active,
    InProgress,
    Arriving,
    OnSite,
    Completed,
    Cancelled,
}

impl EmergencyStatus {
    /// `COMPLETED` and `CANCELLED` have no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Assigned to a crew: either synonym for "accepted, en route".
    pub fn is_assigned(self) -> bool {
        matches!(self, Self::Accepted | Self::Active)
    }

    /// Human-readable label for display surfaces.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::Active => "Active",
            Self::InProgress => "In progress",
            Self::Arriving => "Arriving",
            Self::OnSite => "On site",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Parse a status leniently: case-insensitive, `-` and spaces treated as `_`.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let normalized = raw.trim().replace(['-', ' '], "_");
        normalized
            .parse::<Self>()
            .map_err(|_| CoreError::InvalidStatus {
                value: raw.to_owned(),
            })
    }

    /// Every status, in lifecycle order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}
