use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a run ended the way it did.
///
/// Serialized with the wording shown to the customer and written into exported
/// certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationNote {
    #[serde(rename = "Verified automatically")]
    AutoVerified,
    #[serde(rename = "Cleared after follow-up")]
    ClearedAfterFollowUp,
    #[serde(rename = "Unresolved. In-person required")]
    UnresolvedInPerson,
    #[serde(rename = "User opted for in-person")]
    UserOptedInPerson,
}

impl VerificationNote {
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationNote::AutoVerified => "Verified automatically",
            VerificationNote::ClearedAfterFollowUp => "Cleared after follow-up",
            VerificationNote::UnresolvedInPerson => "Unresolved. In-person required",
            VerificationNote::UserOptedInPerson => "User opted for in-person",
        }
    }
}

impl fmt::Display for VerificationNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The current determination of a run. Overwritten, never accumulated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub success: bool,
    pub decided_at: DateTime<Utc>,
    pub note: VerificationNote,
}

impl VerificationResult {
    pub fn succeeded(note: VerificationNote, decided_at: DateTime<Utc>) -> Self {
        Self {
            success: true,
            decided_at,
            note,
        }
    }

    pub fn failed(note: VerificationNote, decided_at: DateTime<Utc>) -> Self {
        Self {
            success: false,
            decided_at,
            note,
        }
    }
}
