//! Life certificate issuance and export.
//!
//! A certificate is only ever derived from a successful [`VerificationResult`].
//! Its id is derived from the issuance instant, so exports are reproducible
//! under a fixed clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::verification::{VerificationNote, VerificationResult};

pub const DEFAULT_ID_PREFIX: &str = "LC";

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("No verification result yet; nothing to certify")]
    NoResult,

    #[error("Verification unsuccessful ({note}); a life certificate cannot be issued")]
    NotVerified { note: VerificationNote },

    #[error("Failed to encode certificate: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Exported proof-of-life record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: String,
    pub issued_at: DateTime<Utc>,
    pub note: VerificationNote,
}

impl Certificate {
    /// Suggested file name for a download: `{id}.json`.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.id)
    }

    /// UTF-8 pretty-printed JSON with `id`, `issuedAt` and `note`.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, CertificateError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateIssuer {
    id_prefix: String,
}

impl Default for CertificateIssuer {
    fn default() -> Self {
        Self::new(DEFAULT_ID_PREFIX)
    }
}

impl CertificateIssuer {
    pub fn new(id_prefix: impl Into<String>) -> Self {
        Self {
            id_prefix: id_prefix.into(),
        }
    }

    pub fn id_prefix(&self) -> &str {
        &self.id_prefix
    }

    pub fn issue(
        &self,
        result: &VerificationResult,
        issued_at: DateTime<Utc>,
    ) -> Result<Certificate, CertificateError> {
        if !result.success {
            return Err(CertificateError::NotVerified { note: result.note });
        }

        Ok(Certificate {
            id: format!("{}-{}", self.id_prefix, issued_at.timestamp_millis()),
            issued_at,
            note: result.note,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 2).unwrap()
    }

    #[test]
    fn test_issue_derives_id_from_instant() {
        let result = VerificationResult::succeeded(VerificationNote::AutoVerified, instant());

        let cert = CertificateIssuer::default().issue(&result, instant()).unwrap();

        assert_eq!(cert.id, format!("LC-{}", instant().timestamp_millis()));
        assert_eq!(cert.issued_at, instant());
        assert_eq!(cert.note, VerificationNote::AutoVerified);
        assert_eq!(cert.file_name(), format!("{}.json", cert.id));
    }

    #[test]
    fn test_issue_refuses_unsuccessful_result() {
        for note in [
            VerificationNote::UnresolvedInPerson,
            VerificationNote::UserOptedInPerson,
        ] {
            let result = VerificationResult::failed(note, instant());
            let err = CertificateIssuer::default()
                .issue(&result, instant())
                .unwrap_err();
            assert!(matches!(err, CertificateError::NotVerified { note: n } if n == note));
        }
    }

    #[test]
    fn test_json_export_has_three_fields() {
        let result =
            VerificationResult::succeeded(VerificationNote::ClearedAfterFollowUp, instant());
        let cert = CertificateIssuer::new("NLC").issue(&result, instant()).unwrap();

        let bytes = cert.to_json_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 3);
        assert!(object["id"].as_str().unwrap().starts_with("NLC-"));
        assert_eq!(object["note"], "Cleared after follow-up");
        let issued_at: DateTime<Utc> = object["issuedAt"].as_str().unwrap().parse().unwrap();
        assert_eq!(issued_at, instant());
    }
}
