//! Core domain types for lostfound.
//!
//! Profiles and reports are stored as JSON documents whose field names match
//! the documents the bot has always written (`phoneNumber`, `idNumber`,
//! `telegramId`, `userId`, ...), so existing data stays readable.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Stable handle the chat platform assigns to a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub i64);

impl Identity {
    /// Key under which this identity's profile is stored.
    #[must_use]
    pub fn document_key(self) -> String {
        self.0.to_string()
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Identity {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Whether a report is about something lost or something found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// The reporter lost the item.
    Lost,
    /// The reporter found the item.
    Found,
}

impl ItemKind {
    /// Upper-case label used in channel posts.
    #[must_use]
    pub fn headline(self) -> &'static str {
        match self {
            Self::Lost => "LOST",
            Self::Found => "FOUND",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lost => write!(f, "lost"),
            Self::Found => write!(f, "found"),
        }
    }
}

/// Contact record created during onboarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Full name as typed by the user.
    pub name: String,
    /// Phone number as typed by the user.
    pub phone_number: String,
    /// Number of the user's own identification document.
    pub id_number: String,
    /// Chat identity that owns this profile, if known.
    #[serde(rename = "telegramId", default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
}

impl Profile {
    /// Create a profile owned by `identity`.
    #[must_use]
    pub fn new(
        identity: Identity,
        name: impl Into<String>,
        phone_number: impl Into<String>,
        id_number: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            phone_number: phone_number.into(),
            id_number: id_number.into(),
            identity: Some(identity),
        }
    }
}

/// What a report describes: an identification document by its number, or any
/// other item by free text, optionally with a photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportSubject {
    /// An identification document.
    IdNumber(String),
    /// Any other item.
    Description {
        /// Free-text description; may be empty for a photo without caption.
        text: String,
        /// Download link of the attached photo.
        photo_url: Option<String>,
    },
}

/// A lost or found report. Reports are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ReportDocument", try_from = "ReportDocument")]
pub struct Report {
    /// Lost or found.
    pub kind: ItemKind,
    /// What the report is about.
    pub subject: ReportSubject,
    /// Who filed the report.
    pub reporter: Identity,
    /// When the report was filed.
    pub timestamp: DateTime<Utc>,
}

impl Report {
    /// Create a report timestamped now.
    #[must_use]
    pub fn new(kind: ItemKind, subject: ReportSubject, reporter: Identity) -> Self {
        Self {
            kind,
            subject,
            reporter,
            timestamp: Utc::now(),
        }
    }

    /// Identification number, if this report is about an ID.
    #[must_use]
    pub fn id_number(&self) -> Option<&str> {
        match &self.subject {
            ReportSubject::IdNumber(number) => Some(number),
            ReportSubject::Description { .. } => None,
        }
    }

    /// Photo link, if one was attached.
    #[must_use]
    pub fn photo_url(&self) -> Option<&str> {
        match &self.subject {
            ReportSubject::Description { photo_url, .. } => photo_url.as_deref(),
            ReportSubject::IdNumber(_) => None,
        }
    }

    /// Derive the document key from the report's content.
    ///
    /// Two reports only collide if the same identity files the same subject in
    /// the same nanosecond.
    #[must_use]
    pub fn document_key(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.reporter.document_key().as_bytes());
        hasher.update(b"|");
        hasher.update(
            self.timestamp
                .to_rfc3339_opts(SecondsFormat::Nanos, true)
                .as_bytes(),
        );
        hasher.update(b"|");
        match &self.subject {
            ReportSubject::IdNumber(number) => {
                hasher.update(b"id:");
                hasher.update(number.as_bytes());
            }
            ReportSubject::Description { text, photo_url } => {
                hasher.update(b"desc:");
                hasher.update(text.as_bytes());
                if let Some(url) = photo_url {
                    hasher.update(b"|");
                    hasher.update(url.as_bytes());
                }
            }
        }
        let mut key = hasher.finalize().to_hex().to_string();
        key.truncate(20);
        key
    }
}

/// Stored shape of a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportDocument {
    #[serde(rename = "type")]
    kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    photo_url: Option<String>,
    user_id: Identity,
    timestamp: DateTime<Utc>,
}

impl From<Report> for ReportDocument {
    fn from(report: Report) -> Self {
        let (id_number, description, photo_url) = match report.subject {
            ReportSubject::IdNumber(number) => (Some(number), None, None),
            ReportSubject::Description { text, photo_url } => (None, Some(text), photo_url),
        };
        Self {
            kind: report.kind,
            id_number,
            description,
            photo_url,
            user_id: report.reporter,
            timestamp: report.timestamp,
        }
    }
}

impl TryFrom<ReportDocument> for Report {
    type Error = String;

    fn try_from(doc: ReportDocument) -> std::result::Result<Self, Self::Error> {
        let subject = match (doc.id_number, doc.description, doc.photo_url) {
            (Some(number), None, None) => ReportSubject::IdNumber(number),
            (None, Some(text), photo_url) => ReportSubject::Description { text, photo_url },
            (None, None, Some(url)) => ReportSubject::Description {
                text: String::new(),
                photo_url: Some(url),
            },
            (None, None, None) => {
                return Err("report has neither idNumber nor description".to_string())
            }
            (Some(_), _, _) => {
                return Err("report has both idNumber and description".to_string())
            }
        };
        Ok(Self {
            kind: doc.kind,
            subject,
            reporter: doc.user_id,
            timestamp: doc.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_display_and_key() {
        let id = Identity(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(id.document_key(), "42");
    }

    #[test]
    fn test_item_kind_display() {
        assert_eq!(ItemKind::Lost.to_string(), "lost");
        assert_eq!(ItemKind::Found.to_string(), "found");
        assert_eq!(ItemKind::Lost.headline(), "LOST");
        assert_eq!(ItemKind::Found.headline(), "FOUND");
    }

    #[test]
    fn test_profile_document_shape() {
        let profile = Profile::new(Identity(42), "Ada", "555-1234", "X123");
        let doc = serde_json::to_value(&profile).unwrap();
        assert_eq!(
            doc,
            json!({
                "name": "Ada",
                "phoneNumber": "555-1234",
                "idNumber": "X123",
                "telegramId": 42
            })
        );
    }

    #[test]
    fn test_profile_without_identity() {
        let doc = json!({ "name": "Bo", "phoneNumber": "1", "idNumber": "Z9" });
        let profile: Profile = serde_json::from_value(doc).unwrap();
        assert!(profile.identity.is_none());
    }

    #[test]
    fn test_id_report_document_shape() {
        let report = Report::new(
            ItemKind::Found,
            ReportSubject::IdNumber("X123".to_string()),
            Identity(42),
        );
        let doc = serde_json::to_value(&report).unwrap();
        assert_eq!(doc["type"], "found");
        assert_eq!(doc["idNumber"], "X123");
        assert_eq!(doc["userId"], 42);
        assert!(doc.get("description").is_none());
        assert!(doc.get("photoUrl").is_none());
        assert_eq!(report.id_number(), Some("X123"));
    }

    #[test]
    fn test_photo_report_document_shape() {
        let report = Report::new(
            ItemKind::Lost,
            ReportSubject::Description {
                text: "blue backpack".to_string(),
                photo_url: Some("https://example.test/p.jpg".to_string()),
            },
            Identity(7),
        );
        let doc = serde_json::to_value(&report).unwrap();
        assert_eq!(doc["description"], "blue backpack");
        assert_eq!(doc["photoUrl"], "https://example.test/p.jpg");
        assert!(doc.get("idNumber").is_none());

        let back: Report = serde_json::from_value(doc).unwrap();
        assert_eq!(back, report);
        assert_eq!(back.photo_url(), Some("https://example.test/p.jpg"));
    }

    #[test]
    fn test_report_without_subject_is_rejected() {
        let doc = json!({
            "type": "lost",
            "userId": 1,
            "timestamp": "2024-01-15T10:00:00Z"
        });
        let err = serde_json::from_value::<Report>(doc).unwrap_err();
        assert!(err.to_string().contains("neither idNumber nor description"));
    }

    #[test]
    fn test_report_with_both_subjects_is_rejected() {
        let doc = json!({
            "type": "lost",
            "idNumber": "X1",
            "description": "wallet",
            "userId": 1,
            "timestamp": "2024-01-15T10:00:00Z"
        });
        assert!(serde_json::from_value::<Report>(doc).is_err());
    }

    #[test]
    fn test_document_key_is_stable_and_distinct() {
        let report = Report::new(
            ItemKind::Lost,
            ReportSubject::IdNumber("X123".to_string()),
            Identity(42),
        );
        assert_eq!(report.document_key(), report.document_key());
        assert_eq!(report.document_key().len(), 20);

        let mut other = report.clone();
        other.subject = ReportSubject::IdNumber("X124".to_string());
        assert_ne!(report.document_key(), other.document_key());
    }
}
