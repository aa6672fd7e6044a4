//! Documents and photos attached to equipment

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::session::Session;

/// Who may see a document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[default]
    Public,
    /// Members of the company the equipment is located in
    Company,
    /// Station staff, managers and admins
    Team,
    Admin,
    /// Admins and an explicit list of users
    Restricted,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Public => "public",
            AccessLevel::Company => "company",
            AccessLevel::Team => "team",
            AccessLevel::Admin => "admin",
            AccessLevel::Restricted => "restricted",
        }
    }
}

impl std::str::FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(AccessLevel::Public),
            "company" => Ok(AccessLevel::Company),
            "team" => Ok(AccessLevel::Team),
            "admin" => Ok(AccessLevel::Admin),
            "restricted" => Ok(AccessLevel::Restricted),
            _ => Err(format!("Invalid access level: {}", s)),
        }
    }
}

/// Metadata of a stored document, embedded in the equipment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EquipmentDocument {
    pub id: String,
    pub equipment_id: i32,
    pub name: String,
    pub document_type_id: Option<String>,
    pub storage_path: String,
    pub url: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    /// Hex SHA-256 of the stored bytes
    pub sha256: String,
    #[serde(default)]
    pub access_level: AccessLevel,
    #[serde(default)]
    pub allowed_user_ids: Vec<String>,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

impl EquipmentDocument {
    /// `equipment_company` is the company of the equipment's current location
    pub fn is_visible_to(&self, session: &Session, equipment_company: Option<i32>) -> bool {
        if session.is_admin() {
            return true;
        }
        match self.access_level {
            AccessLevel::Public => true,
            AccessLevel::Company => {
                session.company_id.is_some() && session.company_id == equipment_company
            }
            AccessLevel::Team => session.role.is_team(),
            AccessLevel::Admin => false,
            AccessLevel::Restricted => self.allowed_user_ids.iter().any(|id| id == session.user_id()),
        }
    }
}

/// Metadata sent with a document upload
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DocumentMetadata {
    /// Display name; defaults to the uploaded file name
    pub name: Option<String>,
    pub document_type_id: Option<String>,
    pub access_level: Option<AccessLevel>,
    #[serde(default)]
    pub allowed_user_ids: Vec<String>,
}

/// Kind of blob attached to an equipment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Document,
    Photo,
}

impl AttachmentKind {
    fn folder(&self) -> &'static str {
        match self {
            AttachmentKind::Document => "documents",
            AttachmentKind::Photo => "photos",
        }
    }
}

/// Keep ASCII letters, digits, dot, dash and underscore; everything else becomes `_`
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = super::fold_text(base)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Object path of an attachment: `equipment/{id}/{documents|photos}/{millis}_{name}`
pub fn storage_path(equipment_id: i32, kind: AttachmentKind, millis: i64, file_name: &str) -> String {
    format!(
        "equipment/{}/{}/{}_{}",
        equipment_id,
        kind.folder(),
        millis,
        sanitize_file_name(file_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::{test_session, Role};

    fn document(level: AccessLevel, allowed: &[&str]) -> EquipmentDocument {
        EquipmentDocument {
            id: "d1".to_string(),
            equipment_id: 1,
            name: "Facture.pdf".to_string(),
            document_type_id: None,
            storage_path: "equipment/1/documents/1_Facture.pdf".to_string(),
            url: "/files/equipment/1/documents/1_Facture.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            size_bytes: 10,
            sha256: String::new(),
            access_level: level,
            allowed_user_ids: allowed.iter().map(|s| s.to_string()).collect(),
            uploaded_by: "u-9".to_string(),
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn test_public_visible_to_everyone() {
        let doc = document(AccessLevel::Public, &[]);
        assert!(doc.is_visible_to(&test_session(Role::Member, None), None));
    }

    #[test]
    fn test_company_level() {
        let doc = document(AccessLevel::Company, &[]);
        assert!(doc.is_visible_to(&test_session(Role::Member, Some(2)), Some(2)));
        assert!(!doc.is_visible_to(&test_session(Role::Manager, Some(3)), Some(2)));
        assert!(!doc.is_visible_to(&test_session(Role::Member, None), None));
        assert!(doc.is_visible_to(&test_session(Role::Admin, None), Some(2)));
    }

    #[test]
    fn test_team_and_admin_levels() {
        let team = document(AccessLevel::Team, &[]);
        assert!(!team.is_visible_to(&test_session(Role::Member, None), None));
        assert!(team.is_visible_to(&test_session(Role::Staff, None), None));

        let admin = document(AccessLevel::Admin, &[]);
        assert!(!admin.is_visible_to(&test_session(Role::Manager, None), None));
        assert!(admin.is_visible_to(&test_session(Role::Admin, None), None));
    }

    #[test]
    fn test_restricted_allow_list() {
        let doc = document(AccessLevel::Restricted, &["u-1"]);
        assert!(doc.is_visible_to(&test_session(Role::Member, None), None));
        let doc = document(AccessLevel::Restricted, &["u-2"]);
        assert!(!doc.is_visible_to(&test_session(Role::Manager, None), None));
    }

    #[test]
    fn test_storage_path_layout() {
        assert_eq!(
            storage_path(12, AttachmentKind::Document, 1700000000123, "Facture été 2024.pdf"),
            "equipment/12/documents/1700000000123_facture_ete_2024.pdf"
        );
        assert_eq!(
            storage_path(3, AttachmentKind::Photo, 5, "../../etc/passwd"),
            "equipment/3/photos/5_passwd"
        );
    }

    #[test]
    fn test_sanitize_never_empty() {
        assert_eq!(sanitize_file_name(""), "file");
        assert_eq!(sanitize_file_name("..."), "file");
        assert_eq!(sanitize_file_name(".env"), "env");
    }
}
