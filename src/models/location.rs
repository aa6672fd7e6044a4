//! Location hierarchy: company -> site -> room

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Business sector of a company of the group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CompanyType {
    Petroleum,
    Transport,
    Media,
    Broadcast,
    Services,
    Other,
}

text_enum!(CompanyType {
    Petroleum => "petroleum",
    Transport => "transport",
    Media => "media",
    Broadcast => "broadcast",
    Services => "services",
    Other => "other",
});

/// Company record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Company {
    pub id: i32,
    pub name: String,
    pub company_type: CompanyType,
    /// Whether equipment may leave this company through movements
    pub allows_equipment_sharing: bool,
    /// Whether movements to or from another company need approval
    pub requires_transfer_approval: bool,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCompany {
    #[validate(length(min = 1, max = 200, message = "Company name is required"))]
    pub name: String,
    pub company_type: Option<CompanyType>,
    pub allows_equipment_sharing: Option<bool>,
    pub requires_transfer_approval: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCompany {
    #[validate(length(min = 1, max = 200, message = "Company name cannot be empty"))]
    pub name: Option<String>,
    pub company_type: Option<CompanyType>,
    pub allows_equipment_sharing: Option<bool>,
    pub requires_transfer_approval: Option<bool>,
    pub notes: Option<String>,
}

/// Site record (belongs to one company)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Site {
    pub id: i32,
    pub company_id: i32,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSite {
    pub company_id: i32,
    #[validate(length(min = 1, max = 200, message = "Site name is required"))]
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub notes: Option<String>,
}

/// Update site request; the owning company cannot change
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSite {
    #[validate(length(min = 1, max = 200, message = "Site name cannot be empty"))]
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub notes: Option<String>,
}

/// Room record (belongs to one site)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Room {
    pub id: i32,
    pub site_id: i32,
    pub name: String,
    pub floor: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRoom {
    pub site_id: i32,
    #[validate(length(min = 1, max = 200, message = "Room name is required"))]
    pub name: String,
    pub floor: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRoom {
    #[validate(length(min = 1, max = 200, message = "Room name cannot be empty"))]
    pub name: Option<String>,
    pub floor: Option<String>,
    pub notes: Option<String>,
}

/// Query parameters for location lists
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct LocationQuery {
    /// Restrict sites to a company
    pub company_id: Option<i32>,
    /// Restrict rooms to a site
    pub site_id: Option<i32>,
    /// Include soft-deleted locations
    #[serde(default)]
    pub include_inactive: bool,
}

/// Denormalized copy of a location, stored on equipment and movements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LocationSnapshot {
    pub company_id: i32,
    pub company_name: String,
    pub site_id: i32,
    pub site_name: String,
    pub room_id: Option<i32>,
    pub room_name: Option<String>,
}

/// Location reference supplied by clients; names are resolved server-side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
pub struct LocationRef {
    pub company_id: i32,
    pub site_id: i32,
    pub room_id: Option<i32>,
}

impl LocationSnapshot {
    pub fn location_ref(&self) -> LocationRef {
        LocationRef {
            company_id: self.company_id,
            site_id: self.site_id,
            room_id: self.room_id,
        }
    }
}

/// Build a snapshot from loaded records, checking the tree shape
pub fn snapshot_from(company: &Company, site: &Site, room: Option<&Room>) -> AppResult<LocationSnapshot> {
    if site.company_id != company.id {
        return Err(AppError::Validation(format!(
            "Site {} does not belong to company {}",
            site.id, company.id
        )));
    }
    if let Some(room) = room {
        if room.site_id != site.id {
            return Err(AppError::Validation(format!(
                "Room {} does not belong to site {}",
                room.id, site.id
            )));
        }
    }
    for (active, label) in [
        (company.is_active, "Company"),
        (site.is_active, "Site"),
        (room.map(|r| r.is_active).unwrap_or(true), "Room"),
    ] {
        if !active {
            return Err(AppError::BusinessRule(format!("{} is no longer active", label)));
        }
    }
    Ok(LocationSnapshot {
        company_id: company.id,
        company_name: company.name.clone(),
        site_id: site.id,
        site_name: site.name.clone(),
        room_id: room.map(|r| r.id),
        room_name: room.map(|r| r.name.clone()),
    })
}

/// Level of the hierarchy, used in dependency reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LocationLevel {
    Company,
    Site,
    Room,
}

impl LocationLevel {
    pub fn label(&self) -> &'static str {
        match self {
            LocationLevel::Company => "company",
            LocationLevel::Site => "site",
            LocationLevel::Room => "room",
        }
    }

    /// Name of the child level, if any
    pub fn child_label(&self) -> Option<&'static str> {
        match self {
            LocationLevel::Company => Some("site"),
            LocationLevel::Site => Some("room"),
            LocationLevel::Room => None,
        }
    }
}

/// Records still pointing at a location
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LocationDependencies {
    pub level: LocationLevel,
    pub id: i32,
    /// Equipment whose current location references this id
    pub equipment_count: i64,
    /// Active child locations
    pub child_count: i64,
    /// Equipment count reached the query cap (actual number may be higher)
    pub equipment_capped: bool,
    /// Child count reached the query cap
    pub child_capped: bool,
    /// Either count reached the cap
    pub capped: bool,
}

impl LocationDependencies {
    /// Counts as returned by queries limited to `cap` rows
    pub fn new(level: LocationLevel, id: i32, equipment_count: i64, child_count: i64, cap: i64) -> Self {
        let equipment_capped = equipment_count >= cap;
        let child_capped = child_count >= cap;
        Self {
            level,
            id,
            equipment_count,
            child_count,
            equipment_capped,
            child_capped,
            capped: equipment_capped || child_capped,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.equipment_count == 0 && self.child_count == 0
    }

    /// Refuse the soft delete when anything still depends on the location.
    /// Equipment takes priority over child locations in the message.
    pub fn ensure_deletable(&self) -> AppResult<()> {
        let at_least = |capped: bool| if capped { "at least " } else { "" };
        if self.equipment_count > 0 {
            return Err(AppError::Dependency(format!(
                "Cannot delete {} {}: {}{} equipment item(s) located there",
                self.level.label(),
                self.id,
                at_least(self.equipment_capped),
                self.equipment_count
            )));
        }
        if self.child_count > 0 {
            let child = self.level.child_label().unwrap_or("child");
            return Err(AppError::Dependency(format!(
                "Cannot delete {} {}: {}{} active {}(s) attached",
                self.level.label(),
                self.id,
                at_least(self.child_capped),
                self.child_count,
                child
            )));
        }
        Ok(())
    }
}
