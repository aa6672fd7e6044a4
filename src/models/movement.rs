//! Equipment movements: changes of location and/or assignee, optionally gated by approval

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{
    fold_text,
    location::{Company, LocationRef, LocationSnapshot},
    settings::{ConfigurableOption, SettingsData},
};
use crate::error::{AppError, AppResult};

/// What a movement means, independently of how its type is labelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MovementCategory {
    Assignment,
    Return,
    Loan,
    LoanReturn,
    TransferSite,
    TransferRoom,
    TransferCompany,
    Mission,
    MissionReturn,
    MaintenanceOut,
    MaintenanceReturn,
    RepairOut,
    RepairReturn,
    Storage,
    InventoryCheck,
    Disposal,
    Lost,
    Stolen,
    Found,
    Other,
}

text_enum!(MovementCategory {
    Assignment => "assignment",
    Return => "return",
    Loan => "loan",
    LoanReturn => "loan_return",
    TransferSite => "transfer_site",
    TransferRoom => "transfer_room",
    TransferCompany => "transfer_company",
    Mission => "mission",
    MissionReturn => "mission_return",
    MaintenanceOut => "maintenance_out",
    MaintenanceReturn => "maintenance_return",
    RepairOut => "repair_out",
    RepairReturn => "repair_return",
    Storage => "storage",
    InventoryCheck => "inventory_check",
    Disposal => "disposal",
    Lost => "lost",
    Stolen => "stolen",
    Found => "found",
    Other => "other",
});

impl MovementCategory {
    /// Infer a category from a movement type label (French or English).
    ///
    /// Only used when a movement type is saved without an explicit category;
    /// the result is stored on the option so later renames do not change it.
    pub fn classify(label: &str) -> Self {
        use MovementCategory::*;

        let text = fold_text(label);
        let has = |k: &str| text.contains(k);
        let word = |w: &str| text.split(|c: char| !c.is_alphanumeric()).any(|t| t == w);

        if has("retour") || has("return") {
            if has("pret") || has("loan") {
                LoanReturn
            } else if has("maintenance") {
                MaintenanceReturn
            } else if has("repar") {
                RepairReturn
            } else if has("mission") || has("reportage") {
                MissionReturn
            } else {
                Return
            }
        } else if has("pret") || has("loan") || has("emprunt") {
            Loan
        } else if has("transfert") || has("transfer") || has("changement") || has("deplacement") {
            if has("societe") || has("entreprise") || has("company") || has("filiale") {
                TransferCompany
            } else if has("salle") || has("room") || has("studio") || has("bureau") {
                TransferRoom
            } else {
                TransferSite
            }
        } else if has("maintenance") {
            MaintenanceOut
        } else if has("repar") {
            RepairOut
        } else if has("mission") || has("reportage") || has("exterieur") || has("tournage") {
            Mission
        } else if has("rebut") || has("reforme") || has("dispos") || has("destruction") {
            Disposal
        } else if word("vol") || word("vole") || has("stolen") || has("theft") {
            Stolen
        } else if has("perte") || has("perdu") || has("lost") {
            Lost
        } else if has("retrouv") || has("found") {
            Found
        } else if has("stock") || has("rangement") || has("magasin") || has("reserve") {
            Storage
        } else if has("inventaire") || has("controle") || has("verification") {
            InventoryCheck
        } else if has("affect") || has("attribution") || has("assign") || has("dotation") {
            Assignment
        } else {
            Other
        }
    }

    /// Approval requirement when the movement type does not set one
    pub fn default_requires_approval(&self) -> bool {
        matches!(
            self,
            MovementCategory::Loan
                | MovementCategory::Mission
                | MovementCategory::TransferSite
                | MovementCategory::TransferCompany
                | MovementCategory::Disposal
        )
    }

    /// Movements that take the equipment away from its assignee
    pub fn releases_assignment(&self) -> bool {
        matches!(
            self,
            MovementCategory::Return
                | MovementCategory::LoanReturn
                | MovementCategory::MissionReturn
                | MovementCategory::MaintenanceOut
                | MovementCategory::RepairOut
                | MovementCategory::Storage
                | MovementCategory::Disposal
                | MovementCategory::Lost
                | MovementCategory::Stolen
        )
    }
}

/// Movement lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MovementStatus {
    Pending,
    /// Approved but not yet applied; records written by this server go straight to completed
    Approved,
    Rejected,
    Completed,
}

text_enum!(MovementStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    Completed => "completed",
});

impl MovementStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MovementStatus::Completed | MovementStatus::Rejected)
    }

    /// Status reached by approving a movement in this status
    pub fn approve(self) -> AppResult<MovementStatus> {
        match self {
            MovementStatus::Pending | MovementStatus::Approved => Ok(MovementStatus::Completed),
            other => Err(AppError::InvalidTransition(format!(
                "Cannot approve a {} movement",
                other
            ))),
        }
    }

    /// Status reached by rejecting a movement in this status
    pub fn reject(self) -> AppResult<MovementStatus> {
        match self {
            MovementStatus::Pending | MovementStatus::Approved => Ok(MovementStatus::Rejected),
            other => Err(AppError::InvalidTransition(format!(
                "Cannot reject a {} movement",
                other
            ))),
        }
    }
}

/// User an equipment is (or will be) assigned to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Assignee {
    pub user_id: String,
    pub user_name: String,
}

/// Where the equipment is and who holds it, as copied at movement time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MovementEndpoint {
    pub location: Option<LocationSnapshot>,
    pub assignee: Option<Assignee>,
}

/// Movement record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EquipmentMovement {
    pub id: i32,
    pub equipment_id: i32,
    pub movement_type_id: String,
    pub movement_category: MovementCategory,
    pub from: MovementEndpoint,
    pub to: MovementEndpoint,
    pub status: MovementStatus,
    pub requires_approval: bool,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub expected_return_at: Option<DateTime<Utc>>,
    pub requested_by: String,
    pub requested_by_name: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Internal row structure for movement queries
#[derive(Debug, Clone, FromRow)]
pub struct MovementRow {
    id: i32,
    equipment_id: i32,
    movement_type_id: String,
    movement_category: MovementCategory,
    from_endpoint: Json<MovementEndpoint>,
    to_endpoint: Json<MovementEndpoint>,
    status: MovementStatus,
    requires_approval: bool,
    reason: Option<String>,
    notes: Option<String>,
    expected_return_at: Option<DateTime<Utc>>,
    requested_by: String,
    requested_by_name: Option<String>,
    approved_by: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<MovementRow> for EquipmentMovement {
    fn from(row: MovementRow) -> Self {
        EquipmentMovement {
            id: row.id,
            equipment_id: row.equipment_id,
            movement_type_id: row.movement_type_id,
            movement_category: row.movement_category,
            from: row.from_endpoint.0,
            to: row.to_endpoint.0,
            status: row.status,
            requires_approval: row.requires_approval,
            reason: row.reason,
            notes: row.notes,
            expected_return_at: row.expected_return_at,
            requested_by: row.requested_by,
            requested_by_name: row.requested_by_name,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            rejection_reason: row.rejection_reason,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Create movement request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMovement {
    pub equipment_id: i32,
    /// Id of a movement type option
    #[validate(length(min = 1, message = "Movement type is required"))]
    pub movement_type_id: String,
    /// Destination; omitted means the location does not change
    pub to_location: Option<LocationRef>,
    /// New assignee; omitted keeps the current one unless the movement releases it
    pub to_assignee: Option<Assignee>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub expected_return_at: Option<DateTime<Utc>>,
}

/// Reject movement request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RejectMovement {
    #[validate(length(min = 1, message = "A rejection reason is required"))]
    pub reason: String,
}

/// Query parameters for movement lists
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct MovementQuery {
    pub equipment_id: Option<i32>,
    pub status: Option<MovementStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Outcome of evaluating a movement request before anything is written
#[derive(Debug, Clone, PartialEq)]
pub struct MovementPlan {
    pub category: MovementCategory,
    pub requires_approval: bool,
    pub from: MovementEndpoint,
    pub to: MovementEndpoint,
}

/// Decide category, approval and destination of a movement.
///
/// `source_company` and `target_company` are the companies of the current and
/// destination locations, when known.
pub fn plan_movement(
    movement_type: &ConfigurableOption,
    settings: &SettingsData,
    from: MovementEndpoint,
    destination: Option<LocationSnapshot>,
    assignee: Option<Assignee>,
    source_company: Option<&Company>,
    target_company: Option<&Company>,
) -> AppResult<MovementPlan> {
    if !movement_type.is_active {
        return Err(AppError::BusinessRule(format!(
            "Movement type '{}' is no longer active",
            movement_type.name
        )));
    }

    let category = movement_type
        .semantic_category
        .unwrap_or_else(|| MovementCategory::classify(&movement_type.name));

    let to = MovementEndpoint {
        location: destination.or_else(|| from.location.clone()),
        assignee: match assignee {
            Some(a) => Some(a),
            None if category.releases_assignment() => None,
            None => from.assignee.clone(),
        },
    };

    if to == from && category != MovementCategory::InventoryCheck {
        return Err(AppError::Validation(
            "Movement changes neither location nor assignee".to_string(),
        ));
    }

    let mut cross_company_approval = false;
    if let (Some(source), Some(target)) = (source_company, target_company) {
        if source.id != target.id {
            if !source.allows_equipment_sharing {
                return Err(AppError::BusinessRule(format!(
                    "Company '{}' does not share its equipment",
                    source.name
                )));
            }
            cross_company_approval = settings.cross_company_approval
                && (source.requires_transfer_approval || target.requires_transfer_approval);
        }
    }

    let type_approval = movement_type
        .requires_approval
        .unwrap_or_else(|| category.default_requires_approval());

    Ok(MovementPlan {
        category,
        requires_approval: settings.movement_approval_enabled
            && (type_approval || cross_company_approval),
        from,
        to,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::location::CompanyType;

    fn option(name: &str, category: Option<MovementCategory>, approval: Option<bool>) -> ConfigurableOption {
        ConfigurableOption {
            id: "mt".to_string(),
            name: name.to_string(),
            color: None,
            icon: None,
            is_default: false,
            is_active: true,
            order: 0,
            semantic_category: category,
            requires_approval: approval,
        }
    }

    fn snapshot(company_id: i32, site_id: i32) -> LocationSnapshot {
        LocationSnapshot {
            company_id,
            company_name: format!("C{}", company_id),
            site_id,
            site_name: format!("S{}", site_id),
            room_id: None,
            room_name: None,
        }
    }

    fn company(id: i32, sharing: bool, approval: bool) -> Company {
        Company {
            id,
            name: format!("C{}", id),
            company_type: CompanyType::Media,
            allows_equipment_sharing: sharing,
            requires_transfer_approval: approval,
            notes: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn alice() -> Assignee {
        Assignee {
            user_id: "alice".to_string(),
            user_name: "Alice".to_string(),
        }
    }

    fn at(company_id: i32, site_id: i32, assignee: Option<Assignee>) -> MovementEndpoint {
        MovementEndpoint {
            location: Some(snapshot(company_id, site_id)),
            assignee,
        }
    }

    #[test]
    fn test_classify_french_labels() {
        use MovementCategory::*;
        let cases = [
            ("Affectation", Assignment),
            ("Retour", Return),
            ("Prêt", Loan),
            ("Retour de prêt", LoanReturn),
            ("Transfert de site", TransferSite),
            ("Changement de salle", TransferRoom),
            ("Transfert inter-société", TransferCompany),
            ("Départ en mission", Mission),
            ("Retour de mission", MissionReturn),
            ("Envoi en maintenance", MaintenanceOut),
            ("Retour de maintenance", MaintenanceReturn),
            ("Envoi en réparation", RepairOut),
            ("Mise au rebut", Disposal),
            ("Déclaration de vol", Stolen),
            ("Perte", Lost),
            ("Matériel retrouvé", Found),
            ("Mise en stock", Storage),
            ("Inventaire annuel", InventoryCheck),
            ("Divers", Other),
        ];
        for (label, expected) in cases {
            assert_eq!(MovementCategory::classify(label), expected, "{}", label);
        }
    }

    #[test]
    fn test_classify_does_not_match_vol_inside_words() {
        assert_eq!(MovementCategory::classify("Volume"), MovementCategory::Other);
    }

    #[test]
    fn test_status_transitions() {
        assert_eq!(MovementStatus::Pending.approve().unwrap(), MovementStatus::Completed);
        assert_eq!(MovementStatus::Pending.reject().unwrap(), MovementStatus::Rejected);
        assert!(MovementStatus::Completed.approve().is_err());
        assert!(MovementStatus::Rejected.approve().is_err());
        assert!(MovementStatus::Completed.reject().is_err());
        assert!(MovementStatus::Rejected.is_terminal());
        assert!(!MovementStatus::Pending.is_terminal());
    }

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [
            MovementStatus::Pending,
            MovementStatus::Approved,
            MovementStatus::Rejected,
            MovementStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<MovementStatus>().unwrap(), status);
        }
        assert_eq!(
            serde_json::to_string(&MovementCategory::TransferSite).unwrap(),
            "\"transfer_site\""
        );
    }

    #[test]
    fn test_assignment_without_approval() {
        let settings = SettingsData::default();
        let plan = plan_movement(
            &option("Affectation", Some(MovementCategory::Assignment), Some(false)),
            &settings,
            at(1, 1, None),
            None,
            Some(alice()),
            None,
            None,
        )
        .unwrap();
        assert!(!plan.requires_approval);
        assert_eq!(plan.to.location, plan.from.location);
        assert_eq!(plan.to.assignee, Some(alice()));
    }

    #[test]
    fn test_stored_flag_wins_over_label() {
        let settings = SettingsData::default();
        // Label says loan but the stored attributes say assignment without approval
        let plan = plan_movement(
            &option("Prêt", Some(MovementCategory::Assignment), Some(false)),
            &settings,
            at(1, 1, None),
            None,
            Some(alice()),
            None,
            None,
        )
        .unwrap();
        assert_eq!(plan.category, MovementCategory::Assignment);
        assert!(!plan.requires_approval);
    }

    #[test]
    fn test_unclassified_option_falls_back_to_label() {
        let settings = SettingsData::default();
        let plan = plan_movement(
            &option("Transfert de site", None, None),
            &settings,
            at(1, 1, None),
            Some(snapshot(1, 2)),
            None,
            None,
            None,
        )
        .unwrap();
        assert_eq!(plan.category, MovementCategory::TransferSite);
        assert!(plan.requires_approval);
    }

    #[test]
    fn test_global_switch_disables_approval() {
        let settings = SettingsData {
            movement_approval_enabled: false,
            ..SettingsData::default()
        };
        let plan = plan_movement(
            &option("Prêt", Some(MovementCategory::Loan), Some(true)),
            &settings,
            at(1, 1, None),
            None,
            Some(alice()),
            None,
            None,
        )
        .unwrap();
        assert!(!plan.requires_approval);
    }

    #[test]
    fn test_return_releases_assignee() {
        let settings = SettingsData::default();
        let plan = plan_movement(
            &option("Retour", Some(MovementCategory::Return), Some(false)),
            &settings,
            at(1, 1, Some(alice())),
            None,
            None,
            None,
            None,
        )
        .unwrap();
        assert_eq!(plan.to.assignee, None);
    }

    #[test]
    fn test_noop_movement_rejected() {
        let settings = SettingsData::default();
        let err = plan_movement(
            &option("Affectation", Some(MovementCategory::Assignment), Some(false)),
            &settings,
            at(1, 1, Some(alice())),
            None,
            None,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_cross_company_requires_approval() {
        let settings = SettingsData::default();
        let plan = plan_movement(
            &option("Changement de salle", Some(MovementCategory::TransferRoom), Some(false)),
            &settings,
            at(1, 1, None),
            Some(snapshot(2, 5)),
            None,
            Some(&company(1, true, false)),
            Some(&company(2, true, true)),
        )
        .unwrap();
        assert!(plan.requires_approval);
    }

    #[test]
    fn test_cross_company_refused_without_sharing() {
        let settings = SettingsData::default();
        let err = plan_movement(
            &option("Transfert", Some(MovementCategory::TransferCompany), None),
            &settings,
            at(1, 1, None),
            Some(snapshot(2, 5)),
            None,
            Some(&company(1, false, false)),
            Some(&company(2, true, false)),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[test]
    fn test_inactive_type_refused() {
        let mut movement_type = option("Prêt", Some(MovementCategory::Loan), None);
        movement_type.is_active = false;
        let err = plan_movement(
            &movement_type,
            &SettingsData::default(),
            at(1, 1, None),
            None,
            Some(alice()),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }
}
