//! Equipment model

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use super::{
    document::EquipmentDocument,
    fold_text,
    location::{LocationRef, LocationSnapshot},
    movement::{Assignee, MovementEndpoint},
    settings::{OptionList, SettingsData},
};

/// Who currently holds an equipment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Assignment {
    pub user_id: String,
    pub user_name: String,
    pub assigned_at: DateTime<Utc>,
    pub expected_return_at: Option<DateTime<Utc>>,
}

impl Assignment {
    /// Assignment resulting from a completed movement.
    /// The original `assigned_at` is kept when the holder does not change.
    pub fn after_movement(
        current: Option<&Assignment>,
        assignee: Option<&Assignee>,
        expected_return_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<Assignment> {
        let assignee = assignee?;
        match current {
            Some(current) if current.user_id == assignee.user_id => Some(Assignment {
                user_id: current.user_id.clone(),
                user_name: assignee.user_name.clone(),
                assigned_at: current.assigned_at,
                expected_return_at: expected_return_at.or(current.expected_return_at),
            }),
            _ => Some(Assignment {
                user_id: assignee.user_id.clone(),
                user_name: assignee.user_name.clone(),
                assigned_at: now,
                expected_return_at,
            }),
        }
    }

    pub fn assignee(&self) -> Assignee {
        Assignee {
            user_id: self.user_id.clone(),
            user_name: self.user_name.clone(),
        }
    }
}

/// Equipment record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Equipment {
    pub id: i32,
    /// Human-readable reference, e.g. `INV-0042`; never reused
    pub reference: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub status_id: Option<String>,
    pub condition_id: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub current_location: Option<LocationSnapshot>,
    pub current_assignment: Option<Assignment>,
    pub acquisition_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>)]
    pub purchase_price: Option<Decimal>,
    pub supplier: Option<String>,
    pub warranty_end_date: Option<NaiveDate>,
    pub is_consumable: bool,
    pub quantity: Option<i32>,
    pub min_quantity: Option<i32>,
    pub is_archived: bool,
    pub archived_reason: Option<String>,
    pub archived_at: Option<DateTime<Utc>>,
    pub documents: Vec<EquipmentDocument>,
    pub photos: Vec<String>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Internal row structure for equipment queries
#[derive(Debug, Clone, FromRow)]
pub struct EquipmentRow {
    id: i32,
    reference: String,
    name: String,
    description: Option<String>,
    category_id: Option<String>,
    status_id: Option<String>,
    condition_id: Option<String>,
    brand: Option<String>,
    model: Option<String>,
    serial_number: Option<String>,
    current_location: Option<Json<LocationSnapshot>>,
    current_assignment: Option<Json<Assignment>>,
    acquisition_date: Option<NaiveDate>,
    purchase_price: Option<Decimal>,
    supplier: Option<String>,
    warranty_end_date: Option<NaiveDate>,
    is_consumable: bool,
    quantity: Option<i32>,
    min_quantity: Option<i32>,
    is_archived: bool,
    archived_reason: Option<String>,
    archived_at: Option<DateTime<Utc>>,
    documents: Json<Vec<EquipmentDocument>>,
    photos: Vec<String>,
    notes: Option<String>,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<EquipmentRow> for Equipment {
    fn from(row: EquipmentRow) -> Self {
        Equipment {
            id: row.id,
            reference: row.reference,
            name: row.name,
            description: row.description,
            category_id: row.category_id,
            status_id: row.status_id,
            condition_id: row.condition_id,
            brand: row.brand,
            model: row.model,
            serial_number: row.serial_number,
            current_location: row.current_location.map(|j| j.0),
            current_assignment: row.current_assignment.map(|j| j.0),
            acquisition_date: row.acquisition_date,
            purchase_price: row.purchase_price,
            supplier: row.supplier,
            warranty_end_date: row.warranty_end_date,
            is_consumable: row.is_consumable,
            quantity: row.quantity,
            min_quantity: row.min_quantity,
            is_archived: row.is_archived,
            archived_reason: row.archived_reason,
            archived_at: row.archived_at,
            documents: row.documents.0,
            photos: row.photos,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Equipment {
    /// Current location and holder, as the `from` side of a movement
    pub fn endpoint(&self) -> MovementEndpoint {
        MovementEndpoint {
            location: self.current_location.clone(),
            assignee: self.current_assignment.as_ref().map(Assignment::assignee),
        }
    }

    pub fn company_id(&self) -> Option<i32> {
        self.current_location.as_ref().map(|l| l.company_id)
    }

    /// Consumable at or below its minimum; the global threshold applies when no minimum is set
    pub fn is_low_stock(&self, default_threshold: i32) -> bool {
        if !self.is_consumable {
            return false;
        }
        match self.quantity {
            Some(quantity) => quantity <= self.min_quantity.unwrap_or(default_threshold),
            None => false,
        }
    }

    /// Folded concatenation of every field the free-text search looks at
    pub fn search_text(&self, settings: &SettingsData) -> String {
        let location = self.current_location.as_ref();
        let parts = [
            Some(self.name.as_str()),
            Some(self.reference.as_str()),
            self.serial_number.as_deref(),
            self.brand.as_deref(),
            self.model.as_deref(),
            self.category_id
                .as_deref()
                .and_then(|id| settings.find_option(OptionList::Categories, id))
                .map(|o| o.name.as_str()),
            location.map(|l| l.site_name.as_str()),
            location.and_then(|l| l.room_name.as_deref()),
            self.current_assignment.as_ref().map(|a| a.user_name.as_str()),
        ];
        fold_text(&parts.iter().flatten().copied().collect::<Vec<_>>().join(" "))
    }
}

fn validate_stock(is_consumable: Option<bool>, quantity: Option<i32>, min_quantity: Option<i32>) -> Result<(), ValidationError> {
    if is_consumable != Some(true) && (quantity.is_some() || min_quantity.is_some()) {
        let mut err = ValidationError::new("stock_requires_consumable");
        err.message = Some("Quantities are only tracked for consumables".into());
        return Err(err);
    }
    if quantity.map(|q| q < 0).unwrap_or(false) || min_quantity.map(|q| q < 0).unwrap_or(false) {
        let mut err = ValidationError::new("negative_quantity");
        err.message = Some("Quantities cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

fn validate_create_stock(data: &CreateEquipment) -> Result<(), ValidationError> {
    validate_stock(data.is_consumable, data.quantity, data.min_quantity)
}

/// Create equipment request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_create_stock"))]
pub struct CreateEquipment {
    #[validate(length(min = 1, max = 200, message = "Equipment name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub status_id: Option<String>,
    pub condition_id: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub location: Option<LocationRef>,
    pub acquisition_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>)]
    pub purchase_price: Option<Decimal>,
    pub supplier: Option<String>,
    pub warranty_end_date: Option<NaiveDate>,
    pub is_consumable: Option<bool>,
    pub quantity: Option<i32>,
    pub min_quantity: Option<i32>,
    pub notes: Option<String>,
}

/// Update equipment request (partial)
///
/// Location changes here are corrections; actual moves go through movements.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateEquipment {
    #[validate(length(min = 1, max = 200, message = "Equipment name cannot be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub status_id: Option<String>,
    pub condition_id: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub location: Option<LocationRef>,
    pub acquisition_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>)]
    pub purchase_price: Option<Decimal>,
    pub supplier: Option<String>,
    pub warranty_end_date: Option<NaiveDate>,
    pub is_consumable: Option<bool>,
    pub quantity: Option<i32>,
    pub min_quantity: Option<i32>,
    pub notes: Option<String>,
}

impl UpdateEquipment {
    /// Check stock fields against the consumable flag the record will end up with
    pub fn validate_against(&self, current: &Equipment) -> Result<(), ValidationError> {
        let is_consumable = self.is_consumable.unwrap_or(current.is_consumable);
        validate_stock(Some(is_consumable), self.quantity, self.min_quantity)
    }
}

/// Archive (soft delete) request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ArchiveEquipment {
    #[validate(length(min = 1, message = "An archive reason is required"))]
    pub reason: String,
}

/// Equipment list filters
///
/// Categories, statuses, company, archive flag, consumable flag and assignee
/// are evaluated by the database; the rest is applied to the fetched rows.
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct EquipmentFilters {
    #[serde(default)]
    pub category_id: Vec<String>,
    #[serde(default)]
    pub status_id: Vec<String>,
    pub company_id: Option<i32>,
    /// Defaults to false: archived equipment is hidden unless asked for
    pub is_archived: Option<bool>,
    pub is_consumable: Option<bool>,
    pub assigned_user_id: Option<String>,
    /// Accent- and case-insensitive free text
    pub search: Option<String>,
    #[serde(default)]
    pub brand: Vec<String>,
    #[serde(default)]
    pub site_id: Vec<i32>,
    #[serde(default)]
    pub room_id: Vec<i32>,
    #[serde(default)]
    pub low_stock: bool,
    pub limit: Option<i64>,
}

impl EquipmentFilters {
    pub fn archived(&self) -> bool {
        self.is_archived.unwrap_or(false)
    }

    /// Whether any filter has to run after the database query
    pub fn has_post_filters(&self) -> bool {
        self.search.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
            || !self.brand.is_empty()
            || !self.site_id.is_empty()
            || !self.room_id.is_empty()
            || self.low_stock
    }

    /// In-process phase of the pipeline
    pub fn matches(&self, equipment: &Equipment, settings: &SettingsData) -> bool {
        if let Some(search) = self.search.as_deref() {
            let needle = fold_text(search.trim());
            if !needle.is_empty() && !equipment.search_text(settings).contains(&needle) {
                return false;
            }
        }
        if !self.brand.is_empty() {
            let brand = equipment.brand.as_deref().map(fold_text);
            if !self
                .brand
                .iter()
                .any(|b| brand.as_deref() == Some(fold_text(b).as_str()))
            {
                return false;
            }
        }
        let location = equipment.current_location.as_ref();
        if !self.site_id.is_empty()
            && !location.map(|l| self.site_id.contains(&l.site_id)).unwrap_or(false)
        {
            return false;
        }
        if !self.room_id.is_empty()
            && !location
                .and_then(|l| l.room_id)
                .map(|r| self.room_id.contains(&r))
                .unwrap_or(false)
        {
            return false;
        }
        if self.low_stock && !equipment.is_low_stock(settings.low_stock_threshold) {
            return false;
        }
        true
    }

    pub fn apply(&self, rows: Vec<Equipment>, settings: &SettingsData) -> Vec<Equipment> {
        if !self.has_post_filters() {
            return rows;
        }
        rows.into_iter().filter(|e| self.matches(e, settings)).collect()
    }
}

#[cfg(test)]
pub(crate) fn sample(id: i32, name: &str) -> Equipment {
    Equipment {
        id,
        reference: format!("INV-{:04}", id),
        name: name.to_string(),
        description: None,
        category_id: None,
        status_id: None,
        condition_id: None,
        brand: None,
        model: None,
        serial_number: None,
        current_location: None,
        current_assignment: None,
        acquisition_date: None,
        purchase_price: None,
        supplier: None,
        warranty_end_date: None,
        is_consumable: false,
        quantity: None,
        min_quantity: None,
        is_archived: false,
        archived_reason: None,
        archived_at: None,
        documents: Vec::new(),
        photos: Vec::new(),
        notes: None,
        created_by: None,
        created_at: Utc::now(),
        updated_at: None,
    }
}
