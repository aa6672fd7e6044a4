//! Inventory settings: configurable option lists, reference counter and toggles

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::movement::MovementCategory;
use crate::error::{AppError, AppResult};

pub const DEFAULT_REFERENCE_PREFIX: &str = "INV";
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 2;

static PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9-]{1,10}$").expect("prefix pattern is valid"));

/// Format a reference: prefix, dash, counter padded to at least 4 digits
pub fn format_reference(prefix: &str, counter: i32) -> String {
    format!("{}-{:04}", prefix, counter)
}

/// Counter value following `counter`; fails once the counter is exhausted
pub fn next_counter(counter: i32) -> AppResult<i32> {
    counter.checked_add(1).ok_or_else(|| {
        AppError::BusinessRule(format!("Reference counter exhausted at {}", counter))
    })
}

/// Trim and uppercase a reference prefix, rejecting anything outside `[A-Z0-9-]{1,10}`
pub fn normalize_prefix(raw: &str) -> AppResult<String> {
    let prefix = raw.trim().to_uppercase();
    if PREFIX_RE.is_match(&prefix) {
        Ok(prefix)
    } else {
        Err(AppError::Validation(format!(
            "Invalid reference prefix '{}': 1 to 10 characters among A-Z, 0-9 and '-'",
            raw
        )))
    }
}

/// Admin-editable taxonomy entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConfigurableOption {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Display sort key, not necessarily contiguous
    #[serde(default)]
    pub order: i32,
    /// Movement types only: what the movement means
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_category: Option<MovementCategory>,
    /// Movement types only: whether movements of this type wait for approval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_approval: Option<bool>,
}

fn default_true() -> bool {
    true
}

impl ConfigurableOption {
    fn seeded(name: &str, color: &str, icon: &str, order: i32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            color: Some(color.to_string()),
            icon: Some(icon.to_string()),
            is_default: false,
            is_active: true,
            order,
            semantic_category: None,
            requires_approval: None,
        }
    }

    fn movement(name: &str, color: &str, icon: &str, order: i32, category: MovementCategory) -> Self {
        let mut option = Self::seeded(name, color, icon, order);
        option.semantic_category = Some(category);
        option.requires_approval = Some(category.default_requires_approval());
        option
    }

    fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// Which option list an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OptionList {
    Categories,
    Statuses,
    Conditions,
    MovementTypes,
    DocumentTypes,
    MissionTypes,
}

impl OptionList {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionList::Categories => "categories",
            OptionList::Statuses => "statuses",
            OptionList::Conditions => "conditions",
            OptionList::MovementTypes => "movement_types",
            OptionList::DocumentTypes => "document_types",
            OptionList::MissionTypes => "mission_types",
        }
    }
}

/// Content of the settings row's JSONB column
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct SettingsData {
    pub categories: Vec<ConfigurableOption>,
    pub statuses: Vec<ConfigurableOption>,
    pub conditions: Vec<ConfigurableOption>,
    pub movement_types: Vec<ConfigurableOption>,
    pub document_types: Vec<ConfigurableOption>,
    pub mission_types: Vec<ConfigurableOption>,
    /// Master switch: when off, every movement completes immediately
    pub movement_approval_enabled: bool,
    /// Movements between two companies need approval when either company asks for it
    pub cross_company_approval: bool,
    /// Minimum used for consumables that have no minimum of their own
    pub low_stock_threshold: i32,
    pub notify_low_stock: bool,
    pub notify_pending_approval: bool,
}

impl Default for SettingsData {
    fn default() -> Self {
        use MovementCategory as M;

        Self {
            categories: vec![
                ConfigurableOption::seeded("Microphone", "#2563eb", "mic", 0),
                ConfigurableOption::seeded("Console", "#7c3aed", "sliders", 1),
                ConfigurableOption::seeded("Casque", "#0891b2", "headphones", 2),
                ConfigurableOption::seeded("Émetteur", "#dc2626", "radio", 3),
                ConfigurableOption::seeded("Informatique", "#4b5563", "laptop", 4),
                ConfigurableOption::seeded("Câblage", "#a16207", "cable", 5),
                ConfigurableOption::seeded("Consommable", "#65a30d", "package", 6),
            ],
            statuses: vec![
                ConfigurableOption::seeded("Disponible", "#16a34a", "check", 0).as_default(),
                ConfigurableOption::seeded("En service", "#2563eb", "activity", 1),
                ConfigurableOption::seeded("En maintenance", "#f59e0b", "wrench", 2),
                ConfigurableOption::seeded("Hors service", "#dc2626", "x-circle", 3),
            ],
            conditions: vec![
                ConfigurableOption::seeded("Neuf", "#16a34a", "star", 0),
                ConfigurableOption::seeded("Bon", "#2563eb", "thumbs-up", 1).as_default(),
                ConfigurableOption::seeded("Usé", "#f59e0b", "alert-triangle", 2),
                ConfigurableOption::seeded("Défectueux", "#dc2626", "alert-octagon", 3),
            ],
            movement_types: vec![
                ConfigurableOption::movement("Affectation", "#2563eb", "user-plus", 0, M::Assignment).as_default(),
                ConfigurableOption::movement("Retour", "#16a34a", "corner-down-left", 1, M::Return),
                ConfigurableOption::movement("Prêt", "#7c3aed", "share", 2, M::Loan),
                ConfigurableOption::movement("Retour de prêt", "#16a34a", "corner-down-left", 3, M::LoanReturn),
                ConfigurableOption::movement("Transfert de site", "#0891b2", "truck", 4, M::TransferSite),
                ConfigurableOption::movement("Changement de salle", "#0891b2", "move", 5, M::TransferRoom),
                ConfigurableOption::movement("Transfert inter-société", "#be185d", "repeat", 6, M::TransferCompany),
                ConfigurableOption::movement("Départ en mission", "#ea580c", "map-pin", 7, M::Mission),
                ConfigurableOption::movement("Retour de mission", "#16a34a", "home", 8, M::MissionReturn),
                ConfigurableOption::movement("Envoi en maintenance", "#f59e0b", "tool", 9, M::MaintenanceOut),
                ConfigurableOption::movement("Retour de maintenance", "#16a34a", "tool", 10, M::MaintenanceReturn),
                ConfigurableOption::movement("Mise au rebut", "#dc2626", "trash", 11, M::Disposal),
            ],
            document_types: vec![
                ConfigurableOption::seeded("Facture", "#4b5563", "file-text", 0),
                ConfigurableOption::seeded("Manuel", "#2563eb", "book", 1),
                ConfigurableOption::seeded("Garantie", "#16a34a", "shield", 2),
                ConfigurableOption::seeded("Certificat", "#7c3aed", "award", 3),
            ],
            mission_types: vec![
                ConfigurableOption::seeded("Reportage", "#ea580c", "mic", 0),
                ConfigurableOption::seeded("Direct extérieur", "#dc2626", "radio", 1),
                ConfigurableOption::seeded("Événement", "#7c3aed", "calendar", 2),
            ],
            movement_approval_enabled: true,
            cross_company_approval: true,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            notify_low_stock: true,
            notify_pending_approval: true,
        }
    }
}

/// Incoming option (create or whole-list replace)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct OptionInput {
    /// Keep an existing id when replacing a list; new ids are generated otherwise
    pub id: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Option name is required"))]
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub is_default: Option<bool>,
    pub is_active: Option<bool>,
    pub order: Option<i32>,
    pub semantic_category: Option<MovementCategory>,
    pub requires_approval: Option<bool>,
}

/// Partial update of one option
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateOption {
    #[validate(length(min = 1, max = 100, message = "Option name cannot be empty"))]
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub is_default: Option<bool>,
    pub is_active: Option<bool>,
    pub order: Option<i32>,
    pub semantic_category: Option<MovementCategory>,
    pub requires_approval: Option<bool>,
}

impl SettingsData {
    pub fn options(&self, list: OptionList) -> &Vec<ConfigurableOption> {
        match list {
            OptionList::Categories => &self.categories,
            OptionList::Statuses => &self.statuses,
            OptionList::Conditions => &self.conditions,
            OptionList::MovementTypes => &self.movement_types,
            OptionList::DocumentTypes => &self.document_types,
            OptionList::MissionTypes => &self.mission_types,
        }
    }

    fn options_mut(&mut self, list: OptionList) -> &mut Vec<ConfigurableOption> {
        match list {
            OptionList::Categories => &mut self.categories,
            OptionList::Statuses => &mut self.statuses,
            OptionList::Conditions => &mut self.conditions,
            OptionList::MovementTypes => &mut self.movement_types,
            OptionList::DocumentTypes => &mut self.document_types,
            OptionList::MissionTypes => &mut self.mission_types,
        }
    }

    pub fn find_option(&self, list: OptionList, id: &str) -> Option<&ConfigurableOption> {
        self.options(list).iter().find(|o| o.id == id)
    }

    /// Display name of an option id, falling back to the raw id
    pub fn option_name(&self, list: OptionList, id: Option<&str>) -> String {
        match id {
            Some(id) => self
                .find_option(list, id)
                .map(|o| o.name.clone())
                .unwrap_or_else(|| id.to_string()),
            None => String::new(),
        }
    }

    /// Replace a whole list
    pub fn replace_options(&mut self, list: OptionList, inputs: Vec<OptionInput>) -> AppResult<()> {
        if inputs.iter().filter(|i| i.is_default == Some(true)).count() > 1 {
            return Err(AppError::Validation(format!(
                "At most one default option allowed in {}",
                list.as_str()
            )));
        }
        let mut options = Vec::with_capacity(inputs.len());
        for (position, input) in inputs.into_iter().enumerate() {
            input.validate()?;
            let mut option = build_option(list, input, position as i32);
            if option.id.is_empty() || options.iter().any(|o: &ConfigurableOption| o.id == option.id) {
                option.id = Uuid::new_v4().to_string();
            }
            options.push(option);
        }
        *self.options_mut(list) = options;
        Ok(())
    }

    /// Append one option, returning it
    pub fn add_option(&mut self, list: OptionList, mut input: OptionInput) -> AppResult<ConfigurableOption> {
        input.validate()?;
        input.id = None;
        let next_order = self
            .options(list)
            .iter()
            .map(|o| o.order + 1)
            .max()
            .unwrap_or(0);
        let option = build_option(list, input, next_order);
        if option.is_default {
            self.clear_default(list);
        }
        self.options_mut(list).push(option.clone());
        Ok(option)
    }

    /// Patch one option in place
    pub fn update_option(&mut self, list: OptionList, id: &str, patch: UpdateOption) -> AppResult<ConfigurableOption> {
        patch.validate()?;
        if patch.is_default == Some(true) {
            self.clear_default(list);
        }
        let option = self
            .options_mut(list)
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Option {} not found in {}", id, list.as_str())))?;

        if let Some(name) = patch.name {
            option.name = name.trim().to_string();
        }
        if patch.color.is_some() {
            option.color = patch.color;
        }
        if patch.icon.is_some() {
            option.icon = patch.icon;
        }
        if let Some(is_default) = patch.is_default {
            option.is_default = is_default;
        }
        if let Some(is_active) = patch.is_active {
            option.is_active = is_active;
        }
        if let Some(order) = patch.order {
            option.order = order;
        }
        if list == OptionList::MovementTypes {
            if patch.semantic_category.is_some() {
                option.semantic_category = patch.semantic_category;
            }
            if patch.requires_approval.is_some() {
                option.requires_approval = patch.requires_approval;
            }
        }
        Ok(option.clone())
    }

    /// Soft-delete an option; a deactivated option cannot stay the default
    pub fn deactivate_option(&mut self, list: OptionList, id: &str) -> AppResult<ConfigurableOption> {
        self.update_option(
            list,
            id,
            UpdateOption {
                is_active: Some(false),
                is_default: Some(false),
                ..Default::default()
            },
        )
    }

    fn clear_default(&mut self, list: OptionList) {
        for option in self.options_mut(list).iter_mut() {
            option.is_default = false;
        }
    }
}

fn build_option(list: OptionList, input: OptionInput, fallback_order: i32) -> ConfigurableOption {
    let name = input.name.trim().to_string();
    let (semantic_category, requires_approval) = if list == OptionList::MovementTypes {
        // Classify once at save time; later renames keep the stored meaning
        let category = input
            .semantic_category
            .unwrap_or_else(|| MovementCategory::classify(&name));
        (
            Some(category),
            Some(input.requires_approval.unwrap_or_else(|| category.default_requires_approval())),
        )
    } else {
        (None, None)
    };

    ConfigurableOption {
        id: input.id.unwrap_or_default(),
        name,
        color: input.color,
        icon: input.icon,
        is_default: input.is_default.unwrap_or(false),
        is_active: input.is_active.unwrap_or(true),
        order: input.order.unwrap_or(fallback_order),
        semantic_category,
        requires_approval,
    }
}

/// Settings as exposed by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InventorySettings {
    pub reference_prefix: String,
    pub reference_counter: i32,
    #[serde(flatten)]
    pub data: SettingsData,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

impl InventorySettings {
    /// Reference the next allocation would produce
    pub fn next_reference_preview(&self) -> AppResult<String> {
        Ok(format_reference(&self.reference_prefix, next_counter(self.reference_counter)?))
    }
}

/// Update of the scalar settings
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateSettings {
    pub reference_prefix: Option<String>,
    /// Can only move forward; references are never reused
    pub reference_counter: Option<i32>,
    pub movement_approval_enabled: Option<bool>,
    pub cross_company_approval: Option<bool>,
    pub low_stock_threshold: Option<i32>,
    pub notify_low_stock: Option<bool>,
    pub notify_pending_approval: Option<bool>,
}

impl UpdateSettings {
    /// Apply to the stored values; returns the new (prefix, counter)
    pub fn apply(
        self,
        prefix: &str,
        counter: i32,
        data: &mut SettingsData,
    ) -> AppResult<(String, i32)> {
        let prefix = match self.reference_prefix {
            Some(ref raw) => normalize_prefix(raw)?,
            None => prefix.to_string(),
        };
        let counter = match self.reference_counter {
            Some(next) if next < counter => {
                return Err(AppError::Validation(format!(
                    "Reference counter cannot go back from {} to {}",
                    counter, next
                )));
            }
            Some(next) => {
                // The allocator must still be able to advance past it
                next_counter(next).map_err(|_| {
                    AppError::Validation(format!("Reference counter {} is out of range", next))
                })?;
                next
            }
            None => counter,
        };
        if let Some(threshold) = self.low_stock_threshold {
            if threshold < 0 {
                return Err(AppError::Validation("Low stock threshold must be positive".to_string()));
            }
            data.low_stock_threshold = threshold;
        }
        if let Some(v) = self.movement_approval_enabled {
            data.movement_approval_enabled = v;
        }
        if let Some(v) = self.cross_company_approval {
            data.cross_company_approval = v;
        }
        if let Some(v) = self.notify_low_stock {
            data.notify_low_stock = v;
        }
        if let Some(v) = self.notify_pending_approval {
            data.notify_pending_approval = v;
        }
        Ok((prefix, counter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str) -> OptionInput {
        OptionInput {
            id: None,
            name: name.to_string(),
            color: None,
            icon: None,
            is_default: None,
            is_active: None,
            order: None,
            semantic_category: None,
            requires_approval: None,
        }
    }

    #[test]
    fn test_format_reference_pads_to_four_digits() {
        assert_eq!(format_reference("INV", 1), "INV-0001");
        assert_eq!(format_reference("STUDIO-A", 42), "STUDIO-A-0042");
        assert_eq!(format_reference("X", 9999), "X-9999");
    }

    #[test]
    fn test_format_reference_widens_past_9999() {
        assert_eq!(format_reference("INV", 10000), "INV-10000");
        assert_eq!(format_reference("INV", 123456), "INV-123456");
    }

    #[test]
    fn test_reference_matches_public_format() {
        let re = Regex::new(r"^[A-Z0-9-]{1,10}-\d{4}$").unwrap();
        for (prefix, counter) in [("INV", 1), ("R2-D2", 250), ("ABCDEFGHIJ", 9999), ("0", 7)] {
            let reference = format_reference(&normalize_prefix(prefix).unwrap(), counter);
            assert!(re.is_match(&reference), "{}", reference);
            assert!(reference.starts_with(&format!("{}-", prefix)));
        }
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(" radio ").unwrap(), "RADIO");
        assert_eq!(normalize_prefix("fm-93").unwrap(), "FM-93");
        assert!(normalize_prefix("").is_err());
        assert!(normalize_prefix("ELEVENCHARS").is_err());
        assert!(normalize_prefix("IN V").is_err());
        assert!(normalize_prefix("ÉQUIP").is_err());
    }

    #[test]
    fn test_defaults_have_single_default_per_list() {
        let data = SettingsData::default();
        for list in [OptionList::Statuses, OptionList::Conditions, OptionList::MovementTypes] {
            assert_eq!(data.options(list).iter().filter(|o| o.is_default).count(), 1);
        }
        assert!(data.movement_types.iter().all(|o| o.semantic_category.is_some()));
    }

    #[test]
    fn test_add_option_appends_with_next_order() {
        let mut data = SettingsData::default();
        let before = data.categories.len();
        let option = data.add_option(OptionList::Categories, input("Enceinte")).unwrap();
        assert_eq!(data.categories.len(), before + 1);
        assert_eq!(option.order, before as i32);
        assert!(option.is_active);
        assert!(option.semantic_category.is_none());
    }

    #[test]
    fn test_new_default_clears_previous_default() {
        let mut data = SettingsData::default();
        let mut new = input("Réservé");
        new.is_default = Some(true);
        let option = data.add_option(OptionList::Statuses, new).unwrap();
        let defaults: Vec<_> = data.statuses.iter().filter(|o| o.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, option.id);
    }

    #[test]
    fn test_movement_type_is_classified_when_saved() {
        let mut data = SettingsData::default();
        let option = data
            .add_option(OptionList::MovementTypes, input("Prêt à une autre antenne"))
            .unwrap();
        assert_eq!(option.semantic_category, Some(MovementCategory::Loan));
        assert_eq!(option.requires_approval, Some(true));

        // Renaming keeps the stored meaning
        let renamed = data
            .update_option(
                OptionList::MovementTypes,
                &option.id,
                UpdateOption {
                    name: Some("Affectation temporaire".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.semantic_category, Some(MovementCategory::Loan));
    }

    #[test]
    fn test_deactivate_option() {
        let mut data = SettingsData::default();
        let id = data.statuses[0].id.clone();
        let option = data.deactivate_option(OptionList::Statuses, &id).unwrap();
        assert!(!option.is_active);
        assert!(!option.is_default);
        assert!(data.deactivate_option(OptionList::Statuses, "missing").is_err());
    }

    #[test]
    fn test_replace_rejects_two_defaults() {
        let mut data = SettingsData::default();
        let mut a = input("A");
        a.is_default = Some(true);
        let mut b = input("B");
        b.is_default = Some(true);
        assert!(data.replace_options(OptionList::Conditions, vec![a, b]).is_err());
    }

    #[test]
    fn test_replace_keeps_ids_and_assigns_missing() {
        let mut data = SettingsData::default();
        let mut kept = input("Bon");
        kept.id = Some("keep-me".to_string());
        data.replace_options(OptionList::Conditions, vec![kept, input("Neuf")]).unwrap();
        assert_eq!(data.conditions.len(), 2);
        assert_eq!(data.conditions[0].id, "keep-me");
        assert!(!data.conditions[1].id.is_empty());
        assert_eq!(data.conditions[1].order, 1);
    }

    #[test]
    fn test_counter_cannot_go_back() {
        let mut data = SettingsData::default();
        let update = UpdateSettings {
            reference_counter: Some(3),
            ..Default::default()
        };
        assert!(update.apply("INV", 10, &mut data).is_err());

        let update = UpdateSettings {
            reference_prefix: Some("fm".to_string()),
            reference_counter: Some(20),
            ..Default::default()
        };
        assert_eq!(update.apply("INV", 10, &mut data).unwrap(), ("FM".to_string(), 20));
    }

    #[test]
    fn test_counter_at_upper_bound_rejected() {
        let mut data = SettingsData::default();
        let update = UpdateSettings {
            reference_counter: Some(i32::MAX),
            ..Default::default()
        };
        assert!(matches!(
            update.apply("INV", 10, &mut data),
            Err(AppError::Validation(_))
        ));

        let update = UpdateSettings {
            reference_counter: Some(i32::MAX - 1),
            ..Default::default()
        };
        assert_eq!(update.apply("INV", 10, &mut data).unwrap().1, i32::MAX - 1);
    }

    #[test]
    fn test_next_counter_stops_at_upper_bound() {
        assert_eq!(next_counter(41).unwrap(), 42);
        assert!(matches!(next_counter(i32::MAX), Err(AppError::BusinessRule(_))));
    }

    #[test]
    fn test_option_name_falls_back_to_id() {
        let data = SettingsData::default();
        let id = data.categories[0].id.clone();
        assert_eq!(data.option_name(OptionList::Categories, Some(&id)), "Microphone");
        assert_eq!(data.option_name(OptionList::Categories, Some("legacy")), "legacy");
        assert_eq!(data.option_name(OptionList::Categories, None), "");
    }
}
