//! Movements service: create, approve and reject equipment movements

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{Assignment, Equipment},
        movement::{plan_movement, CreateMovement, EquipmentMovement, MovementQuery, MovementStatus, RejectMovement},
        session::Session,
        settings::OptionList,
    },
    repository::{movements::NewMovement, Repository},
};

use super::{
    events::{ChangeFeed, InventoryEvent},
    locations::LocationsService,
    settings::SettingsService,
};

/// Movement together with the equipment as it stands afterwards
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MovementOutcome {
    pub movement: EquipmentMovement,
    pub equipment: Equipment,
}

#[derive(Clone)]
pub struct MovementsService {
    repository: Repository,
    locations: LocationsService,
    settings: SettingsService,
    feed: ChangeFeed,
}

impl MovementsService {
    pub fn new(
        repository: Repository,
        locations: LocationsService,
        settings: SettingsService,
        feed: ChangeFeed,
    ) -> Self {
        Self {
            repository,
            locations,
            settings,
            feed,
        }
    }

    pub async fn list(&self, query: &MovementQuery) -> AppResult<(Vec<EquipmentMovement>, i64)> {
        self.repository.movements.list(query).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<EquipmentMovement> {
        self.repository.movements.get_by_id(id).await
    }

    pub async fn list_for_equipment(&self, equipment_id: i32) -> AppResult<Vec<EquipmentMovement>> {
        self.repository.equipment.get_by_id(equipment_id).await?;
        self.repository.movements.list_for_equipment(equipment_id).await
    }

    /// Record a movement.
    ///
    /// Without approval the movement is written as completed and the equipment
    /// is updated in the same transaction. With approval only the pending
    /// movement is written.
    pub async fn create(&self, data: &CreateMovement, session: &Session) -> AppResult<MovementOutcome> {
        data.validate()?;

        let settings = self.settings.get_settings().await?;
        let movement_type = settings
            .data
            .find_option(OptionList::MovementTypes, &data.movement_type_id)
            .cloned()
            .ok_or_else(|| {
                AppError::Validation(format!("Unknown movement type {}", data.movement_type_id))
            })?;

        // Every read below goes through the transaction's own connection
        let mut tx = self.repository.begin().await?;
        let equipment = self.repository.equipment.lock(&mut *tx, data.equipment_id).await?;
        if equipment.is_archived {
            return Err(AppError::BusinessRule(format!(
                "Equipment {} is archived and cannot move",
                equipment.reference
            )));
        }

        let destination = match data.to_location {
            Some(location) => Some(self.locations.resolve_locked(&mut *tx, location).await?),
            None => None,
        };
        let source_company = match equipment.company_id() {
            Some(id) => Some(self.repository.locations.find_company(&mut *tx, id).await?),
            None => None,
        };
        let target_company = match destination.as_ref() {
            Some(location) => Some(
                self.repository
                    .locations
                    .find_company(&mut *tx, location.company_id)
                    .await?,
            ),
            None => None,
        };

        let plan = plan_movement(
            &movement_type,
            &settings.data,
            equipment.endpoint(),
            destination,
            data.to_assignee.clone(),
            source_company.as_ref(),
            target_company.as_ref(),
        )?;

        let now = Utc::now();
        let status = if plan.requires_approval {
            MovementStatus::Pending
        } else {
            MovementStatus::Completed
        };

        let movement = self
            .repository
            .movements
            .insert(
                &mut *tx,
                &NewMovement {
                    equipment_id: equipment.id,
                    movement_type_id: &movement_type.id,
                    category: plan.category,
                    from: &plan.from,
                    to: &plan.to,
                    status,
                    requires_approval: plan.requires_approval,
                    reason: data.reason.as_deref(),
                    notes: data.notes.as_deref(),
                    expected_return_at: data.expected_return_at,
                    requested_by: session.user_id(),
                    requested_by_name: &session.name,
                    completed_at: (!plan.requires_approval).then_some(now),
                },
            )
            .await?;

        let equipment = if plan.requires_approval {
            equipment
        } else {
            let assignment = Assignment::after_movement(
                equipment.current_assignment.as_ref(),
                plan.to.assignee.as_ref(),
                data.expected_return_at,
                now,
            );
            self.repository
                .equipment
                .set_position(&mut *tx, equipment.id, plan.to.location.as_ref(), assignment.as_ref())
                .await?
        };

        tx.commit().await?;

        tracing::info!(
            "Movement {} ({}) for {} by {}: {}",
            movement.id,
            movement.movement_category,
            equipment.reference,
            session.user_id(),
            movement.status
        );

        if plan.requires_approval {
            if settings.data.notify_pending_approval {
                self.feed.publish(InventoryEvent::ApprovalRequested {
                    movement_id: movement.id,
                    equipment_id: equipment.id,
                });
            }
        } else {
            self.feed.publish(InventoryEvent::EquipmentChanged { equipment_id: equipment.id });
        }

        Ok(MovementOutcome { movement, equipment })
    }

    /// Apply a pending movement to its equipment and mark it completed
    pub async fn approve(&self, id: i32, session: &Session) -> AppResult<MovementOutcome> {
        let mut tx = self.repository.begin().await?;
        let movement = self.repository.movements.lock(&mut *tx, id).await?;
        movement.status.approve()?;

        let equipment = self
            .repository
            .equipment
            .lock(&mut *tx, movement.equipment_id)
            .await?;
        if equipment.is_archived {
            return Err(AppError::BusinessRule(format!(
                "Equipment {} was archived since the request",
                equipment.reference
            )));
        }

        // The destination must still be active when the movement is applied
        let location = match movement.to.location.as_ref() {
            Some(location) => Some(
                self.locations
                    .resolve_locked(&mut *tx, location.location_ref())
                    .await?,
            ),
            None => None,
        };
        let assignment = Assignment::after_movement(
            equipment.current_assignment.as_ref(),
            movement.to.assignee.as_ref(),
            movement.expected_return_at,
            Utc::now(),
        );
        let equipment = self
            .repository
            .equipment
            .set_position(&mut *tx, equipment.id, location.as_ref(), assignment.as_ref())
            .await?;
        let movement = self
            .repository
            .movements
            .complete(&mut *tx, id, session.user_id())
            .await?;

        tx.commit().await?;

        tracing::info!("Movement {} approved by {}", id, session.user_id());
        self.feed.publish(InventoryEvent::EquipmentChanged { equipment_id: equipment.id });
        Ok(MovementOutcome { movement, equipment })
    }

    /// Refuse a pending movement; the equipment is left as it is
    pub async fn reject(&self, id: i32, data: &RejectMovement, session: &Session) -> AppResult<EquipmentMovement> {
        data.validate()?;
        let reason = data.reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("A rejection reason is required".to_string()));
        }

        let mut tx = self.repository.begin().await?;
        let movement = self.repository.movements.lock(&mut *tx, id).await?;
        movement.status.reject()?;
        let movement = self
            .repository
            .movements
            .reject(&mut *tx, id, reason, session.user_id())
            .await?;
        tx.commit().await?;

        tracing::info!("Movement {} rejected by {}: {}", id, session.user_id(), reason);
        Ok(movement)
    }
}
