//! In-process change feed backing the realtime subscriptions

use serde::Serialize;
use tokio::sync::broadcast;
use utoipa::ToSchema;

/// Something subscribers may want to re-read
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InventoryEvent {
    EquipmentChanged { equipment_id: i32 },
    /// A location was renamed and equipment snapshots were rewritten
    LocationsChanged,
    SettingsChanged,
    ApprovalRequested { movement_id: i32, equipment_id: i32 },
    LowStock {
        equipment_id: i32,
        reference: String,
        name: String,
        quantity: i32,
        min_quantity: i32,
    },
}

impl InventoryEvent {
    /// Events after which equipment lists must be re-read
    pub fn affects_equipment(&self) -> bool {
        matches!(
            self,
            InventoryEvent::EquipmentChanged { .. } | InventoryEvent::LocationsChanged
        )
    }

    /// Events forwarded to the notifications stream
    pub fn is_notification(&self) -> bool {
        matches!(
            self,
            InventoryEvent::ApprovalRequested { .. } | InventoryEvent::LowStock { .. }
        )
    }
}

#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<InventoryEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to current subscribers; nobody listening is fine
    pub fn publish(&self, event: InventoryEvent) {
        tracing::debug!("Change feed: {:?}", event);
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InventoryEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let feed = ChangeFeed::new(8);
        let mut rx = feed.subscribe();
        feed.publish(InventoryEvent::EquipmentChanged { equipment_id: 4 });
        assert_eq!(
            rx.recv().await.unwrap(),
            InventoryEvent::EquipmentChanged { equipment_id: 4 }
        );
    }

    #[test]
    fn test_publish_without_subscribers() {
        ChangeFeed::new(1).publish(InventoryEvent::SettingsChanged);
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(InventoryEvent::ApprovalRequested {
            movement_id: 1,
            equipment_id: 2,
        })
        .unwrap();
        assert_eq!(json["type"], "approval_requested");
        assert_eq!(json["movement_id"], 1);
        assert!(!InventoryEvent::SettingsChanged.is_notification());
        assert!(InventoryEvent::LocationsChanged.affects_equipment());
        assert!(!InventoryEvent::SettingsChanged.affects_equipment());
    }
}
