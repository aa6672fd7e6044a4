//! Realtime subscriptions over Server-Sent Events
//!
//! Equipment and settings streams send a full snapshot when the client
//! connects and again after every relevant change. The notifications stream
//! forwards low-stock and approval-requested events as they happen.

use std::{convert::Infallible, future::Future};

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use axum_extra::extract::Query;
use serde::Serialize;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    error::AppResult,
    models::equipment::EquipmentFilters,
    services::events::InventoryEvent,
    AppState,
};

use super::AuthenticatedUser;

type EventStream = Sse<ReceiverStream<Result<Event, Infallible>>>;

fn json_event<T: Serialize>(name: &str, value: &T) -> Option<Event> {
    match Event::default().event(name).json_data(value) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::error!("Could not encode {} event: {}", name, e);
            None
        }
    }
}

/// Push a fresh snapshot now and after every event accepted by `interested`.
///
/// The feed is subscribed before the first load so no change between the
/// two is missed. A lagging subscriber reloads instead of replaying.
fn snapshot_stream<T, F, Fut>(
    state: &AppState,
    name: &'static str,
    interested: fn(&InventoryEvent) -> bool,
    load: F,
) -> EventStream
where
    T: Serialize + Send + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = AppResult<T>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(8);
    let mut changes = state.services.feed.subscribe();

    tokio::spawn(async move {
        loop {
            let event = match load().await {
                Ok(snapshot) => json_event(name, &snapshot),
                Err(e) => {
                    tracing::warn!("Could not load {} snapshot: {}", name, e);
                    json_event("error", &e.to_string())
                }
            };
            if let Some(event) = event {
                if tx.send(Ok(event)).await.is_err() {
                    break;
                }
            }

            // Wait for the next relevant change or the client leaving
            let reload = loop {
                let change = tokio::select! {
                    _ = tx.closed() => break false,
                    change = changes.recv() => change,
                };
                match change {
                    Ok(change) if interested(&change) => break true,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!("{} subscriber lagged by {} events", name, skipped);
                        break true;
                    }
                    Err(RecvError::Closed) => break false,
                }
            };
            if !reload {
                break;
            }
        }
        tracing::debug!("{} subscription closed", name);
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default())
}

/// Stream the filtered equipment list
#[utoipa::path(
    get,
    path = "/equipment/subscribe",
    tag = "subscriptions",
    security(("bearer_auth" = [])),
    params(EquipmentFilters),
    responses(
        (status = 200, description = "`equipment` events carrying the full filtered list", content_type = "text/event-stream")
    )
)]
pub async fn subscribe_equipment(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Query(filters): Query<EquipmentFilters>,
) -> EventStream {
    tracing::debug!("{} subscribed to equipment", session.user_id());
    let services = state.services.clone();
    snapshot_stream(&state, "equipment", InventoryEvent::affects_equipment, move || {
        let services = services.clone();
        let filters = filters.clone();
        async move { services.equipment.list(&filters).await }
    })
}

/// Stream the settings
#[utoipa::path(
    get,
    path = "/settings/subscribe",
    tag = "subscriptions",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "`settings` events carrying the full settings", content_type = "text/event-stream")
    )
)]
pub async fn subscribe_settings(
    State(state): State<AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
) -> EventStream {
    let services = state.services.clone();
    snapshot_stream(
        &state,
        "settings",
        |event| matches!(event, InventoryEvent::SettingsChanged),
        move || {
            let services = services.clone();
            async move { services.settings.get_settings().await }
        },
    )
}

/// Stream low-stock and approval notifications
#[utoipa::path(
    get,
    path = "/notifications/subscribe",
    tag = "subscriptions",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "`notification` events", body = InventoryEvent, content_type = "text/event-stream")
    )
)]
pub async fn subscribe_notifications(
    State(state): State<AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
) -> EventStream {
    let (tx, rx) = mpsc::channel(16);
    let mut changes = state.services.feed.subscribe();

    tokio::spawn(async move {
        loop {
            let change = tokio::select! {
                _ = tx.closed() => break,
                change = changes.recv() => change,
            };
            match change {
                Ok(change) if change.is_notification() => {
                    if let Some(event) = json_event("notification", &change) {
                        if tx.send(Ok(event)).await.is_err() {
                            break;
                        }
                    }
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Notification subscriber missed {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default())
}
