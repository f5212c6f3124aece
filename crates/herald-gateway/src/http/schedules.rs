//! Schedule CRUD routes — the HTTP front end over the entry store.
//!
//! Date-times cross this boundary as `YYYY-MM-DD HH:MM` strings in the
//! canonical timezone; storage and comparison stay in UTC.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use herald_core::time;
use herald_scheduler::{EntryPatch, NewEntry, Recurrence, ScheduledEntry, SchedulerError};

use crate::app::AppState;

#[derive(Deserialize)]
pub struct CreateScheduleRequest {
    pub content: String,
    /// `YYYY-MM-DD HH:MM` in the canonical timezone.
    pub scheduled_at: String,
    pub channel_id: String,
    /// once|oneshot|daily|monthly|yearly|custom
    pub recurrence: String,
    #[serde(default)]
    pub custom_minutes: Option<u32>,
}

#[derive(Deserialize, Default)]
pub struct UpdateScheduleRequest {
    pub content: Option<String>,
    pub scheduled_at: Option<String>,
    pub channel_id: Option<String>,
    pub recurrence: Option<String>,
    #[serde(default)]
    pub custom_minutes: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CreateScheduleResponse {
    pub id: String,
}

/// User-facing rendering of an entry; `scheduled_at` is in the canonical zone.
#[derive(Debug, Serialize)]
pub struct EntryView {
    pub id: String,
    pub content: String,
    pub scheduled_at: String,
    pub channel_id: String,
    pub recurrence: String,
    pub custom_minutes: u32,
    pub created_by: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn render(entry: ScheduledEntry, tz: chrono_tz::Tz) -> EntryView {
    EntryView {
        id: entry.id,
        content: entry.content,
        scheduled_at: time::render_local(entry.due_at, tz),
        channel_id: entry.channel_id,
        recurrence: entry.recurrence.kind().to_string(),
        custom_minutes: entry.recurrence.custom_minutes(),
        created_by: entry.created_by,
    }
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

fn map_err(err: SchedulerError) -> ApiError {
    match err {
        SchedulerError::Validation(msg) | SchedulerError::InvalidRecurrence(msg) => {
            bad_request(msg)
        }
        SchedulerError::NotFound { id } => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: format!("No scheduled message with ID \"{id}\"."),
            }),
        ),
        SchedulerError::Database(e) => {
            error!("store operation failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "An internal error occurred while accessing the store.".to_string(),
                }),
            )
        }
    }
}

/// POST /schedules
pub async fn create_schedule(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<CreateScheduleResponse>), ApiError> {
    let due_at = time::parse_local(&req.scheduled_at, state.tz).ok_or_else(|| {
        bad_request("Invalid date or time format. Please use the format: YYYY-MM-DD HH:MM.")
    })?;
    let recurrence =
        Recurrence::from_parts(&req.recurrence, req.custom_minutes.unwrap_or(0)).map_err(map_err)?;

    let entry = state
        .store
        .insert(NewEntry {
            due_at,
            content: req.content,
            channel_id: req.channel_id,
            recurrence,
            created_by: "API".to_string(),
        })
        .map_err(map_err)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateScheduleResponse { id: entry.id }),
    ))
}

/// GET /schedules
pub async fn list_schedules(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<EntryView>>, ApiError> {
    let entries = state.store.list_all().map_err(map_err)?;
    Ok(Json(
        entries.into_iter().map(|e| render(e, state.tz)).collect(),
    ))
}

/// GET /schedules/{id}
pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EntryView>, ApiError> {
    let entry = state.store.get(&id).map_err(map_err)?;
    Ok(Json(render(entry, state.tz)))
}

/// PATCH /schedules/{id}
pub async fn update_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateScheduleRequest>,
) -> Result<Json<EntryView>, ApiError> {
    let due_at = match req.scheduled_at.as_deref() {
        Some(s) => Some(time::parse_local(s, state.tz).ok_or_else(|| {
            bad_request("Invalid date or time format. Please use the format: YYYY-MM-DD HH:MM.")
        })?),
        None => None,
    };
    let recurrence = match req.recurrence.as_deref() {
        Some(kind) => {
            Some(Recurrence::from_parts(kind, req.custom_minutes.unwrap_or(0)).map_err(map_err)?)
        }
        None if req.custom_minutes.is_some() => {
            return Err(bad_request(
                "custom_minutes can only be set together with recurrence = custom",
            ));
        }
        None => None,
    };

    let entry = state
        .store
        .update(
            &id,
            EntryPatch {
                due_at,
                content: req.content,
                channel_id: req.channel_id,
                recurrence,
            },
        )
        .map_err(map_err)?;
    Ok(Json(render(entry, state.tz)))
}

/// DELETE /schedules/{id}
pub async fn delete_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EntryView>, ApiError> {
    let entry = state.store.delete(&id).map_err(map_err)?;
    Ok(Json(render(entry, state.tz)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::HeraldConfig;
    use herald_scheduler::EntryStore;

    fn state() -> Arc<AppState> {
        let config = HeraldConfig::default();
        let tz = config.canonical_tz().unwrap();
        let store = EntryStore::new(rusqlite::Connection::open_in_memory().unwrap()).unwrap();
        Arc::new(AppState::new(config, store, tz))
    }

    fn create_req(scheduled_at: &str, recurrence: &str, minutes: Option<u32>) -> CreateScheduleRequest {
        CreateScheduleRequest {
            content: "standup in five".to_string(),
            scheduled_at: scheduled_at.to_string(),
            channel_id: "general".to_string(),
            recurrence: recurrence.to_string(),
            custom_minutes: minutes,
        }
    }

    #[tokio::test]
    async fn create_returns_201_and_the_entry_is_listed() {
        let state = state();
        let (status, Json(created)) = create_schedule(
            State(state.clone()),
            Json(create_req("2024-06-01 09:00", "daily", None)),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let Json(views) = list_schedules(State(state.clone())).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].id, created.id);
        // Round-trip: the local input time renders back unchanged.
        assert_eq!(views[0].scheduled_at, "2024-06-01 09:00");
        assert_eq!(views[0].recurrence, "daily");
        assert_eq!(views[0].created_by, "API");
    }

    #[tokio::test]
    async fn create_with_bad_datetime_is_a_400_with_corrective_body() {
        let state = state();
        let (status, Json(body)) = create_schedule(
            State(state),
            Json(create_req("tomorrow morning", "daily", None)),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("YYYY-MM-DD HH:MM"));
    }

    #[tokio::test]
    async fn create_custom_without_minutes_is_a_400() {
        let state = state();
        let (status, Json(body)) = create_schedule(
            State(state.clone()),
            Json(create_req("2024-06-01 09:00", "custom", None)),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("positive number of minutes"));

        let Json(views) = list_schedules(State(state)).await.unwrap();
        assert!(views.is_empty());
    }

    #[tokio::test]
    async fn get_unknown_id_is_a_404() {
        let state = state();
        let (status, Json(body)) = get_schedule(State(state), Path("no-such-id".to_string()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.error.contains("no-such-id"));
    }

    #[tokio::test]
    async fn delete_round_trips_and_unknown_id_is_a_404() {
        let state = state();
        let (_, Json(created)) = create_schedule(
            State(state.clone()),
            Json(create_req("2024-06-01 09:00", "once", None)),
        )
        .await
        .unwrap();

        let Json(deleted) = delete_schedule(State(state.clone()), Path(created.id.clone()))
            .await
            .unwrap();
        assert_eq!(deleted.id, created.id);
        assert_eq!(deleted.content, "standup in five");

        let (status, _) = delete_schedule(State(state), Path(created.id))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn patch_updates_the_due_time() {
        let state = state();
        let (_, Json(created)) = create_schedule(
            State(state.clone()),
            Json(create_req("2024-06-01 09:00", "daily", None)),
        )
        .await
        .unwrap();

        let Json(updated) = update_schedule(
            State(state),
            Path(created.id),
            Json(UpdateScheduleRequest {
                scheduled_at: Some("2024-07-01 10:30".to_string()),
                ..UpdateScheduleRequest::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.scheduled_at, "2024-07-01 10:30");
        assert_eq!(updated.content, "standup in five");
    }

    #[tokio::test]
    async fn patch_minutes_without_recurrence_is_a_400() {
        let state = state();
        let (_, Json(created)) = create_schedule(
            State(state.clone()),
            Json(create_req("2024-06-01 09:00", "daily", None)),
        )
        .await
        .unwrap();

        let (status, Json(body)) = update_schedule(
            State(state),
            Path(created.id),
            Json(UpdateScheduleRequest {
                custom_minutes: Some(30),
                ..UpdateScheduleRequest::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("recurrence"));
    }
}
