use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::{
    ClassroomId, DayOfWeek, EntryId, ScheduleEntry, ScheduleError, ScheduleFilter,
    ScheduleListing, ScheduleRequest, ScheduleResult, ScheduleService, TeacherId,
};

#[derive(Clone)]
pub struct AppState {
    service: Arc<ScheduleService>,
}

impl AppState {
    pub fn new(service: ScheduleService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// Runs a service call on the blocking pool; store I/O never runs on an
    /// async worker thread.
    async fn run<T, F>(&self, call: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&ScheduleService) -> ScheduleResult<T> + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        tokio::task::spawn_blocking(move || call(&service))
            .await
            .map_err(|err| ApiError::internal(format!("service task failed: {err}")))?
            .map_err(ApiError::from)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource: Option<&'a str>,
}

#[derive(Debug)]
enum ApiError {
    NotFound {
        resource: &'static str,
        message: String,
    },
    Conflict {
        resource: &'static str,
        message: String,
    },
    Invalid(String),
    Unavailable(String),
    Internal(String),
}

impl ApiError {
    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<ScheduleError> for ApiError {
    fn from(value: ScheduleError) -> Self {
        let message = value.to_string();
        match value {
            ScheduleError::Validation(_) => ApiError::Invalid(message),
            ScheduleError::NotFound(resource) => ApiError::NotFound {
                resource: resource.as_str(),
                message,
            },
            ScheduleError::Conflict { kind, .. } => ApiError::Conflict {
                resource: kind.as_str(),
                message,
            },
            ScheduleError::Store(err) if err.is_transient() => ApiError::Unavailable(message),
            ScheduleError::Store(_) => ApiError::Internal(message),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::invalid(value.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(value: PathRejection) -> Self {
        ApiError::invalid(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        ApiError::invalid(value.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message, resource) = match self {
            ApiError::NotFound { resource, message } => {
                (StatusCode::NOT_FOUND, "not_found", message, Some(resource))
            }
            ApiError::Conflict { resource, message } => {
                (StatusCode::CONFLICT, "conflict", message, Some(resource))
            }
            ApiError::Invalid(message) => {
                (StatusCode::BAD_REQUEST, "invalid_request", message, None)
            }
            ApiError::Unavailable(message) => {
                (StatusCode::SERVICE_UNAVAILABLE, "unavailable", message, None)
            }
            ApiError::Internal(message) => {
                error!(%message, "internal error while handling request");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message, None)
            }
        };
        let body = Json(ErrorBody {
            error,
            message,
            resource,
        });
        (status, body).into_response()
    }
}

/// Query string of `GET /schedules`. The day stays a raw integer so an
/// out-of-range value gets the same `invalid_request` body as a bad payload.
#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    classroom_id: Option<ClassroomId>,
    teacher_id: Option<TeacherId>,
    day_of_week: Option<i64>,
}

impl ListQuery {
    fn into_filter(self) -> Result<ScheduleFilter, ApiError> {
        let day_of_week = self
            .day_of_week
            .map(DayOfWeek::new)
            .transpose()
            .map_err(|err| ApiError::invalid(err.to_string()))?;
        Ok(ScheduleFilter {
            classroom_id: self.classroom_id,
            teacher_id: self.teacher_id,
            day_of_week,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/schedules", get(list_schedules).post(create_schedule))
        .route(
            "/schedules/:id",
            get(get_schedule).put(update_schedule).delete(delete_schedule),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve<F>(addr: SocketAddr, service: ScheduleService, shutdown: F) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = router(AppState::new(service));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "timetable HTTP API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_schedules(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<ScheduleListing>>, ApiError> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    let listings = state
        .run(move |service| service.list_filtered(&filter))
        .await?;
    Ok(Json(listings))
}

async fn get_schedule(
    State(state): State<AppState>,
    path: Result<Path<EntryId>, PathRejection>,
) -> Result<Json<ScheduleListing>, ApiError> {
    let Path(entry_id) = path?;
    let found = state.run(move |service| service.get(entry_id)).await?;
    match found {
        Some(listing) => Ok(Json(listing)),
        None => Err(ApiError::NotFound {
            resource: "schedule",
            message: format!("schedule {entry_id} not found"),
        }),
    }
}

async fn create_schedule(
    State(state): State<AppState>,
    payload: Result<Json<ScheduleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ScheduleEntry>), ApiError> {
    let Json(request) = payload?;
    let created = state.run(move |service| service.create(&request)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_schedule(
    State(state): State<AppState>,
    path: Result<Path<EntryId>, PathRejection>,
    payload: Result<Json<ScheduleRequest>, JsonRejection>,
) -> Result<Json<ScheduleEntry>, ApiError> {
    let Path(entry_id) = path?;
    let Json(request) = payload?;
    let updated = state
        .run(move |service| service.update(entry_id, &request))
        .await?;
    Ok(Json(updated))
}

async fn delete_schedule(
    State(state): State<AppState>,
    path: Result<Path<EntryId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(entry_id) = path?;
    let removed = state.run(move |service| service.delete(entry_id)).await?;
    if !removed {
        return Err(ApiError::NotFound {
            resource: "schedule",
            message: format!("schedule {entry_id} not found"),
        });
    }
    Ok(StatusCode::NO_CONTENT)
}
