//! Error kinds returned by the timetable service.

use crate::entry::{ClassId, ClassroomId, EntryId};
use crate::persistence::StoreError;
use chrono::NaiveTime;
use std::fmt;
use thiserror::Error;

pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// A request that cannot describe a legal weekly slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("start time {start} must be before end time {end}")]
    InvalidTimeRange { start: NaiveTime, end: NaiveTime },
    #[error("day of week {0} is outside 0..=6")]
    InvalidDay(i64),
}

/// The record a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Class(ClassId),
    Classroom(ClassroomId),
    Schedule(EntryId),
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Class(_) => "class",
            Resource::Classroom(_) => "classroom",
            Resource::Schedule(_) => "schedule",
        }
    }

    pub fn id(&self) -> i64 {
        match *self {
            Resource::Class(id) | Resource::Classroom(id) | Resource::Schedule(id) => id,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_str(), self.id())
    }
}

/// Which shared resource is already booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    Classroom,
    Teacher,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::Classroom => "classroom",
            ConflictKind::Teacher => "teacher",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0} not found")]
    NotFound(Resource),
    /// `blocking_entry` is known when the application check caught it; a
    /// store-level exclusion abort does not name the row.
    #[error("{}", conflict_message(.kind, .blocking_entry))]
    Conflict {
        kind: ConflictKind,
        blocking_entry: Option<EntryId>,
    },
    #[error(transparent)]
    Store(StoreError),
}

fn conflict_message(kind: &ConflictKind, blocking_entry: &Option<EntryId>) -> String {
    match blocking_entry {
        Some(id) => format!("{kind} is already booked by schedule entry {id}"),
        None => format!("{kind} is already booked at that time"),
    }
}

impl ScheduleError {
    pub fn conflict(kind: ConflictKind, blocking_entry: EntryId) -> Self {
        ScheduleError::Conflict {
            kind,
            blocking_entry: Some(blocking_entry),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ScheduleError::Conflict { .. })
    }
}

impl From<StoreError> for ScheduleError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Exclusion(kind) => ScheduleError::Conflict {
                kind,
                blocking_entry: None,
            },
            other => ScheduleError::Store(other),
        }
    }
}
