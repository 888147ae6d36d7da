//! Records owned by the class, classroom and staff collaborators.
//!
//! The timetable reads these but never decides their lifecycle. Stores carry
//! a copy so that existence checks and teacher resolution can run inside the
//! same transaction as the schedule write.

use crate::entry::{ClassId, ClassroomId, TeacherId};
use crate::persistence::StoreResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
}

impl Teacher {
    pub fn new(id: TeacherId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classroom {
    pub id: ClassroomId,
    pub name: String,
    pub building: String,
    /// Seating capacity. Informational; the timetable does not enforce it.
    pub capacity: u32,
}

impl Classroom {
    pub fn new(
        id: ClassroomId,
        name: impl Into<String>,
        building: impl Into<String>,
        capacity: u32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            building: building.into(),
            capacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassOffering {
    pub id: ClassId,
    pub name: String,
    pub subject: String,
    pub grade_level: String,
    /// The teacher who delivers every scheduled session of this class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<TeacherId>,
}

impl ClassOffering {
    pub fn new(
        id: ClassId,
        name: impl Into<String>,
        subject: impl Into<String>,
        grade_level: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            subject: subject.into(),
            grade_level: grade_level.into(),
            teacher_id: None,
        }
    }

    pub fn taught_by(mut self, teacher_id: TeacherId) -> Self {
        self.teacher_id = Some(teacher_id);
        self
    }
}

/// Read-only view of the class-management collaborator.
pub trait ClassRegistry {
    fn class_exists(&self, id: ClassId) -> StoreResult<bool>;
    /// `Ok(None)` both for a class without a teacher and for an unknown class.
    fn teacher_for_class(&self, id: ClassId) -> StoreResult<Option<TeacherId>>;
}

/// Read-only view of the classroom-management collaborator.
pub trait ClassroomRegistry {
    fn classroom_exists(&self, id: ClassroomId) -> StoreResult<bool>;
}
