use crate::entry::{ClassId, ClassroomId, ScheduleSlot};
use crate::error::{Resource, ScheduleError, ScheduleResult};
use crate::persistence::StoreResult;
use crate::registry::{ClassRegistry, ClassroomRegistry};

/// Confirms that the class and classroom a slot points at exist.
///
/// A dangling reference is reported as [`ScheduleError::NotFound`], never as a
/// conflict, so callers can tell "nothing to book" from "already booked".
pub struct ReferenceValidator<'a, R: ?Sized> {
    registry: &'a R,
}

impl<'a, R> ReferenceValidator<'a, R>
where
    R: ClassRegistry + ClassroomRegistry + ?Sized,
{
    pub fn new(registry: &'a R) -> Self {
        Self { registry }
    }

    pub fn class_exists(&self, id: ClassId) -> StoreResult<bool> {
        self.registry.class_exists(id)
    }

    pub fn classroom_exists(&self, id: ClassroomId) -> StoreResult<bool> {
        self.registry.classroom_exists(id)
    }

    /// Class first, then classroom.
    pub fn ensure_references(&self, slot: &ScheduleSlot) -> ScheduleResult<()> {
        if !self.class_exists(slot.class_id)? {
            return Err(ScheduleError::NotFound(Resource::Class(slot.class_id)));
        }
        if !self.classroom_exists(slot.classroom_id)? {
            return Err(ScheduleError::NotFound(Resource::Classroom(
                slot.classroom_id,
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{DayOfWeek, TeacherId};
    use chrono::NaiveTime;
    use std::collections::HashSet;

    struct Registry {
        classes: HashSet<ClassId>,
        classrooms: HashSet<ClassroomId>,
    }

    impl ClassRegistry for Registry {
        fn class_exists(&self, id: ClassId) -> StoreResult<bool> {
            Ok(self.classes.contains(&id))
        }

        fn teacher_for_class(&self, _id: ClassId) -> StoreResult<Option<TeacherId>> {
            Ok(None)
        }
    }

    impl ClassroomRegistry for Registry {
        fn classroom_exists(&self, id: ClassroomId) -> StoreResult<bool> {
            Ok(self.classrooms.contains(&id))
        }
    }

    fn slot(class_id: ClassId, classroom_id: ClassroomId) -> ScheduleSlot {
        ScheduleSlot {
            class_id,
            classroom_id,
            day_of_week: DayOfWeek::MONDAY,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        }
    }

    fn registry() -> Registry {
        Registry {
            classes: HashSet::from([1]),
            classrooms: HashSet::from([10]),
        }
    }

    #[test]
    fn missing_class_is_reported_before_missing_classroom() {
        let registry = registry();
        let validator = ReferenceValidator::new(&registry);
        let err = validator.ensure_references(&slot(2, 11)).unwrap_err();
        assert!(matches!(err, ScheduleError::NotFound(Resource::Class(2))));
    }

    #[test]
    fn missing_classroom_is_not_found() {
        let registry = registry();
        let validator = ReferenceValidator::new(&registry);
        let err = validator.ensure_references(&slot(1, 11)).unwrap_err();
        assert!(matches!(err, ScheduleError::NotFound(Resource::Classroom(11))));
    }

    #[test]
    fn known_references_pass() {
        let registry = registry();
        assert!(ReferenceValidator::new(&registry)
            .ensure_references(&slot(1, 10))
            .is_ok());
    }
}
