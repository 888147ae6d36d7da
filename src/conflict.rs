//! Classroom and teacher double-booking checks.

use crate::entry::{EntryId, ScheduleEntry, ScheduleSlot};
use crate::persistence::{ScheduleQueries, StoreResult};
use crate::registry::ClassRegistry;

/// Answers whether a candidate slot collides with an existing booking of the
/// same classroom or the same teacher.
///
/// `exclude` names the entry being edited; that entry never conflicts with
/// its own replacement. Passing `None` applies no exclusion.
pub struct ConflictDetector<'a, Q: ?Sized> {
    store: &'a Q,
}

impl<'a, Q> ConflictDetector<'a, Q>
where
    Q: ScheduleQueries + ClassRegistry + ?Sized,
{
    pub fn new(store: &'a Q) -> Self {
        Self { store }
    }

    pub fn has_classroom_conflict(
        &self,
        slot: &ScheduleSlot,
        exclude: Option<EntryId>,
    ) -> StoreResult<bool> {
        Ok(self.classroom_conflict(slot, exclude)?.is_some())
    }

    pub fn has_teacher_conflict(
        &self,
        slot: &ScheduleSlot,
        exclude: Option<EntryId>,
    ) -> StoreResult<bool> {
        Ok(self.teacher_conflict(slot, exclude)?.is_some())
    }

    /// First entry in the same room and day whose window overlaps `slot`.
    pub fn classroom_conflict(
        &self,
        slot: &ScheduleSlot,
        exclude: Option<EntryId>,
    ) -> StoreResult<Option<ScheduleEntry>> {
        let booked = self
            .store
            .entries_for_classroom(slot.classroom_id, slot.day_of_week)?;
        Ok(first_overlap(booked, slot, exclude))
    }

    /// First entry taught by the slot's teacher on the same day whose window
    /// overlaps `slot`. A class with no teacher cannot clash on this axis.
    pub fn teacher_conflict(
        &self,
        slot: &ScheduleSlot,
        exclude: Option<EntryId>,
    ) -> StoreResult<Option<ScheduleEntry>> {
        let Some(teacher_id) = self.store.teacher_for_class(slot.class_id)? else {
            return Ok(None);
        };
        let booked = self
            .store
            .entries_for_teacher(teacher_id, slot.day_of_week)?;
        Ok(first_overlap(booked, slot, exclude))
    }
}

fn first_overlap(
    booked: Vec<ScheduleEntry>,
    slot: &ScheduleSlot,
    exclude: Option<EntryId>,
) -> Option<ScheduleEntry> {
    booked
        .into_iter()
        .filter(|entry| Some(entry.id) != exclude)
        .find(|entry| slot.overlaps(entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{ClassId, ClassroomId, DayOfWeek, TeacherId};
    use chrono::NaiveTime;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Fixture {
        entries: Vec<ScheduleEntry>,
        teachers: HashMap<ClassId, TeacherId>,
    }

    impl ScheduleQueries for Fixture {
        fn find_entry(&self, id: EntryId) -> StoreResult<Option<ScheduleEntry>> {
            Ok(self.entries.iter().find(|e| e.id == id).copied())
        }

        fn entries_for_classroom(
            &self,
            classroom_id: ClassroomId,
            day_of_week: DayOfWeek,
        ) -> StoreResult<Vec<ScheduleEntry>> {
            Ok(self
                .entries
                .iter()
                .filter(|e| e.classroom_id == classroom_id && e.day_of_week == day_of_week)
                .copied()
                .collect())
        }

        fn entries_for_teacher(
            &self,
            teacher_id: TeacherId,
            day_of_week: DayOfWeek,
        ) -> StoreResult<Vec<ScheduleEntry>> {
            Ok(self
                .entries
                .iter()
                .filter(|e| {
                    e.day_of_week == day_of_week
                        && self.teachers.get(&e.class_id) == Some(&teacher_id)
                })
                .copied()
                .collect())
        }
    }

    impl ClassRegistry for Fixture {
        fn class_exists(&self, id: ClassId) -> StoreResult<bool> {
            Ok(self.teachers.contains_key(&id))
        }

        fn teacher_for_class(&self, id: ClassId) -> StoreResult<Option<TeacherId>> {
            Ok(self.teachers.get(&id).copied())
        }
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn slot(class_id: ClassId, classroom_id: ClassroomId, start: NaiveTime, end: NaiveTime) -> ScheduleSlot {
        ScheduleSlot {
            class_id,
            classroom_id,
            day_of_week: DayOfWeek::MONDAY,
            start_time: start,
            end_time: end,
        }
    }

    fn fixture() -> Fixture {
        let mut fixture = Fixture::default();
        fixture.teachers.insert(100, 1);
        fixture.teachers.insert(200, 1);
        fixture.entries.push(ScheduleEntry::from_slot(
            1,
            &slot(100, 2, t(9, 0), t(10, 0)),
        ));
        fixture
    }

    #[test]
    fn overlapping_slot_in_same_room_conflicts() {
        let fixture = fixture();
        let detector = ConflictDetector::new(&fixture);
        let found = detector
            .classroom_conflict(&slot(300, 2, t(9, 30), t(10, 30)), None)
            .unwrap();
        assert_eq!(found.map(|e| e.id), Some(1));
    }

    #[test]
    fn other_day_in_same_room_is_free() {
        let fixture = fixture();
        let detector = ConflictDetector::new(&fixture);
        let mut candidate = slot(300, 2, t(9, 0), t(10, 0));
        candidate.day_of_week = DayOfWeek::TUESDAY;
        assert!(!detector.has_classroom_conflict(&candidate, None).unwrap());
    }

    #[test]
    fn shared_teacher_conflicts_across_rooms() {
        let fixture = fixture();
        let detector = ConflictDetector::new(&fixture);
        let candidate = slot(200, 3, t(9, 30), t(10, 0));
        assert!(!detector.has_classroom_conflict(&candidate, None).unwrap());
        assert!(detector.has_teacher_conflict(&candidate, None).unwrap());
    }

    #[test]
    fn class_without_teacher_never_has_teacher_conflict() {
        let fixture = fixture();
        let detector = ConflictDetector::new(&fixture);
        let candidate = slot(300, 3, t(9, 0), t(10, 0));
        assert!(!detector.has_teacher_conflict(&candidate, None).unwrap());
    }

    #[test]
    fn excluded_entry_does_not_conflict_with_itself() {
        let fixture = fixture();
        let detector = ConflictDetector::new(&fixture);
        let same = slot(100, 2, t(9, 0), t(10, 0));
        assert!(detector.has_classroom_conflict(&same, None).unwrap());
        assert!(!detector.has_classroom_conflict(&same, Some(1)).unwrap());
        assert!(!detector.has_teacher_conflict(&same, Some(1)).unwrap());
    }
}
