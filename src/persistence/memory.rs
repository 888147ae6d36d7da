use super::{
    ScheduleQueries, ScheduleStore, ScheduleTransaction, StoreError, StoreResult, TransactionWork,
};
use crate::entry::{
    ClassId, ClassroomId, DayOfWeek, EntryId, ScheduleEntry, ScheduleFilter, ScheduleListing,
    ScheduleSlot, TeacherId, sort_listings,
};
use crate::error::{ConflictKind, ScheduleResult};
use crate::registry::{ClassOffering, ClassRegistry, Classroom, ClassroomRegistry, Teacher};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone)]
struct MemoryState {
    teachers: BTreeMap<TeacherId, Teacher>,
    classrooms: BTreeMap<ClassroomId, Classroom>,
    classes: BTreeMap<ClassId, ClassOffering>,
    entries: BTreeMap<EntryId, ScheduleEntry>,
    next_entry_id: EntryId,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            teachers: BTreeMap::new(),
            classrooms: BTreeMap::new(),
            classes: BTreeMap::new(),
            entries: BTreeMap::new(),
            next_entry_id: 1,
        }
    }
}

impl MemoryState {
    fn teacher_of(&self, class_id: ClassId) -> Option<TeacherId> {
        self.classes.get(&class_id).and_then(|class| class.teacher_id)
    }

    /// Mirrors the SQLite exclusion triggers: rejects a row that would
    /// overlap another row on the same room or the same teacher.
    fn check_exclusion(&self, slot: &ScheduleSlot, ignore: Option<EntryId>) -> StoreResult<()> {
        let teacher = self.teacher_of(slot.class_id);
        for entry in self.entries.values() {
            if Some(entry.id) == ignore || !slot.overlaps(entry) {
                continue;
            }
            if entry.classroom_id == slot.classroom_id {
                return Err(StoreError::Exclusion(ConflictKind::Classroom));
            }
            if teacher.is_some() && self.teacher_of(entry.class_id) == teacher {
                return Err(StoreError::Exclusion(ConflictKind::Teacher));
            }
        }
        Ok(())
    }

    fn check_references(&self, slot: &ScheduleSlot) -> StoreResult<()> {
        if !self.classes.contains_key(&slot.class_id) {
            return Err(StoreError::Constraint(format!(
                "class {} does not exist",
                slot.class_id
            )));
        }
        if !self.classrooms.contains_key(&slot.classroom_id) {
            return Err(StoreError::Constraint(format!(
                "classroom {} does not exist",
                slot.classroom_id
            )));
        }
        Ok(())
    }

    fn listing(&self, entry: &ScheduleEntry) -> StoreResult<ScheduleListing> {
        let class = self.classes.get(&entry.class_id).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "entry {} references missing class {}",
                entry.id, entry.class_id
            ))
        })?;
        let classroom = self.classrooms.get(&entry.classroom_id).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "entry {} references missing classroom {}",
                entry.id, entry.classroom_id
            ))
        })?;
        let teacher_name = class
            .teacher_id
            .and_then(|id| self.teachers.get(&id))
            .map(|teacher| teacher.name.clone());
        Ok(ScheduleListing {
            id: entry.id,
            class_id: entry.class_id,
            classroom_id: entry.classroom_id,
            day_of_week: entry.day_of_week,
            start_time: entry.start_time,
            end_time: entry.end_time,
            class_name: class.name.clone(),
            subject: class.subject.clone(),
            teacher_id: class.teacher_id,
            teacher_name,
            classroom_name: classroom.name.clone(),
        })
    }
}

impl ScheduleQueries for MemoryState {
    fn find_entry(&self, id: EntryId) -> StoreResult<Option<ScheduleEntry>> {
        Ok(self.entries.get(&id).copied())
    }

    fn entries_for_classroom(
        &self,
        classroom_id: ClassroomId,
        day_of_week: DayOfWeek,
    ) -> StoreResult<Vec<ScheduleEntry>> {
        Ok(self
            .entries
            .values()
            .filter(|entry| entry.classroom_id == classroom_id && entry.day_of_week == day_of_week)
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
            .values()
            .filter(|entry| {
                entry.day_of_week == day_of_week
                    && self.teacher_of(entry.class_id) == Some(teacher_id)
            })
            .copied()
            .collect())
    }
}

impl ClassRegistry for MemoryState {
    fn class_exists(&self, id: ClassId) -> StoreResult<bool> {
        Ok(self.classes.contains_key(&id))
    }

    fn teacher_for_class(&self, id: ClassId) -> StoreResult<Option<TeacherId>> {
        Ok(self.teacher_of(id))
    }
}

impl ClassroomRegistry for MemoryState {
    fn classroom_exists(&self, id: ClassroomId) -> StoreResult<bool> {
        Ok(self.classrooms.contains_key(&id))
    }
}

impl ScheduleTransaction for MemoryState {
    fn insert_entry(&mut self, slot: &ScheduleSlot) -> StoreResult<ScheduleEntry> {
        self.check_references(slot)?;
        self.check_exclusion(slot, None)?;
        let id = self.next_entry_id;
        self.next_entry_id += 1;
        let entry = ScheduleEntry::from_slot(id, slot);
        self.entries.insert(id, entry);
        Ok(entry)
    }

    fn replace_entry(
        &mut self,
        id: EntryId,
        slot: &ScheduleSlot,
    ) -> StoreResult<Option<ScheduleEntry>> {
        if !self.entries.contains_key(&id) {
            return Ok(None);
        }
        self.check_references(slot)?;
        self.check_exclusion(slot, Some(id))?;
        let entry = ScheduleEntry::from_slot(id, slot);
        self.entries.insert(id, entry);
        Ok(Some(entry))
    }
}

/// Process-local store. Each write works on a staged copy of the state under
/// the write lock and publishes it only when the work succeeds.
#[derive(Debug, Default)]
pub struct MemoryScheduleStore {
    state: RwLock<MemoryState>,
}

impl MemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_teacher(&self, teacher: &Teacher) -> StoreResult<()> {
        self.state.write().teachers.insert(teacher.id, teacher.clone());
        Ok(())
    }

    pub fn upsert_classroom(&self, classroom: &Classroom) -> StoreResult<()> {
        self.state
            .write()
            .classrooms
            .insert(classroom.id, classroom.clone());
        Ok(())
    }

    /// Rejects a teacher reassignment that would double-book the new teacher.
    pub fn upsert_class(&self, class: &ClassOffering) -> StoreResult<()> {
        let mut state = self.state.write();
        if let Some(teacher_id) = class.teacher_id {
            if !state.teachers.contains_key(&teacher_id) {
                return Err(StoreError::Constraint(format!(
                    "teacher {teacher_id} does not exist"
                )));
            }
            let own: Vec<ScheduleEntry> = state
                .entries
                .values()
                .filter(|entry| entry.class_id == class.id)
                .copied()
                .collect();
            // Entries of this class count too: a class without a teacher may
            // sit in two rooms at once, and gaining a teacher would double-book.
            let taken = own.iter().any(|mine| {
                state.entries.values().any(|other| {
                    other.id != mine.id
                        && (other.class_id == class.id
                            || state.teacher_of(other.class_id) == Some(teacher_id))
                        && mine.slot().overlaps(other)
                })
            });
            if taken {
                return Err(StoreError::Exclusion(ConflictKind::Teacher));
            }
        }
        state.classes.insert(class.id, class.clone());
        Ok(())
    }

    pub fn entry_count(&self) -> usize {
        self.state.read().entries.len()
    }
}

impl ScheduleStore for MemoryScheduleStore {
    fn write_atomically(&self, work: &mut TransactionWork<'_>) -> ScheduleResult<ScheduleEntry> {
        let mut state = self.state.write();
        let mut staged = state.clone();
        let tx: &mut dyn ScheduleTransaction = &mut staged;
        let entry = work(tx)?;
        *state = staged;
        debug!(entry_id = entry.id, "memory store committed entry");
        Ok(entry)
    }

    fn find_listing(&self, id: EntryId) -> StoreResult<Option<ScheduleListing>> {
        let state = self.state.read();
        state
            .entries
            .get(&id)
            .map(|entry| state.listing(entry))
            .transpose()
    }

    fn list_listings(&self, filter: &ScheduleFilter) -> StoreResult<Vec<ScheduleListing>> {
        let state = self.state.read();
        let mut listings = Vec::with_capacity(state.entries.len());
        for entry in state.entries.values() {
            let listing = state.listing(entry)?;
            if filter.matches(&listing) {
                listings.push(listing);
            }
        }
        sort_listings(&mut listings);
        Ok(listings)
    }

    fn delete_entry(&self, id: EntryId) -> StoreResult<bool> {
        Ok(self.state.write().entries.remove(&id).is_some())
    }
}
