//! The write path for weekly schedule entries.
//!
//! A create or update moves through
//! `Validating -> CheckingConflicts -> Writing -> Done`, or stops in
//! `Rejected`. Reference checks, conflict checks and the write all run inside
//! one [`ScheduleStore::write_atomically`] call, so two callers racing for the
//! same room or teacher cannot both pass their checks and both commit.

use crate::conflict::ConflictDetector;
use crate::entry::{EntryId, ScheduleEntry, ScheduleFilter, ScheduleListing, ScheduleRequest, ScheduleSlot};
use crate::entry_validation::validate_request;
use crate::error::{ConflictKind, Resource, ScheduleError, ScheduleResult};
use crate::persistence::{ScheduleStore, ScheduleTransaction};
use crate::reference::ReferenceValidator;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Validating,
    CheckingConflicts,
    Writing,
    Done,
    Rejected,
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestPhase::Validating => "validating",
            RequestPhase::CheckingConflicts => "checking_conflicts",
            RequestPhase::Writing => "writing",
            RequestPhase::Done => "done",
            RequestPhase::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

#[derive(Clone)]
pub struct ScheduleService {
    store: Arc<dyn ScheduleStore>,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ScheduleStore> {
        &self.store
    }

    pub fn create(&self, request: &ScheduleRequest) -> ScheduleResult<ScheduleEntry> {
        debug!(phase = %RequestPhase::Validating, ?request, "create schedule entry");
        let slot = validate_request(request).map_err(|err| reject("create", None, err.into()))?;

        let result = self.store.write_atomically(&mut |tx: &mut dyn ScheduleTransaction| {
            admit(&*tx, &slot, None)?;
            debug!(phase = %RequestPhase::Writing, "inserting schedule entry");
            Ok(tx.insert_entry(&slot)?)
        });
        finish("create", None, result)
    }

    /// Replaces every field of entry `id`. The entry is excluded from its own
    /// conflict checks, so resubmitting its current fields always succeeds.
    pub fn update(&self, id: EntryId, request: &ScheduleRequest) -> ScheduleResult<ScheduleEntry> {
        debug!(phase = %RequestPhase::Validating, entry_id = id, ?request, "update schedule entry");
        let result = self.store.write_atomically(&mut |tx: &mut dyn ScheduleTransaction| {
            if tx.find_entry(id)?.is_none() {
                return Err(ScheduleError::NotFound(Resource::Schedule(id)));
            }
            let slot = validate_request(request)?;
            admit(&*tx, &slot, Some(id))?;
            debug!(phase = %RequestPhase::Writing, entry_id = id, "replacing schedule entry");
            tx.replace_entry(id, &slot)?
                .ok_or(ScheduleError::NotFound(Resource::Schedule(id)))
        });
        finish("update", Some(id), result)
    }

    /// Returns whether an entry was removed. An unknown id is not an error.
    pub fn delete(&self, id: EntryId) -> ScheduleResult<bool> {
        let removed = self.store.delete_entry(id).map_err(|err| {
            error!(entry_id = id, error = %err, "deleting schedule entry failed");
            ScheduleError::from(err)
        })?;
        if removed {
            info!(entry_id = id, "deleted schedule entry");
        } else {
            debug!(entry_id = id, "delete of unknown schedule entry");
        }
        Ok(removed)
    }

    pub fn get(&self, id: EntryId) -> ScheduleResult<Option<ScheduleListing>> {
        Ok(self.store.find_listing(id)?)
    }

    pub fn list(&self) -> ScheduleResult<Vec<ScheduleListing>> {
        self.list_filtered(&ScheduleFilter::default())
    }

    pub fn list_filtered(&self, filter: &ScheduleFilter) -> ScheduleResult<Vec<ScheduleListing>> {
        Ok(self.store.list_listings(filter)?)
    }
}

/// Reference checks, then the classroom check, then the teacher check.
fn admit(
    tx: &dyn ScheduleTransaction,
    slot: &ScheduleSlot,
    exclude: Option<EntryId>,
) -> ScheduleResult<()> {
    ReferenceValidator::new(tx).ensure_references(slot)?;

    debug!(phase = %RequestPhase::CheckingConflicts, ?exclude, "checking schedule conflicts");
    let detector = ConflictDetector::new(tx);
    if let Some(blocking) = detector.classroom_conflict(slot, exclude)? {
        return Err(ScheduleError::conflict(ConflictKind::Classroom, blocking.id));
    }
    if let Some(blocking) = detector.teacher_conflict(slot, exclude)? {
        return Err(ScheduleError::conflict(ConflictKind::Teacher, blocking.id));
    }
    Ok(())
}

fn finish(
    operation: &'static str,
    entry_id: Option<EntryId>,
    result: ScheduleResult<ScheduleEntry>,
) -> ScheduleResult<ScheduleEntry> {
    match result {
        Ok(entry) => {
            info!(
                phase = %RequestPhase::Done,
                operation,
                entry_id = entry.id,
                class_id = entry.class_id,
                classroom_id = entry.classroom_id,
                day = %entry.day_of_week,
                "schedule entry saved"
            );
            Ok(entry)
        }
        Err(err) => Err(reject(operation, entry_id, err)),
    }
}

fn reject(operation: &'static str, entry_id: Option<EntryId>, err: ScheduleError) -> ScheduleError {
    match &err {
        ScheduleError::Store(store_err) if store_err.is_transient() => {
            warn!(operation, ?entry_id, error = %err, "schedule write hit a busy store");
        }
        ScheduleError::Store(_) => {
            error!(operation, ?entry_id, error = %err, "schedule write failed");
        }
        _ => {
            info!(phase = %RequestPhase::Rejected, operation, ?entry_id, reason = %err, "schedule request rejected");
        }
    }
    err
}
