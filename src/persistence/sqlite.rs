use super::{
    ScheduleQueries, ScheduleStore, ScheduleTransaction, StoreError, StoreResult, TransactionWork,
};
use crate::entry::{
    ClassId, ClassroomId, DayOfWeek, EntryId, ScheduleEntry, ScheduleFilter, ScheduleListing,
    ScheduleSlot, TeacherId,
};
use crate::error::{ConflictKind, ScheduleResult};
use crate::registry::{ClassOffering, ClassRegistry, Classroom, ClassroomRegistry, Teacher};
use chrono::{NaiveTime, Timelike};
use parking_lot::Mutex;
use rusqlite::{
    Connection, ErrorCode, OptionalExtension, Params, Row, Transaction, TransactionBehavior,
    params,
};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CLASSROOM_EXCLUSION: &str = "timetable_exclusion:classroom";
const TEACHER_EXCLUSION: &str = "timetable_exclusion:teacher";

// Times are stored as seconds since midnight so the exclusion triggers can
// compare them as integers. Every trigger encodes the same half-open test as
// `crate::overlap::overlaps`.
const SCHEMA: &str = r#"
    PRAGMA foreign_keys = ON;
    CREATE TABLE IF NOT EXISTS teachers (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS classrooms (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        building TEXT NOT NULL,
        capacity INTEGER NOT NULL CHECK (capacity >= 0)
    );
    CREATE TABLE IF NOT EXISTS classes (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        subject TEXT NOT NULL,
        grade_level TEXT NOT NULL,
        teacher_id INTEGER REFERENCES teachers(id) ON DELETE SET NULL
    );
    CREATE TABLE IF NOT EXISTS schedule_entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        class_id INTEGER NOT NULL REFERENCES classes(id) ON DELETE CASCADE,
        classroom_id INTEGER NOT NULL REFERENCES classrooms(id) ON DELETE CASCADE,
        day_of_week INTEGER NOT NULL CHECK (day_of_week BETWEEN 0 AND 6),
        start_second INTEGER NOT NULL CHECK (start_second BETWEEN 0 AND 86399),
        end_second INTEGER NOT NULL CHECK (end_second BETWEEN 0 AND 86399),
        CHECK (start_second < end_second)
    );
    CREATE INDEX IF NOT EXISTS schedule_entries_classroom_day
        ON schedule_entries (classroom_id, day_of_week);
    CREATE INDEX IF NOT EXISTS schedule_entries_class_day
        ON schedule_entries (class_id, day_of_week);
    CREATE INDEX IF NOT EXISTS classes_teacher ON classes (teacher_id);

    CREATE TRIGGER IF NOT EXISTS schedule_entries_classroom_insert
    BEFORE INSERT ON schedule_entries
    WHEN EXISTS (
        SELECT 1 FROM schedule_entries e
        WHERE e.classroom_id = NEW.classroom_id
          AND e.day_of_week = NEW.day_of_week
          AND e.start_second < NEW.end_second
          AND NEW.start_second < e.end_second
    )
    BEGIN
        SELECT RAISE(ABORT, 'timetable_exclusion:classroom');
    END;

    CREATE TRIGGER IF NOT EXISTS schedule_entries_classroom_update
    BEFORE UPDATE ON schedule_entries
    WHEN EXISTS (
        SELECT 1 FROM schedule_entries e
        WHERE e.id <> OLD.id
          AND e.classroom_id = NEW.classroom_id
          AND e.day_of_week = NEW.day_of_week
          AND e.start_second < NEW.end_second
          AND NEW.start_second < e.end_second
    )
    BEGIN
        SELECT RAISE(ABORT, 'timetable_exclusion:classroom');
    END;

    CREATE TRIGGER IF NOT EXISTS schedule_entries_teacher_insert
    BEFORE INSERT ON schedule_entries
    WHEN EXISTS (
        SELECT 1 FROM schedule_entries e
        JOIN classes booked ON booked.id = e.class_id
        JOIN classes candidate ON candidate.id = NEW.class_id
        WHERE booked.teacher_id = candidate.teacher_id
          AND e.day_of_week = NEW.day_of_week
          AND e.start_second < NEW.end_second
          AND NEW.start_second < e.end_second
    )
    BEGIN
        SELECT RAISE(ABORT, 'timetable_exclusion:teacher');
    END;

    CREATE TRIGGER IF NOT EXISTS schedule_entries_teacher_update
    BEFORE UPDATE ON schedule_entries
    WHEN EXISTS (
        SELECT 1 FROM schedule_entries e
        JOIN classes booked ON booked.id = e.class_id
        JOIN classes candidate ON candidate.id = NEW.class_id
        WHERE e.id <> OLD.id
          AND booked.teacher_id = candidate.teacher_id
          AND e.day_of_week = NEW.day_of_week
          AND e.start_second < NEW.end_second
          AND NEW.start_second < e.end_second
    )
    BEGIN
        SELECT RAISE(ABORT, 'timetable_exclusion:teacher');
    END;

    CREATE TRIGGER IF NOT EXISTS classes_teacher_reassignment
    BEFORE UPDATE OF teacher_id ON classes
    WHEN NEW.teacher_id IS NOT NULL AND EXISTS (
        SELECT 1 FROM schedule_entries mine
        JOIN schedule_entries other
          ON other.id <> mine.id
         AND other.day_of_week = mine.day_of_week
         AND other.start_second < mine.end_second
         AND mine.start_second < other.end_second
        JOIN classes taught ON taught.id = other.class_id
        WHERE mine.class_id = NEW.id
          AND (other.class_id = NEW.id OR taught.teacher_id = NEW.teacher_id)
    )
    BEGIN
        SELECT RAISE(ABORT, 'timetable_exclusion:teacher');
    END;
"#;

const ENTRY_COLUMNS: &str =
    "e.id, e.class_id, e.classroom_id, e.day_of_week, e.start_second, e.end_second";

const LISTING_SELECT: &str = r#"
    SELECT e.id, e.class_id, e.classroom_id, e.day_of_week, e.start_second, e.end_second,
           c.name, c.subject, c.teacher_id, t.name, r.name
    FROM schedule_entries e
    JOIN classes c ON c.id = e.class_id
    JOIN classrooms r ON r.id = e.classroom_id
    LEFT JOIN teachers t ON t.id = c.teacher_id
"#;

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        match &value {
            rusqlite::Error::SqliteFailure(failure, message) => {
                let message = message.clone().unwrap_or_else(|| failure.to_string());
                match failure.code {
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                        StoreError::Busy(message)
                    }
                    ErrorCode::ConstraintViolation => match exclusion_kind(&message) {
                        Some(kind) => StoreError::Exclusion(kind),
                        None => StoreError::Constraint(message),
                    },
                    _ => StoreError::Backend(message),
                }
            }
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::IntegralValueOutOfRange(..)
            | rusqlite::Error::InvalidColumnType(..) => StoreError::Corrupt(value.to_string()),
            _ => StoreError::Backend(value.to_string()),
        }
    }
}

fn exclusion_kind(message: &str) -> Option<ConflictKind> {
    if message.contains(CLASSROOM_EXCLUSION) {
        Some(ConflictKind::Classroom)
    } else if message.contains(TEACHER_EXCLUSION) {
        Some(ConflictKind::Teacher)
    } else {
        None
    }
}

fn seconds(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight())
}

fn time_from_seconds(entry_id: EntryId, value: i64) -> StoreResult<NaiveTime> {
    u32::try_from(value)
        .ok()
        .and_then(|secs| NaiveTime::from_num_seconds_from_midnight_opt(secs, 0))
        .ok_or_else(|| {
            StoreError::Corrupt(format!("entry {entry_id} has invalid time offset {value}"))
        })
}

struct RawEntry {
    id: EntryId,
    class_id: ClassId,
    classroom_id: ClassroomId,
    day_of_week: i64,
    start_second: i64,
    end_second: i64,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            class_id: row.get(1)?,
            classroom_id: row.get(2)?,
            day_of_week: row.get(3)?,
            start_second: row.get(4)?,
            end_second: row.get(5)?,
        })
    }

    fn into_entry(self) -> StoreResult<ScheduleEntry> {
        let day_of_week = DayOfWeek::new(self.day_of_week)
            .map_err(|err| StoreError::Corrupt(format!("entry {}: {err}", self.id)))?;
        Ok(ScheduleEntry {
            id: self.id,
            class_id: self.class_id,
            classroom_id: self.classroom_id,
            day_of_week,
            start_time: time_from_seconds(self.id, self.start_second)?,
            end_time: time_from_seconds(self.id, self.end_second)?,
        })
    }
}

struct RawListing {
    entry: RawEntry,
    class_name: String,
    subject: String,
    teacher_id: Option<TeacherId>,
    teacher_name: Option<String>,
    classroom_name: String,
}

impl RawListing {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            entry: RawEntry::from_row(row)?,
            class_name: row.get(6)?,
            subject: row.get(7)?,
            teacher_id: row.get(8)?,
            teacher_name: row.get(9)?,
            classroom_name: row.get(10)?,
        })
    }

    fn into_listing(self) -> StoreResult<ScheduleListing> {
        let entry = self.entry.into_entry()?;
        Ok(ScheduleListing {
            id: entry.id,
            class_id: entry.class_id,
            classroom_id: entry.classroom_id,
            day_of_week: entry.day_of_week,
            start_time: entry.start_time,
            end_time: entry.end_time,
            class_name: self.class_name,
            subject: self.subject,
            teacher_id: self.teacher_id,
            teacher_name: self.teacher_name,
            classroom_name: self.classroom_name,
        })
    }
}

fn query_entries<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> StoreResult<Vec<ScheduleEntry>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params, RawEntry::from_row)?;
    let mut entries = Vec::new();
    for raw in rows {
        entries.push(raw?.into_entry()?);
    }
    Ok(entries)
}

fn query_listings<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> StoreResult<Vec<ScheduleListing>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params, RawListing::from_row)?;
    let mut listings = Vec::new();
    for raw in rows {
        listings.push(raw?.into_listing()?);
    }
    Ok(listings)
}

fn find_entry(conn: &Connection, id: EntryId) -> StoreResult<Option<ScheduleEntry>> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM schedule_entries e WHERE e.id = ?1");
    let raw = conn
        .prepare_cached(&sql)?
        .query_row(params![id], RawEntry::from_row)
        .optional()?;
    raw.map(RawEntry::into_entry).transpose()
}

fn row_exists(conn: &Connection, sql: &str, id: i64) -> StoreResult<bool> {
    let found: Option<i64> = conn
        .prepare_cached(sql)?
        .query_row(params![id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// One `BEGIN IMMEDIATE` transaction. SQLite takes the RESERVED lock up
/// front, so concurrent writers (in this process or another one sharing the
/// file) run their check-and-write sequences one after another.
struct SqliteTransaction<'c> {
    tx: Transaction<'c>,
}

impl ScheduleQueries for SqliteTransaction<'_> {
    fn find_entry(&self, id: EntryId) -> StoreResult<Option<ScheduleEntry>> {
        find_entry(&self.tx, id)
    }

    fn entries_for_classroom(
        &self,
        classroom_id: ClassroomId,
        day_of_week: DayOfWeek,
    ) -> StoreResult<Vec<ScheduleEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM schedule_entries e \
             WHERE e.classroom_id = ?1 AND e.day_of_week = ?2 ORDER BY e.start_second"
        );
        query_entries(&self.tx, &sql, params![classroom_id, day_of_week.index()])
    }

    fn entries_for_teacher(
        &self,
        teacher_id: TeacherId,
        day_of_week: DayOfWeek,
    ) -> StoreResult<Vec<ScheduleEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM schedule_entries e \
             JOIN classes c ON c.id = e.class_id \
             WHERE c.teacher_id = ?1 AND e.day_of_week = ?2 ORDER BY e.start_second"
        );
        query_entries(&self.tx, &sql, params![teacher_id, day_of_week.index()])
    }
}

impl ClassRegistry for SqliteTransaction<'_> {
    fn class_exists(&self, id: ClassId) -> StoreResult<bool> {
        row_exists(&self.tx, "SELECT id FROM classes WHERE id = ?1", id)
    }

    fn teacher_for_class(&self, id: ClassId) -> StoreResult<Option<TeacherId>> {
        let teacher: Option<Option<TeacherId>> = self
            .tx
            .prepare_cached("SELECT teacher_id FROM classes WHERE id = ?1")?
            .query_row(params![id], |row| row.get(0))
            .optional()?;
        Ok(teacher.flatten())
    }
}

impl ClassroomRegistry for SqliteTransaction<'_> {
    fn classroom_exists(&self, id: ClassroomId) -> StoreResult<bool> {
        row_exists(&self.tx, "SELECT id FROM classrooms WHERE id = ?1", id)
    }
}

impl ScheduleTransaction for SqliteTransaction<'_> {
    fn insert_entry(&mut self, slot: &ScheduleSlot) -> StoreResult<ScheduleEntry> {
        self.tx.execute(
            "INSERT INTO schedule_entries \
             (class_id, classroom_id, day_of_week, start_second, end_second) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                slot.class_id,
                slot.classroom_id,
                slot.day_of_week.index(),
                seconds(slot.start_time),
                seconds(slot.end_time),
            ],
        )?;
        let id = self.tx.last_insert_rowid();
        Ok(ScheduleEntry::from_slot(id, slot))
    }

    fn replace_entry(
        &mut self,
        id: EntryId,
        slot: &ScheduleSlot,
    ) -> StoreResult<Option<ScheduleEntry>> {
        let changed = self.tx.execute(
            "UPDATE schedule_entries \
             SET class_id = ?1, classroom_id = ?2, day_of_week = ?3, start_second = ?4, end_second = ?5 \
             WHERE id = ?6",
            params![
                slot.class_id,
                slot.classroom_id,
                slot.day_of_week.index(),
                seconds(slot.start_time),
                seconds(slot.end_time),
                id,
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        Ok(Some(ScheduleEntry::from_slot(id, slot)))
    }
}

pub struct SqliteScheduleStore {
    connection: Mutex<Connection>,
}

impl SqliteScheduleStore {
    pub fn new<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::with_busy_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn with_busy_timeout<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> StoreResult<Self> {
        let path = path.as_ref();
        let connection = Connection::open(path)?;
        connection.busy_timeout(busy_timeout)?;
        let journal_mode: String =
            connection.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        Self::initialize_schema(&connection)?;
        info!(path = %path.display(), %journal_mode, "opened sqlite timetable store");
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        debug!("opened in-memory sqlite timetable store");
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> StoreResult<()> {
        connection.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn upsert_teacher(&self, teacher: &Teacher) -> StoreResult<()> {
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO teachers (id, name) VALUES (?1, ?2) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            params![teacher.id, teacher.name],
        )?;
        Ok(())
    }

    pub fn upsert_classroom(&self, classroom: &Classroom) -> StoreResult<()> {
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO classrooms (id, name, building, capacity) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(id) DO UPDATE SET \
             name = excluded.name, building = excluded.building, capacity = excluded.capacity",
            params![
                classroom.id,
                classroom.name,
                classroom.building,
                classroom.capacity
            ],
        )?;
        Ok(())
    }

    /// Fails with [`StoreError::Exclusion`] when moving the class to a new
    /// teacher would double-book that teacher.
    pub fn upsert_class(&self, class: &ClassOffering) -> StoreResult<()> {
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO classes (id, name, subject, grade_level, teacher_id) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(id) DO UPDATE SET \
             name = excluded.name, subject = excluded.subject, \
             grade_level = excluded.grade_level, teacher_id = excluded.teacher_id",
            params![
                class.id,
                class.name,
                class.subject,
                class.grade_level,
                class.teacher_id
            ],
        )?;
        Ok(())
    }

    /// Closes the underlying connection, surfacing any error SQLite reports
    /// while flushing.
    pub fn close(self) -> StoreResult<()> {
        self.connection
            .into_inner()
            .close()
            .map_err(|(_, err)| StoreError::from(err))
    }
}

impl ScheduleStore for SqliteScheduleStore {
    fn write_atomically(&self, work: &mut TransactionWork<'_>) -> ScheduleResult<ScheduleEntry> {
        let mut conn = self.connection.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let mut unit = SqliteTransaction { tx };
        let scoped: &mut dyn ScheduleTransaction = &mut unit;
        let entry = work(scoped)?;
        unit.tx.commit().map_err(StoreError::from)?;
        debug!(entry_id = entry.id, "sqlite store committed entry");
        Ok(entry)
    }

    fn find_listing(&self, id: EntryId) -> StoreResult<Option<ScheduleListing>> {
        let conn = self.connection.lock();
        let sql = format!("{LISTING_SELECT} WHERE e.id = ?1");
        let mut listings = query_listings(&conn, &sql, params![id])?;
        Ok(listings.pop())
    }

    fn list_listings(&self, filter: &ScheduleFilter) -> StoreResult<Vec<ScheduleListing>> {
        let conn = self.connection.lock();
        let sql = format!(
            "{LISTING_SELECT} \
             WHERE (?1 IS NULL OR e.classroom_id = ?1) \
               AND (?2 IS NULL OR c.teacher_id = ?2) \
               AND (?3 IS NULL OR e.day_of_week = ?3) \
             ORDER BY e.day_of_week, e.start_second, e.id"
        );
        query_listings(
            &conn,
            &sql,
            params![
                filter.classroom_id,
                filter.teacher_id,
                filter.day_of_week.map(DayOfWeek::index)
            ],
        )
    }

    fn delete_entry(&self, id: EntryId) -> StoreResult<bool> {
        let conn = self.connection.lock();
        let removed = conn.execute("DELETE FROM schedule_entries WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_messages_map_to_exclusion_kinds() {
        assert_eq!(
            exclusion_kind("timetable_exclusion:classroom"),
            Some(ConflictKind::Classroom)
        );
        assert_eq!(
            exclusion_kind("timetable_exclusion:teacher"),
            Some(ConflictKind::Teacher)
        );
        assert_eq!(exclusion_kind("FOREIGN KEY constraint failed"), None);
    }

    #[test]
    fn schema_is_idempotent() {
        let store = SqliteScheduleStore::open_in_memory().unwrap();
        let conn = store.connection.lock();
        SqliteScheduleStore::initialize_schema(&conn).unwrap();
    }

    #[test]
    fn out_of_range_offsets_are_corrupt() {
        assert!(matches!(
            time_from_seconds(1, 86_400),
            Err(StoreError::Corrupt(_))
        ));
        assert!(matches!(time_from_seconds(1, -5), Err(StoreError::Corrupt(_))));
        assert_eq!(
            time_from_seconds(1, 9 * 3600).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
    }
}
