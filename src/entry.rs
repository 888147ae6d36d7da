use crate::error::ValidationError;
use crate::overlap::overlaps;
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type EntryId = i64;
pub type ClassId = i64;
pub type ClassroomId = i64;
pub type TeacherId = i64;

/// Day slot of the recurring weekly template. `0` is Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct DayOfWeek(u8);

impl DayOfWeek {
    pub const SUNDAY: Self = Self(0);
    pub const MONDAY: Self = Self(1);
    pub const TUESDAY: Self = Self(2);
    pub const WEDNESDAY: Self = Self(3);
    pub const THURSDAY: Self = Self(4);
    pub const FRIDAY: Self = Self(5);
    pub const SATURDAY: Self = Self(6);

    pub fn new(value: i64) -> Result<Self, ValidationError> {
        match u8::try_from(value) {
            Ok(day) if day <= 6 => Ok(Self(day)),
            _ => Err(ValidationError::InvalidDay(value)),
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn weekday(self) -> Weekday {
        match self.0 {
            0 => Weekday::Sun,
            1 => Weekday::Mon,
            2 => Weekday::Tue,
            3 => Weekday::Wed,
            4 => Weekday::Thu,
            5 => Weekday::Fri,
            _ => Weekday::Sat,
        }
    }

    pub fn name(self) -> &'static str {
        match self.weekday() {
            Weekday::Sun => "Sunday",
            Weekday::Mon => "Monday",
            Weekday::Tue => "Tuesday",
            Weekday::Wed => "Wednesday",
            Weekday::Thu => "Thursday",
            Weekday::Fri => "Friday",
            Weekday::Sat => "Saturday",
        }
    }
}

impl TryFrom<i64> for DayOfWeek {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DayOfWeek> for u8 {
    fn from(value: DayOfWeek) -> Self {
        value.0
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(value: Weekday) -> Self {
        Self(value.num_days_from_sunday() as u8)
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `HH:MM:SS` on output; `HH:MM` is accepted on input and fractions of a
/// second are dropped.
pub mod time_of_day {
    use chrono::{NaiveTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub const FORMAT: &str = "%H:%M:%S";

    pub fn parse(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
        let raw = raw.trim();
        let time = NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))?;
        Ok(truncate(time))
    }

    pub fn truncate(time: NaiveTime) -> NaiveTime {
        time.with_nanosecond(0).unwrap_or(time)
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(|err| de::Error::custom(format!("invalid time '{raw}': {err}")))
    }
}

/// Fields a caller submits to create or replace a schedule entry.
///
/// `day_of_week` stays a raw integer here so an out-of-range value reaches
/// validation instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub class_id: ClassId,
    pub classroom_id: ClassroomId,
    pub day_of_week: i64,
    #[serde(with = "time_of_day")]
    pub start_time: NaiveTime,
    #[serde(with = "time_of_day")]
    pub end_time: NaiveTime,
}

impl ScheduleRequest {
    pub fn new(
        class_id: ClassId,
        classroom_id: ClassroomId,
        day_of_week: i64,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            class_id,
            classroom_id,
            day_of_week,
            start_time: time_of_day::truncate(start_time),
            end_time: time_of_day::truncate(end_time),
        }
    }
}

/// A validated request: a legal weekly window for one class in one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSlot {
    pub class_id: ClassId,
    pub classroom_id: ClassroomId,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl ScheduleSlot {
    pub fn overlaps(&self, entry: &ScheduleEntry) -> bool {
        self.day_of_week == entry.day_of_week
            && overlaps(self.start_time, self.end_time, entry.start_time, entry.end_time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: EntryId,
    pub class_id: ClassId,
    pub classroom_id: ClassroomId,
    pub day_of_week: DayOfWeek,
    #[serde(with = "time_of_day")]
    pub start_time: NaiveTime,
    #[serde(with = "time_of_day")]
    pub end_time: NaiveTime,
}

impl ScheduleEntry {
    pub fn from_slot(id: EntryId, slot: &ScheduleSlot) -> Self {
        Self {
            id,
            class_id: slot.class_id,
            classroom_id: slot.classroom_id,
            day_of_week: slot.day_of_week,
            start_time: slot.start_time,
            end_time: slot.end_time,
        }
    }

    pub fn slot(&self) -> ScheduleSlot {
        ScheduleSlot {
            class_id: self.class_id,
            classroom_id: self.classroom_id,
            day_of_week: self.day_of_week,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }

    pub fn to_request(&self) -> ScheduleRequest {
        ScheduleRequest {
            class_id: self.class_id,
            classroom_id: self.classroom_id,
            day_of_week: i64::from(self.day_of_week.index()),
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// A schedule entry joined with the display fields the calendar grid needs.
///
/// Read-side only; nothing on the write path looks at these names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleListing {
    pub id: EntryId,
    pub class_id: ClassId,
    pub classroom_id: ClassroomId,
    pub day_of_week: DayOfWeek,
    #[serde(with = "time_of_day")]
    pub start_time: NaiveTime,
    #[serde(with = "time_of_day")]
    pub end_time: NaiveTime,
    pub class_name: String,
    pub subject: String,
    #[serde(default)]
    pub teacher_id: Option<TeacherId>,
    #[serde(default)]
    pub teacher_name: Option<String>,
    pub classroom_name: String,
}

impl ScheduleListing {
    fn sort_key(&self) -> (DayOfWeek, NaiveTime, EntryId) {
        (self.day_of_week, self.start_time, self.id)
    }
}

/// Narrows a listing to one room, one teacher or one day. Empty matches all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleFilter {
    #[serde(default)]
    pub classroom_id: Option<ClassroomId>,
    #[serde(default)]
    pub teacher_id: Option<TeacherId>,
    #[serde(default)]
    pub day_of_week: Option<DayOfWeek>,
}

impl ScheduleFilter {
    pub fn classroom(classroom_id: ClassroomId) -> Self {
        Self {
            classroom_id: Some(classroom_id),
            ..Self::default()
        }
    }

    pub fn teacher(teacher_id: TeacherId) -> Self {
        Self {
            teacher_id: Some(teacher_id),
            ..Self::default()
        }
    }

    pub fn day(day_of_week: DayOfWeek) -> Self {
        Self {
            day_of_week: Some(day_of_week),
            ..Self::default()
        }
    }

    pub fn matches(&self, listing: &ScheduleListing) -> bool {
        self.classroom_id.is_none_or(|id| listing.classroom_id == id)
            && self
                .teacher_id
                .is_none_or(|id| listing.teacher_id == Some(id))
            && self.day_of_week.is_none_or(|day| listing.day_of_week == day)
    }
}

/// Orders listings the way the calendar grid reads them: by day, then start
/// time, then id.
pub fn sort_listings(listings: &mut [ScheduleListing]) {
    listings.sort_by_key(ScheduleListing::sort_key);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_of_week_rejects_out_of_range() {
        assert_eq!(DayOfWeek::new(7), Err(ValidationError::InvalidDay(7)));
        assert_eq!(DayOfWeek::new(-1), Err(ValidationError::InvalidDay(-1)));
        assert_eq!(DayOfWeek::new(1).unwrap().weekday(), Weekday::Mon);
        assert_eq!(DayOfWeek::from(Weekday::Sun), DayOfWeek::SUNDAY);
    }

    #[test]
    fn request_accepts_short_times_and_serializes_seconds() {
        let request: ScheduleRequest = serde_json::from_str(
            r#"{"class_id":1,"classroom_id":2,"day_of_week":1,"start_time":"09:00","end_time":"10:15:30"}"#,
        )
        .unwrap();
        assert_eq!(request.start_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["start_time"], "09:00:00");
        assert_eq!(json["end_time"], "10:15:30");
    }

    #[test]
    fn entry_rejects_invalid_day_on_deserialize() {
        let result: Result<ScheduleEntry, _> = serde_json::from_str(
            r#"{"id":1,"class_id":1,"classroom_id":2,"day_of_week":9,"start_time":"09:00:00","end_time":"10:00:00"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn time_parse_drops_fractional_seconds() {
        let parsed = time_of_day::parse("08:30:15.750").unwrap();
        assert_eq!(parsed, NaiveTime::from_hms_opt(8, 30, 15).unwrap());
    }
}
