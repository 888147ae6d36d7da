use crate::entry::{DayOfWeek, ScheduleRequest, ScheduleSlot, time_of_day};
use crate::error::ValidationError;

/// Checks the shape of a request before any store access. References and
/// conflicts are checked later, inside the write transaction.
pub fn validate_request(request: &ScheduleRequest) -> Result<ScheduleSlot, ValidationError> {
    let start_time = time_of_day::truncate(request.start_time);
    let end_time = time_of_day::truncate(request.end_time);
    if start_time >= end_time {
        return Err(ValidationError::InvalidTimeRange {
            start: start_time,
            end: end_time,
        });
    }

    let day_of_week = DayOfWeek::new(request.day_of_week)?;

    Ok(ScheduleSlot {
        class_id: request.class_id,
        classroom_id: request.classroom_id,
        day_of_week,
        start_time,
        end_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn empty_and_inverted_windows_are_rejected() {
        let same = ScheduleRequest::new(1, 1, 1, t(9, 0), t(9, 0));
        assert!(matches!(
            validate_request(&same),
            Err(ValidationError::InvalidTimeRange { .. })
        ));
        let inverted = ScheduleRequest::new(1, 1, 1, t(10, 0), t(9, 0));
        assert!(matches!(
            validate_request(&inverted),
            Err(ValidationError::InvalidTimeRange { .. })
        ));
    }

    #[test]
    fn time_range_is_checked_before_day() {
        let request = ScheduleRequest::new(1, 1, 12, t(10, 0), t(9, 0));
        assert!(matches!(
            validate_request(&request),
            Err(ValidationError::InvalidTimeRange { .. })
        ));
    }

    #[test]
    fn sub_second_difference_is_not_a_window() {
        let start = NaiveTime::from_hms_milli_opt(9, 0, 0, 100).unwrap();
        let end = NaiveTime::from_hms_milli_opt(9, 0, 0, 900).unwrap();
        let request = ScheduleRequest {
            class_id: 1,
            classroom_id: 1,
            day_of_week: 1,
            start_time: start,
            end_time: end,
        };
        assert!(validate_request(&request).is_err());
    }

    #[test]
    fn valid_request_becomes_slot() {
        let slot = validate_request(&ScheduleRequest::new(3, 4, 6, t(13, 0), t(14, 0))).unwrap();
        assert_eq!(slot.day_of_week, DayOfWeek::SATURDAY);
        assert_eq!(slot.class_id, 3);
        assert_eq!(slot.classroom_id, 4);
    }
}
