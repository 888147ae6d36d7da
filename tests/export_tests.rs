use chrono::NaiveTime;
use class_timetable::{
    DayOfWeek, ExportError, ScheduleListing, load_listings_from_json, save_listings_to_csv,
    save_listings_to_json, write_listings_csv,
};
use std::fs;
use tempfile::NamedTempFile;

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn listings() -> Vec<ScheduleListing> {
    vec![
        ScheduleListing {
            id: 1,
            class_id: 10,
            classroom_id: 3,
            day_of_week: DayOfWeek::MONDAY,
            start_time: t(9, 0),
            end_time: t(10, 15),
            class_name: "Algebra I".into(),
            subject: "Math".into(),
            teacher_id: Some(7),
            teacher_name: Some("Ada Lovelace".into()),
            classroom_name: "Room 101".into(),
        },
        ScheduleListing {
            id: 4,
            class_id: 11,
            classroom_id: 2,
            day_of_week: DayOfWeek::FRIDAY,
            start_time: t(13, 30),
            end_time: t(14, 0),
            class_name: "Study Hall".into(),
            subject: "General".into(),
            teacher_id: None,
            teacher_name: None,
            classroom_name: "Library, East".into(),
        },
    ]
}

#[test]
fn json_export_round_trips_listings() {
    let file = NamedTempFile::new().unwrap();
    save_listings_to_json(&listings(), file.path()).unwrap();

    let raw = fs::read_to_string(file.path()).unwrap();
    assert!(raw.contains("\"start_time\": \"09:00:00\""), "{raw}");
    assert!(raw.contains("\"day_of_week\": 5"), "{raw}");

    let loaded = load_listings_from_json(file.path()).unwrap();
    assert_eq!(loaded, listings());
}

#[test]
fn json_import_accepts_minute_precision_and_missing_teacher() {
    let file = NamedTempFile::new().unwrap();
    fs::write(
        file.path(),
        r#"[{"id":2,"class_id":1,"classroom_id":1,"day_of_week":0,
            "start_time":"08:30","end_time":"09:45",
            "class_name":"Choir","subject":"Music","classroom_name":"Hall"}]"#,
    )
    .unwrap();

    let loaded = load_listings_from_json(file.path()).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].day_of_week, DayOfWeek::SUNDAY);
    assert_eq!(loaded[0].start_time, t(8, 30));
    assert_eq!(loaded[0].teacher_name, None);
}

#[test]
fn json_import_rejects_an_out_of_range_day() {
    let file = NamedTempFile::new().unwrap();
    fs::write(
        file.path(),
        r#"[{"id":2,"class_id":1,"classroom_id":1,"day_of_week":9,
            "start_time":"08:30","end_time":"09:45",
            "class_name":"Choir","subject":"Music","classroom_name":"Hall"}]"#,
    )
    .unwrap();

    let err = load_listings_from_json(file.path()).unwrap_err();
    assert!(matches!(err, ExportError::Serialization(_)), "{err:?}");
}

#[test]
fn csv_export_writes_header_and_named_days() {
    let mut buffer = Vec::new();
    write_listings_csv(&listings(), &mut buffer).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(
        lines[0],
        "id,day_of_week,day_name,start_time,end_time,class_id,class_name,subject,teacher_name,classroom_id,classroom_name"
    );
    assert_eq!(
        lines[1],
        "1,1,Monday,09:00:00,10:15:00,10,Algebra I,Math,Ada Lovelace,3,Room 101"
    );
    assert_eq!(
        lines[2],
        "4,5,Friday,13:30:00,14:00:00,11,Study Hall,General,,2,\"Library, East\""
    );
}

#[test]
fn csv_export_of_nothing_is_empty() {
    let mut buffer = Vec::new();
    write_listings_csv(&[], &mut buffer).unwrap();
    assert!(buffer.is_empty());
}

#[test]
fn csv_export_to_file() {
    let file = NamedTempFile::new().unwrap();
    save_listings_to_csv(&listings(), file.path()).unwrap();
    let text = fs::read_to_string(file.path()).unwrap();
    assert_eq!(text.lines().count(), 3);
}
