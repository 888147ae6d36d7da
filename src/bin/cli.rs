use class_timetable::entry::time_of_day;
use class_timetable::{
    ClassOffering, Classroom, DayOfWeek, ScheduleError, ScheduleFilter, ScheduleListing,
    ScheduleRequest, ScheduleService, SqliteScheduleStore, Teacher, save_listings_to_csv,
    save_listings_to_json, telemetry,
};
use std::io::{self, Write};
use std::sync::Arc;

fn render_listings(listings: &[ScheduleListing]) -> String {
    let headers = ["id", "day", "start", "end", "class", "subject", "teacher", "room"];
    let rows: Vec<[String; 8]> = listings
        .iter()
        .map(|l| {
            [
                l.id.to_string(),
                l.day_of_week.name().to_string(),
                l.start_time.format(time_of_day::FORMAT).to_string(),
                l.end_time.format(time_of_day::FORMAT).to_string(),
                l.class_name.clone(),
                l.subject.clone(),
                l.teacher_name.clone().unwrap_or_default(),
                l.classroom_name.clone(),
            ]
        })
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.len());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_row = |cells: &mut dyn Iterator<Item = &str>| {
        let mut line = String::from("|");
        for (ci, cell) in cells.enumerate() {
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(widths[ci].saturating_sub(cell.len())));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&mut headers.iter().copied()));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &rows {
        out.push_str(&render_row(&mut row.iter().map(String::as_str)));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn print_help() {
    println!(
        "Commands:\n  help                                          Show this help\n  teacher <id> <name>                           Upsert a teacher\n  room <id> <name> <building> <capacity>        Upsert a classroom\n  class <id> <name> <subject> <grade> [teacher] Upsert a class offering\n  add <class> <room> <day> <start> <end>        Schedule a class (day 0=Sunday..6, times HH:MM)\n  move <id> <class> <room> <day> <start> <end>  Replace a schedule entry\n  delete <id>                                   Delete a schedule entry\n  list [room <id>|teacher <id>|day <n>]         Show the weekly timetable\n  export <json|csv> <path>                      Write the timetable to disk\n  quit|exit                                     Exit"
    );
}

fn describe(err: &ScheduleError) -> String {
    match err {
        ScheduleError::Validation(_) => format!("Invalid: {err}"),
        ScheduleError::NotFound(_) => format!("Not found: {err}"),
        ScheduleError::Conflict { .. } => format!("Conflict: {err}"),
        ScheduleError::Store(_) => format!("Store error: {err}"),
    }
}

fn parse_request<'a, I>(parts: &mut I) -> Result<ScheduleRequest, String>
where
    I: Iterator<Item = &'a str>,
{
    let (Some(class_s), Some(room_s), Some(day_s), Some(start_s), Some(end_s)) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err("expected <class> <room> <day> <start> <end>".to_string());
    };
    let class_id: i64 = class_s.parse().map_err(|_| "Invalid class id".to_string())?;
    let classroom_id: i64 = room_s.parse().map_err(|_| "Invalid room id".to_string())?;
    let day_of_week: i64 = day_s.parse().map_err(|_| "Invalid day".to_string())?;
    let start_time = time_of_day::parse(start_s).map_err(|_| "Invalid start time (HH:MM)".to_string())?;
    let end_time = time_of_day::parse(end_s).map_err(|_| "Invalid end time (HH:MM)".to_string())?;
    Ok(ScheduleRequest::new(
        class_id,
        classroom_id,
        day_of_week,
        start_time,
        end_time,
    ))
}

fn parse_filter<'a, I>(parts: &mut I) -> Result<ScheduleFilter, String>
where
    I: Iterator<Item = &'a str>,
{
    match (parts.next(), parts.next()) {
        (None, _) => Ok(ScheduleFilter::default()),
        (Some("room"), Some(id)) => id
            .parse()
            .map(ScheduleFilter::classroom)
            .map_err(|_| "Invalid room id".to_string()),
        (Some("teacher"), Some(id)) => id
            .parse()
            .map(ScheduleFilter::teacher)
            .map_err(|_| "Invalid teacher id".to_string()),
        (Some("day"), Some(day)) => day
            .parse::<i64>()
            .map_err(|_| "Invalid day".to_string())
            .and_then(|d| DayOfWeek::new(d).map_err(|e| e.to_string()))
            .map(ScheduleFilter::day),
        _ => Err("Usage: list [room <id>|teacher <id>|day <n>]".to_string()),
    }
}

fn open_store() -> Result<SqliteScheduleStore, String> {
    match std::env::args().nth(1) {
        Some(path) => SqliteScheduleStore::new(&path)
            .map_err(|e| format!("cannot open timetable store {path}: {e}")),
        None => SqliteScheduleStore::open_in_memory().map_err(|e| e.to_string()),
    }
}

fn main() {
    telemetry::init_tracing("warn");

    let store = match open_store() {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    let service = ScheduleService::new(store.clone());

    println!("Class Timetable (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        if let Err(e) = io::stdout().flush() {
            eprintln!("cannot write to stdout: {e}");
            break;
        }
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "teacher" => match (parts.next(), parts.next()) {
                (Some(id_s), Some(name)) => match id_s.parse::<i64>() {
                    Ok(id) => match store.upsert_teacher(&Teacher::new(id, name)) {
                        Ok(()) => println!("Teacher {id} saved."),
                        Err(e) => println!("Error: {e}"),
                    },
                    Err(_) => println!("Invalid id"),
                },
                _ => println!("Usage: teacher <id> <name>"),
            },
            "room" => match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(id_s), Some(name), Some(building), Some(cap_s)) => {
                    let (Ok(id), Ok(capacity)) = (id_s.parse::<i64>(), cap_s.parse::<u32>()) else {
                        println!("Invalid id or capacity");
                        continue;
                    };
                    match store.upsert_classroom(&Classroom::new(id, name, building, capacity)) {
                        Ok(()) => println!("Classroom {id} saved."),
                        Err(e) => println!("Error: {e}"),
                    }
                }
                _ => println!("Usage: room <id> <name> <building> <capacity>"),
            },
            "class" => match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(id_s), Some(name), Some(subject), Some(grade)) => {
                    let Ok(id) = id_s.parse::<i64>() else {
                        println!("Invalid id");
                        continue;
                    };
                    let mut class = ClassOffering::new(id, name, subject, grade);
                    if let Some(teacher_s) = parts.next() {
                        match teacher_s.parse::<i64>() {
                            Ok(teacher_id) => class = class.taught_by(teacher_id),
                            Err(_) => {
                                println!("Invalid teacher id");
                                continue;
                            }
                        }
                    }
                    match store.upsert_class(&class) {
                        Ok(()) => println!("Class {id} saved."),
                        Err(e) => println!("Error: {e}"),
                    }
                }
                _ => println!("Usage: class <id> <name> <subject> <grade> [teacher_id]"),
            },
            "add" => match parse_request(&mut parts) {
                Ok(request) => match service.create(&request) {
                    Ok(entry) => println!("Scheduled entry {}.", entry.id),
                    Err(e) => println!("{}", describe(&e)),
                },
                Err(msg) => println!("{msg}"),
            },
            "move" => {
                let Some(Ok(id)) = parts.next().map(str::parse::<i64>) else {
                    println!("Usage: move <id> <class> <room> <day> <start> <end>");
                    continue;
                };
                match parse_request(&mut parts) {
                    Ok(request) => match service.update(id, &request) {
                        Ok(entry) => println!("Updated entry {}.", entry.id),
                        Err(e) => println!("{}", describe(&e)),
                    },
                    Err(msg) => println!("{msg}"),
                }
            }
            "delete" => match parts.next().map(str::parse::<i64>) {
                Some(Ok(id)) => match service.delete(id) {
                    Ok(true) => println!("Deleted entry {id}."),
                    Ok(false) => println!("Entry {id} not found."),
                    Err(e) => println!("{}", describe(&e)),
                },
                Some(Err(_)) => println!("Invalid id"),
                None => println!("Usage: delete <id>"),
            },
            "list" => match parse_filter(&mut parts) {
                Ok(filter) => match service.list_filtered(&filter) {
                    Ok(listings) => println!("{}", render_listings(&listings)),
                    Err(e) => println!("{}", describe(&e)),
                },
                Err(msg) => println!("{msg}"),
            },
            "export" => match (parts.next(), parts.next()) {
                (Some(format), Some(path)) => {
                    let listings = match service.list() {
                        Ok(listings) => listings,
                        Err(e) => {
                            println!("{}", describe(&e));
                            continue;
                        }
                    };
                    let result = match format {
                        "json" => save_listings_to_json(&listings, path),
                        "csv" => save_listings_to_csv(&listings, path),
                        _ => {
                            println!("Unknown format '{format}' (use json or csv)");
                            continue;
                        }
                    };
                    match result {
                        Ok(()) => println!("Exported {} entries to {path}.", listings.len()),
                        Err(e) => println!("Export error: {e}"),
                    }
                }
                _ => println!("Usage: export <json|csv> <path>"),
            },
            other => println!("Unknown command '{other}'. Type 'help'."),
        }
    }
}
