use crate::train::TrainSpec;
use log::*;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("cannot read train file: {0}")]
    Io(#[from] std::io::Error),
    #[error("no trains found in input")]
    Empty,
}

pub fn read_trains(path: &Path) -> Result<Vec<TrainSpec>, InputError> {
    trace!("Loading file {}", path.display());
    let contents = std::fs::read_to_string(path)?;
    parse_trains(&contents)
}

/// One train per line: `<direction> <load ticks> <cross ticks>`, direction
/// one of `E`, `e`, `W`, `w`. Lines that do not parse are skipped.
pub fn parse_trains(contents: &str) -> Result<Vec<TrainSpec>, InputError> {
    let mut trains = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_line(line) {
            Ok(spec) => trains.push(spec),
            Err(msg) => warn!("Skipping line {}: {} ({:?})", line_no + 1, msg, line),
        }
    }

    if trains.is_empty() {
        return Err(InputError::Empty);
    }
    debug!("Read {} trains", trains.len());
    Ok(trains)
}

fn parse_line(line: &str) -> Result<TrainSpec, &'static str> {
    let mut fields = line.split_whitespace();
    let (direction, load, cross) = match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (Some(d), Some(load), Some(cross), None) => (d, load, cross),
        _ => return Err("expected three fields"),
    };

    let mut chars = direction.chars();
    let direction = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => return Err("direction must be a single character"),
    };
    let load = parse_ticks(load).ok_or("load time is not a number")?;
    let cross = parse_ticks(cross).ok_or("crossing time is not a number")?;

    TrainSpec::from_token(direction, load, cross).ok_or("direction must be one of E, e, W, w")
}

fn parse_ticks(field: &str) -> Option<u64> {
    let ticks = field.parse::<i64>().ok()?;
    if ticks < 0 {
        warn!("Negative duration {} treated as zero", ticks);
    }
    Some(ticks.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::train::{Direction, Priority};

    #[test]
    fn reads_records_in_order() {
        let trains = parse_trains("e 10 6\nW 6 7\n\nE 3 10\n").unwrap();
        assert_eq!(trains.len(), 3);
        assert_eq!(trains[0].direction, Direction::East);
        assert_eq!(trains[0].priority, Priority::Low);
        assert_eq!((trains[0].load_ticks, trains[0].cross_ticks), (10, 6));
        assert_eq!(trains[1].direction, Direction::West);
        assert_eq!(trains[1].priority, Priority::High);
        assert_eq!(trains[2].priority, Priority::High);
    }

    #[test]
    fn skips_bad_lines() {
        let trains = parse_trains("# comment\nx 1 1\nE one 2\nw 1\nw 1 2 3\nEE 1 2\nw 4 5").unwrap();
        assert_eq!(trains.len(), 1);
        assert_eq!(trains[0].direction, Direction::West);
        assert_eq!(trains[0].load_ticks, 4);
    }

    #[test]
    fn negative_durations_clamp_to_zero() {
        let trains = parse_trains("E -3 2").unwrap();
        assert_eq!(trains[0].load_ticks, 0);
        assert_eq!(trains[0].cross_ticks, 2);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(parse_trains(""), Err(InputError::Empty)));
        assert!(matches!(parse_trains("q 1 1\n"), Err(InputError::Empty)));
    }

    #[test]
    fn missing_file() {
        let result = read_trains(Path::new("/nonexistent/trains.txt"));
        assert!(matches!(result, Err(InputError::Io(_))));
    }
}
