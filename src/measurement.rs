//! Reader for ImageJ rectangle measurement exports.
//!
//! The file starts with two header lines that carry no box data. Every
//! following non-empty line looks like
//!
//! ```text
//! <index> <beginX> <beginY> <width> <height> [...]
//! ```
//!
//! Coordinates may be written as floats and are truncated toward zero.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::RawBox;

const HEADER_LINES: usize = 2;

/// Read all boxes from a measurement file, in file order
pub fn read_measurements(path: &Path) -> Result<Vec<RawBox>> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Error::io(path, e)
        }
    })?;
    parse_measurements(BufReader::new(file), path)
}

/// Parse measurement lines from any buffered reader.
///
/// `path` is only used to label errors.
pub fn parse_measurements<R: BufRead>(reader: R, path: &Path) -> Result<Vec<RawBox>> {
    let mut boxes = Vec::new();

    for (idx, line) in reader.lines().enumerate().skip(HEADER_LINES) {
        let line = line.map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData => Error::InputFormat {
                path: path.to_path_buf(),
                line: idx + 1,
                message: "line is not valid UTF-8".to_string(),
            },
            _ => Error::io(path, e),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        boxes.push(parse_line(&line).map_err(|message| Error::InputFormat {
            path: path.to_path_buf(),
            line: idx + 1,
            message,
        })?);
    }

    Ok(boxes)
}

fn parse_line(line: &str) -> std::result::Result<RawBox, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 5 {
        return Err(format!(
            "expected an index and 4 coordinates, found {} fields",
            fields.len()
        ));
    }

    let mut coords = [0i64; 4];
    for (slot, field) in coords.iter_mut().zip(&fields[1..5]) {
        let value: f64 = field
            .parse()
            .map_err(|_| format!("'{}' is not a number", field))?;
        if !value.is_finite() {
            return Err(format!("'{}' is not a finite number", field));
        }
        // truncation toward zero, not rounding
        *slot = value.trunc() as i64;
    }

    Ok(RawBox::new(coords[0], coords[1], coords[2], coords[3]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> Result<Vec<RawBox>> {
        parse_measurements(Cursor::new(text), Path::new("test.txt"))
    }

    #[test]
    fn test_skips_two_header_lines() {
        let boxes = parse(" \tBX\tBY\tWidth\tHeight\nunits: pixel\n1 20 10 40 20\n2 0 0 5 5\n")
            .unwrap();
        assert_eq!(boxes, vec![RawBox::new(20, 10, 40, 20), RawBox::new(0, 0, 5, 5)]);
    }

    #[test]
    fn test_header_is_skipped_even_if_numeric() {
        let boxes = parse("1 1 1 1 1\n2 2 2 2 2\n3 3 3 3 3\n").unwrap();
        assert_eq!(boxes, vec![RawBox::new(3, 3, 3, 3)]);
    }

    #[test]
    fn test_truncates_floats_toward_zero() {
        let boxes = parse("h\nh\n1 12.9 7.5 3.99 -0.7\n").unwrap();
        assert_eq!(boxes, vec![RawBox::new(12, 7, 3, 0)]);
    }

    #[test]
    fn test_blank_lines_and_extra_fields() {
        let boxes = parse("h\nh\n\n1 1 2 3 4 99.5\n   \n2 5 6 7 8\n").unwrap();
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0], RawBox::new(1, 2, 3, 4));
    }

    #[test]
    fn test_missing_index_is_rejected() {
        let err = parse("h\nh\n20 10 40 20\n").unwrap_err();
        match err {
            Error::InputFormat { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_numeric_is_rejected() {
        assert!(matches!(
            parse("h\nh\n1 20 ten 40 20\n"),
            Err(Error::InputFormat { .. })
        ));
    }

    #[test]
    fn test_invalid_utf8_is_input_format() {
        let err = parse_measurements(Cursor::new(&b"h\nh\n1 2 3 \xff 5\n"[..]), Path::new("m.txt"))
            .unwrap_err();
        match err {
            Error::InputFormat { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_headers_only() {
        assert!(parse("h\nh\n").unwrap().is_empty());
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = read_measurements(Path::new("/nonexistent/measure.txt")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }
}
