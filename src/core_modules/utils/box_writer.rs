// Line-oriented persistence for detected boxes: one box per line,
// `x1 y1 x2 y2`, separated by single spaces.

use crate::core_modules::bounding_box::BoundingBox;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes `boxes` to `writer`, one newline-terminated line per box.
pub fn write_boxes<W: Write>(boxes: &[BoundingBox], mut writer: W) -> Result<()> {
    for b in boxes {
        writeln!(writer, "{} {} {} {}", b.x1, b.y1, b.x2, b.y2)?;
    }
    writer.flush()?;
    Ok(())
}

/// Creates (or truncates) the file at `path` and writes `boxes` to it. An empty
/// slice still leaves an empty file behind, so every processed frame has one.
pub fn save_boxes<P: AsRef<Path>>(boxes: &[BoundingBox], path: P) -> Result<()> {
    let file = File::create(path)?;
    write_boxes(boxes, BufWriter::new(file))
}

/// Parses text produced by `write_boxes`. Blank lines are skipped.
pub fn parse_boxes(text: &str) -> Result<Vec<BoundingBox>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            parse_line(line).map_err(|reason| {
                Error::InvalidArgument(format!("box line {}: {reason}: {line:?}", index + 1))
            })
        })
        .collect()
}

fn parse_line(line: &str) -> std::result::Result<BoundingBox, String> {
    let fields = line
        .split_whitespace()
        .map(|field| field.parse::<i32>().map_err(|err| err.to_string()))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let [x1, y1, x2, y2] = fields[..] else {
        return Err(format!("expected 4 fields, found {}", fields.len()));
    };
    BoundingBox::try_new(x1, y1, x2, y2).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_line_per_box() {
        let boxes = [BoundingBox::new(0, 0, 80, 40), BoundingBox::new(-5, 3, 10, 12)];
        let mut out = Vec::new();
        write_boxes(&boxes, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0 0 80 40\n-5 3 10 12\n");
    }

    #[test]
    fn parses_written_boxes_and_skips_blank_lines() {
        let parsed = parse_boxes("0 0 80 40\n\n  -5 3 10 12  \n").unwrap();
        assert_eq!(
            parsed,
            vec![BoundingBox::new(0, 0, 80, 40), BoundingBox::new(-5, 3, 10, 12)]
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(matches!(parse_boxes("1 2 3"), Err(Error::InvalidArgument(_))));
        assert!(matches!(parse_boxes("1 2 3 x"), Err(Error::InvalidArgument(_))));
        assert!(matches!(parse_boxes("10 0 5 5"), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn parses_extreme_coordinates() {
        let parsed = parse_boxes("-2147483648 0 2147483647 10").unwrap();
        assert_eq!(parsed, vec![BoundingBox::new(i32::MIN, 0, i32::MAX, 10)]);
        assert_eq!(parsed[0].width(), u32::MAX as i64);
    }

    #[test]
    fn save_boxes_creates_a_file_even_when_empty() {
        let dir = std::env::temp_dir().join(format!("motion_boxes_writer_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let empty = dir.join("empty.txt");
        save_boxes(&[], &empty).expect("Error Saving File.");
        assert_eq!(std::fs::read_to_string(&empty).unwrap(), "");

        let full = dir.join("full.txt");
        let boxes = vec![BoundingBox::new(1, 2, 3, 4)];
        save_boxes(&boxes, &full).expect("Error Saving File.");
        assert_eq!(parse_boxes(&std::fs::read_to_string(&full).unwrap()).unwrap(), boxes);

        std::fs::remove_dir_all(&dir).ok();
    }
}
