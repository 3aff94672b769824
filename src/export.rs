//! PatternPaint "Arduino export" reader.
//!
//! The export is a C header: one opening line, then for every frame a
//! `// frame` comment followed by one `r,g,b,` line per pixel, then three
//! closing lines.

use std::fs;
use std::path::Path;

use crate::animation::{Frame, Pattern};
use crate::error::{Error, Result};
use crate::pixel::{Color, Pixel};

const HEADER_LINES: usize = 1;
const FOOTER_LINES: usize = 3;

/// Read an export file into a pattern.
pub fn load(path: impl AsRef<Path>) -> Result<Pattern> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text)
}

/// Parse the text of an export into a pattern.
pub fn parse(text: &str) -> Result<Pattern> {
    let lines: Vec<&str> = text.lines().collect();
    let end = lines.len().saturating_sub(FOOTER_LINES);

    let mut pattern: Pattern = Vec::new();
    for (index, line) in lines.iter().enumerate().take(end).skip(HEADER_LINES) {
        let number = index + 1;
        if line.starts_with("//") {
            pattern.push(Frame::new());
            continue;
        }
        let pixel = parse_pixel(line).map_err(|message| Error::Export {
            line: number,
            message,
        })?;
        match pattern.last_mut() {
            Some(frame) => frame.push(pixel),
            None => {
                return Err(Error::Export {
                    line: number,
                    message: "pixel data before the first frame".to_string(),
                })
            }
        }
    }
    Ok(pattern)
}

fn parse_pixel(line: &str) -> std::result::Result<Pixel, String> {
    let mut values = line
        .trim()
        .trim_end_matches(',')
        .split(',')
        .map(|v| v.trim().parse::<u8>());

    let mut next = || match values.next() {
        Some(Ok(v)) => Ok(v),
        Some(Err(e)) => Err(format!("invalid component in {:?}: {}", line, e)),
        None => Err(format!("expected r,g,b in {:?}", line)),
    };
    let (r, g, b) = (next()?, next()?, next()?);

    if values.next().is_some() {
        return Err(format!("too many components in {:?}", line));
    }
    Ok(Pixel::new(Color::new(r, g, b)))
}
