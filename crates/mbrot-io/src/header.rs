//! PPM (P6) header carrying the viewport as a comment.
//!
//! Layout, one field per newline-terminated line:
//!
//! ```text
//! P6
//! # Mandelbrot image: x0 = <x0> y0 = <y0> k = <increment> width = <w> height = <h> depth = <d>
//! <w> <h>
//! 255
//! ```
//!
//! Floats use Rust's shortest round-trip formatting, so the header length
//! depends on the values and must always be measured, never assumed.
//!
//! This is not byte-compatible with renderers that print the comment with
//! C `%f` (six fixed decimals): `-2` here is `-2.000000` there, and values
//! below `1e-6` such as `1e-9` print as `0.000000` there but keep their
//! digits here. Parsing accepts both forms.

use mbrot_core::Viewport;

use crate::{SinkError, SinkResult};

const MAGIC: &str = "P6";
const COMMENT_PREFIX: &str = "# Mandelbrot image:";
const MAX_VALUE: &str = "255";
const HEADER_LINES: usize = 4;

/// Formats the artifact header for `viewport`.
///
/// The x0, y0 and increment fields are the shortest text that parses back to
/// the same `f64`, not C `%f` output. See the module docs.
///
/// ```rust
/// use mbrot_core::Viewport;
/// use mbrot_io::format_header;
///
/// let vp = Viewport::new(4, 2, 10, -2.0, 1.0, 0.5).unwrap();
/// let header = format_header(&vp);
/// assert!(header.contains("x0 = -2 y0 = 1 k = 0.5 "));
/// assert!(header.ends_with("4 2\n255\n"));
/// ```
pub fn format_header(viewport: &Viewport) -> String {
    format!(
        "{MAGIC}\n{COMMENT_PREFIX} x0 = {} y0 = {} k = {} width = {} height = {} depth = {}\n{} {}\n{MAX_VALUE}\n",
        viewport.x0(),
        viewport.y0(),
        viewport.increment(),
        viewport.width(),
        viewport.height(),
        viewport.depth(),
        viewport.width(),
        viewport.height(),
    )
}

/// Parses a header from the start of `bytes`.
///
/// Returns the viewport and the header length in bytes (the offset of the
/// first pixel byte).
pub fn parse_header(bytes: &[u8]) -> SinkResult<(Viewport, usize)> {
    let mut lines = Vec::with_capacity(HEADER_LINES);
    let mut start = 0;
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'\n' {
            lines.push(&bytes[start..i]);
            start = i + 1;
            if lines.len() == HEADER_LINES {
                break;
            }
        }
    }
    if lines.len() < HEADER_LINES {
        return Err(invalid("truncated header"));
    }
    let header_len = start;

    let text: Vec<&str> = lines
        .iter()
        .map(|l| std::str::from_utf8(l).map_err(|_| invalid("header is not UTF-8")))
        .collect::<SinkResult<_>>()?;

    if text[0] != MAGIC {
        return Err(invalid(format!("expected magic {MAGIC}, found {:?}", text[0])));
    }
    if text[3] != MAX_VALUE {
        return Err(invalid(format!("expected max value {MAX_VALUE}, found {:?}", text[3])));
    }

    let fields = text[1]
        .strip_prefix(COMMENT_PREFIX)
        .ok_or_else(|| invalid("missing viewport comment"))?;
    let comment = CommentFields::parse(fields)?;

    let (w, h) = text[2]
        .split_once(' ')
        .ok_or_else(|| invalid("malformed size line"))?;
    let width: u32 = parse_num("width", w)?;
    let height: u32 = parse_num("height", h)?;
    if (width, height) != (comment.width, comment.height) {
        return Err(invalid(format!(
            "size line {width}x{height} disagrees with comment {}x{}",
            comment.width, comment.height
        )));
    }

    let viewport = Viewport::new(
        comment.width,
        comment.height,
        comment.depth,
        comment.x0,
        comment.y0,
        comment.increment,
    )
    .map_err(|e| invalid(e.to_string()))?;

    Ok((viewport, header_len))
}

/// Values pulled out of the `# Mandelbrot image:` line.
struct CommentFields {
    x0: f64,
    y0: f64,
    increment: f64,
    width: u32,
    height: u32,
    depth: u32,
}

impl CommentFields {
    fn parse(fields: &str) -> SinkResult<Self> {
        let tokens: Vec<&str> = fields.split_whitespace().collect();
        if tokens.len() != 18 {
            return Err(invalid(format!("expected 6 comment fields, found {} tokens", tokens.len())));
        }

        let mut values = [""; 6];
        const KEYS: [&str; 6] = ["x0", "y0", "k", "width", "height", "depth"];
        for (slot, (chunk, key)) in values.iter_mut().zip(tokens.chunks(3).zip(KEYS)) {
            if chunk[0] != key || chunk[1] != "=" {
                return Err(invalid(format!("expected `{key} =`, found `{} {}`", chunk[0], chunk[1])));
            }
            *slot = chunk[2];
        }

        Ok(Self {
            x0: parse_num("x0", values[0])?,
            y0: parse_num("y0", values[1])?,
            increment: parse_num("k", values[2])?,
            width: parse_num("width", values[3])?,
            height: parse_num("height", values[4])?,
            depth: parse_num("depth", values[5])?,
        })
    }
}

fn parse_num<T: std::str::FromStr>(field: &str, value: &str) -> SinkResult<T> {
    value
        .parse()
        .map_err(|_| invalid(format!("{field}: cannot parse {value:?}")))
}

fn invalid(msg: impl Into<String>) -> SinkError {
    SinkError::InvalidHeader(msg.into())
}
