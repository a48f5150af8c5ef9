use thiserror::Error;
use tracing::warn;

use crate::WorldOffset;
use crate::grid::GridState;
use crate::parse_util;
use crate::parse_util::ConvertError;
use crate::parse_util::ParseError;
use crate::rule_set;
use crate::rule_set::RuleError;
use crate::rule_set::RuleSet;

#[derive(Debug, Default)]
pub struct RleFile<'a> {
    pub name: Option<&'a [u8]>,
    pub author: Option<&'a [u8]>,

    /// Width and height announced by the header. Informational only.
    pub size: Option<(u64, u64)>,

    pub set: RuleSet,
}

#[derive(Debug, Error)]
pub enum RleError {
    #[error("Comment line error: {0}")]
    CommentLine(#[from] RleCommentLineError),

    #[error("Header line error: {0}")]
    HeaderLine(#[from] RleHeaderLineError),

    #[error("Encoding error: {0}")]
    Encoding(#[from] RleEncodingError),
}

/// Parse the RLE file format, calling `f` with the position of every live cell. Assumes the bytes
/// are valid ASCII.
///
/// The first row is `y = 0` and every following row is one lower. The first column is `x = 0`.
/// The `x = .., y = ..` header is optional, and so is the trailing `!`.
///
/// See: https://conwaylife.com/wiki/Run_Length_Encoded
pub fn read_rle<F>(mut bytes: &'_ [u8], f: F) -> Result<RleFile<'_>, RleError>
where
    F: FnMut(WorldOffset, WorldOffset),
{
    let mut file = RleFile::default();

    // Parse as many comment lines as possible
    loop {
        bytes = parse_util::take_ws(bytes);

        let res = read_line_comment(bytes)?;
        let (Some(line), rest) = res else { break };

        match line {
            RleCommentLine::Comment => {}
            RleCommentLine::Name { name } => {
                if file.name.is_some() {
                    warn!("RLE file name already defined. Using latest");
                }

                file.name = Some(name);
            }
            RleCommentLine::Author { author } => {
                if file.author.is_some() {
                    warn!("RLE author already defined. Using latest");
                }

                file.author = Some(author);
            }
            RleCommentLine::RuleSet { set } => {
                file.set = set;
            }
        }

        bytes = rest;
    }

    // Parse header line, if it's present
    let res = read_line_header(bytes)?;
    if let (Some(header), rest) = res {
        let RleHeaderLine { width, height, set } = header;

        if let Some(set) = set {
            if file.set != set {
                warn!(%set, "RLE header rule overrides comment rule");
            }

            file.set = set;
        }

        file.size = Some((width, height));
        bytes = rest;
    }

    read_encoding(bytes, f)?;

    Ok(file)
}

/// A pattern read into a ready-to-run [`GridState`].
#[derive(Debug)]
pub struct Pattern {
    pub name: Option<String>,
    pub author: Option<String>,
    pub grid: GridState,
}

/// Read an RLE pattern into its initial generation, under the rules the file asks for.
pub fn read_pattern(bytes: &[u8]) -> Result<Pattern, RleError> {
    let mut cells = Vec::new();
    let file = read_rle(bytes, |x, y| cells.push((x, y)))?;

    let text = |b: &[u8]| String::from_utf8_lossy(b).trim().to_string();

    Ok(Pattern {
        name: file.name.map(text),
        author: file.author.map(text),
        grid: GridState::with_rules(cells, file.set),
    })
}

enum RleCommentLine<'a> {
    Comment,
    Name { name: &'a [u8] },
    Author { author: &'a [u8] },
    RuleSet { set: RuleSet },
}

#[derive(Debug, Error)]
pub enum RleCommentLineError {
    #[error("Empty name line")]
    EmptyName,

    #[error("Empty author line")]
    EmptyAuthor,

    #[error("Invalid rule: {0}")]
    InvalidRule(#[from] RuleError),
}

/// Attempt to parse a comment line, otherwise leaves `bytes` as-is.
///
/// Only name, author and rule lines carry anything we keep. Every other kind of comment,
/// including ones we don't know, is skipped.
fn read_line_comment(
    bytes: &'_ [u8],
) -> Result<(Option<RleCommentLine<'_>>, &'_ [u8]), RleCommentLineError> {
    let Ok(bytes) = parse_util::expect(b'#', bytes) else {
        return Ok((None, bytes));
    };

    let (line, rest) = parse_util::take_line(bytes);
    let (kind, line) = parse_util::take_1(line);
    let line = parse_util::take_ws(line);

    match kind {
        // Pattern name
        Some(b'N') => {
            if line.is_empty() {
                return Err(RleCommentLineError::EmptyName);
            }

            Ok((Some(RleCommentLine::Name { name: line }), rest))
        }

        // Pattern author
        Some(b'O') => {
            if line.is_empty() {
                return Err(RleCommentLineError::EmptyAuthor);
            }

            Ok((Some(RleCommentLine::Author { author: line }), rest))
        }

        // Pattern rules, either `23/3` or `B3/S23`
        Some(b'r') => {
            let (set, _) = match parse_util::peek_1(line) {
                Some(b'b' | b'B') => rule_set::parse_rule(line)?,
                _ => rule_set::parse_nameless_rule(line)?,
            };

            Ok((Some(RleCommentLine::RuleSet { set }), rest))
        }

        _ => Ok((Some(RleCommentLine::Comment), rest)),
    }
}

struct RleHeaderLine {
    width: u64,
    height: u64,
    set: Option<RuleSet>,
}

#[derive(Debug, Error)]
pub enum RleHeaderLineError {
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    #[error("Expected {axis} size, found end of line")]
    MissingSize { axis: char },

    #[error("Failed to parse {axis} size: {source}")]
    InvalidSize {
        axis: char,
        #[source]
        source: ConvertError,
    },

    #[error("Invalid rule: {0}")]
    InvalidRule(#[from] RuleError),

    #[error("Unexpected trailing input \"{got}\"")]
    Trailing { got: String },
}

/// Attempt to parse a header line (`x = 3, y = 3, rule = B3/S23`), otherwise leaves `bytes` as-is.
fn read_line_header(bytes: &[u8]) -> Result<(Option<RleHeaderLine>, &[u8]), RleHeaderLineError> {
    if parse_util::peek_1(bytes) != Some(b'x') {
        return Ok((None, bytes));
    }

    let (line, rest) = parse_util::take_line(bytes);

    let (width, line) = read_size(b'x', line)?;
    let line = parse_util::take_ws(parse_util::expect(b',', line)?);
    let (height, line) = read_size(b'y', line)?;

    let (set, line) = match parse_util::take_1(line) {
        (Some(b','), line) => {
            let line = parse_util::take_ws(line);
            let line = parse_util::expect_slice(b"rule", line)?;
            let line = parse_util::take_ws(line);
            let line = parse_util::expect(b'=', line)?;
            let line = parse_util::take_ws(line);

            let (set, line) = rule_set::parse_rule(line)?;

            (Some(set), line)
        }
        _ => (None, line),
    };

    let line = parse_util::take_ws(line);
    if !line.is_empty() {
        return Err(RleHeaderLineError::Trailing {
            got: String::from_utf8_lossy(line).to_string(),
        });
    }

    let header = RleHeaderLine {
        width,
        height,
        set,
    };

    Ok((Some(header), rest))
}

/// Parse `<axis> = <n>`, stopping before the `,` that ends it.
fn read_size(axis: u8, bytes: &[u8]) -> Result<(u64, &[u8]), RleHeaderLineError> {
    let bytes = parse_util::expect(axis, bytes)?;
    let bytes = parse_util::take_ws(bytes);
    let bytes = parse_util::expect(b'=', bytes)?;
    let bytes = parse_util::take_ws(bytes);

    let (Some(n), bytes) = parse_util::take_until(b',', bytes) else {
        return Err(RleHeaderLineError::MissingSize { axis: axis as char });
    };

    let n = parse_util::convert(n.trim_ascii()).map_err(|source| {
        RleHeaderLineError::InvalidSize {
            axis: axis as char,
            source,
        }
    })?;

    Ok((n, bytes))
}

#[derive(Debug, Error)]
pub enum RleEncodingError {
    #[error("Failed to convert run length: {0}")]
    RunLength(#[from] ConvertError),

    #[error("Run length must be at least 1")]
    ZeroRunLength,

    #[error("Run length {rep} is not followed by a cell or row")]
    DanglingRunLength { rep: WorldOffset },

    #[error("Run length moves past the edge of the world")]
    RunLengthOverflow,

    #[error("Unrecognized byte: 0x{got:0X}")]
    UnrecognizedByte { got: u8 },
}

fn read_encoding<F>(mut bytes: &[u8], mut f: F) -> Result<(), RleEncodingError>
where
    F: FnMut(WorldOffset, WorldOffset),
{
    let mut rep: Option<WorldOffset> = None;

    let (mut x, mut y): (WorldOffset, WorldOffset) = (0, 0);

    loop {
        let Some(b) = parse_util::peek_1(bytes) else {
            break;
        };

        match b {
            b'!' => break,

            // Dead cells
            b'b' => {
                let n = rep.take().unwrap_or(1);
                x = x.checked_add(n).ok_or(RleEncodingError::RunLengthOverflow)?;
            }

            // Live cells
            b'o' => {
                let n = rep.take().unwrap_or(1);
                let end = x.checked_add(n).ok_or(RleEncodingError::RunLengthOverflow)?;

                for x in x..end {
                    f(x, y)
                }

                x = end;
            }

            // End of row(s)
            b'$' => {
                let n = rep.take().unwrap_or(1);
                y = y.checked_sub(n).ok_or(RleEncodingError::RunLengthOverflow)?;
                x = 0;
            }

            n if n.is_ascii_digit() => {
                if let Some(rep) = rep {
                    return Err(RleEncodingError::DanglingRunLength { rep });
                }

                let (Some(n), rest) = parse_util::take_until_fn(|b| !b.is_ascii_digit(), bytes)
                else {
                    unreachable!("We peeked and found a digit")
                };
                bytes = rest;

                let n: WorldOffset = parse_util::convert(n)?;
                if n == 0 {
                    return Err(RleEncodingError::ZeroRunLength);
                }

                rep = Some(n);
                continue;
            }

            w if w.is_ascii_whitespace() => {
                if let Some(rep) = rep {
                    return Err(RleEncodingError::DanglingRunLength { rep });
                }
            }

            b => return Err(RleEncodingError::UnrecognizedByte { got: b }),
        }

        let (_, rest) = parse_util::take_1(bytes);
        bytes = rest;
    }

    if let Some(rep) = rep {
        return Err(RleEncodingError::DanglingRunLength { rep });
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::RleEncodingError;
    use super::RleError;
    use crate::Pos;
    use crate::rule_set::B3S23;
    use crate::rule_set::RuleSet;

    fn cells(bytes: &[u8]) -> HashSet<Pos> {
        let mut cells = HashSet::new();
        super::read_rle(bytes, |x, y| {
            cells.insert((x, y));
        })
        .unwrap();

        cells
    }

    #[test]
    fn read_header() {
        let bytes = b"x = 1, y = 1\n";
        let (header, rest) = super::read_line_header(bytes.as_slice()).unwrap();
        let header = header.unwrap();

        assert_eq!((header.width, header.height), (1, 1));
        assert!(header.set.is_none());
        assert_eq!(rest, b"");
    }

    #[test]
    fn vertical_bar_without_header() {
        assert_eq!(
            cells(b"o$o$o!"),
            [(0, 0), (0, -1), (0, -2)].into_iter().collect()
        );
    }

    #[test]
    fn runs_and_row_skips() {
        assert_eq!(
            cells(b"2bo$\n3o2$obo"),
            [(2, 0), (0, -1), (1, -1), (2, -1), (0, -3), (2, -3)]
                .into_iter()
                .collect()
        );
    }

    #[test]
    fn comments_and_header() {
        let bytes = b"#N Glider\r\n#O Richard K. Guy\n#C The smallest spaceship\n\
                      x = 3, y = 3, rule = B36/S23\r\nbo$2bo$3o!\n";

        let mut n = 0;
        let file = super::read_rle(bytes, |_, _| n += 1).unwrap();

        assert_eq!(n, 5);
        assert_eq!(file.name, Some(b"Glider".as_slice()));
        assert_eq!(file.author, Some(b"Richard K. Guy".as_slice()));
        assert_eq!(file.size, Some((3, 3)));
        assert_eq!(file.set, RuleSet::new(0b100_1000, 0b1100).unwrap());
    }

    #[test]
    fn comment_rule() {
        let file = super::read_rle(b"#r 23/36\nbo!", |_, _| {}).unwrap();

        assert_eq!(file.set, RuleSet::new(0b100_1000, 0b1100).unwrap());
    }

    #[test]
    fn default_rules() {
        let pattern = super::read_pattern(b"x = 2, y = 2\n2o$2o!").unwrap();

        assert_eq!(pattern.grid.rules(), B3S23);
        assert_eq!(pattern.grid.len(), 4);
        assert_eq!(pattern.name, None);
    }

    #[test]
    fn errors() {
        assert!(matches!(
            super::read_rle(b"3o2", |_, _| {}),
            Err(RleError::Encoding(RleEncodingError::DanglingRunLength { rep: 2 }))
        ));
        assert!(matches!(
            super::read_rle(b"3\no!", |_, _| {}),
            Err(RleError::Encoding(RleEncodingError::DanglingRunLength { rep: 3 }))
        ));
        assert!(matches!(
            super::read_rle(b"0o!", |_, _| {}),
            Err(RleError::Encoding(RleEncodingError::ZeroRunLength))
        ));
        assert!(matches!(
            super::read_rle(b"bzo!", |_, _| {}),
            Err(RleError::Encoding(RleEncodingError::UnrecognizedByte { got: b'z' }))
        ));
        assert!(matches!(
            super::read_rle(b"x = 3, y = 3, rule = B03/S23\no!", |_, _| {}),
            Err(RleError::HeaderLine(_))
        ));
        assert!(matches!(
            super::read_rle(b"#N\no!", |_, _| {}),
            Err(RleError::CommentLine(_))
        ));
    }

    #[test]
    fn run_length_out_of_range() {
        assert!(matches!(
            super::read_rle(b"9223372036854775808bo!", |_, _| {}),
            Err(RleError::Encoding(RleEncodingError::RunLength(_)))
        ));
        assert!(matches!(
            super::read_rle(b"9223372036854775807b2bo!", |_, _| {}),
            Err(RleError::Encoding(RleEncodingError::RunLengthOverflow))
        ));
        assert!(matches!(
            super::read_rle(b"o9223372036854775807o!", |_, _| {}),
            Err(RleError::Encoding(RleEncodingError::RunLengthOverflow))
        ));
        assert!(matches!(
            super::read_rle(b"9223372036854775807$2$o!", |_, _| {}),
            Err(RleError::Encoding(RleEncodingError::RunLengthOverflow))
        ));
    }

    #[test]
    fn ignores_after_bang() {
        assert_eq!(cells(b"o!\nthis is trailing text"), [(0, 0)].into_iter().collect());
    }
}
