//! Operations within a CIGAR string.

use std::iter::Peekable;
use std::num::ParseIntError;
use std::str::CharIndices;

/// The characters that may make up the count of an operation.
///
/// Signs are accepted while scanning so that a negative count is reported as
/// such rather than as an unknown operation.
const COUNT_CHARACTERS: &str = "+-0123456789";

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to the parsing of a CIGAR operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// An operation was missing its count.
    ///
    /// The inner value is the byte offset of the operation.
    MissingCount(usize),

    /// A count was not followed by an operation.
    MissingOperation,

    /// The count could not be parsed.
    InvalidCount(ParseIntError),

    /// The count was negative.
    NegativeCount(i64),

    /// The operation character is not a known CIGAR operation.
    UnknownOperation(char),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::MissingCount(offset) => {
                write!(f, "operation at offset {offset} is missing a count")
            }
            ParseError::MissingOperation => write!(f, "count is missing an operation"),
            ParseError::InvalidCount(err) => write!(f, "invalid count: {err}"),
            ParseError::NegativeCount(count) => write!(f, "negative count: {count}"),
            ParseError::UnknownOperation(c) => write!(f, "unknown operation: `{c}`"),
        }
    }
}

impl std::error::Error for ParseError {}

////////////////////////////////////////////////////////////////////////////////////////
// Kinds
////////////////////////////////////////////////////////////////////////////////////////

/// The kind of a CIGAR operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Kind {
    /// An alignment match or mismatch (`M`, `=`, or `X`).
    Match,

    /// An insertion relative to the reference (`I`).
    Insertion,

    /// A deletion or skipped region in the reference (`D` or `N`).
    Deletion,

    /// A soft clip (`S`).
    SoftClip,

    /// A hard clip (`H`).
    HardClip,

    /// Padding (`P`).
    Padding,
}

impl Kind {
    /// Whether this kind of operation consumes query or reference positions.
    pub fn is_consuming(&self) -> bool {
        matches!(self, Kind::Match | Kind::Insertion | Kind::Deletion)
    }
}

impl TryFrom<char> for Kind {
    type Error = ParseError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            'M' | '=' | 'X' => Ok(Kind::Match),
            'I' => Ok(Kind::Insertion),
            'D' | 'N' => Ok(Kind::Deletion),
            'S' => Ok(Kind::SoftClip),
            'H' => Ok(Kind::HardClip),
            'P' => Ok(Kind::Padding),
            c => Err(ParseError::UnknownOperation(c)),
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Match => write!(f, "match"),
            Kind::Insertion => write!(f, "insertion"),
            Kind::Deletion => write!(f, "deletion"),
            Kind::SoftClip => write!(f, "soft clip"),
            Kind::HardClip => write!(f, "hard clip"),
            Kind::Padding => write!(f, "padding"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Operations
////////////////////////////////////////////////////////////////////////////////////////

/// A single CIGAR operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Op {
    /// The kind of operation.
    kind: Kind,

    /// The number of positions the operation covers.
    count: usize,
}

impl Op {
    /// Creates a new [`Op`].
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::cigar::op::Kind;
    /// use proteos::cigar::op::Op;
    ///
    /// let op = Op::new(Kind::Match, 3);
    /// assert_eq!(op.kind(), Kind::Match);
    /// assert_eq!(op.count(), 3);
    /// ```
    pub fn new(kind: Kind, count: usize) -> Self {
        Self { kind, count }
    }

    /// Gets the kind of the operation.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Gets the count of the operation.
    pub fn count(&self) -> usize {
        self.count
    }
}

/// An iterator over the operations within a CIGAR string.
#[derive(Debug)]
pub struct Ops<'a> {
    /// The CIGAR string.
    cigar: &'a str,

    /// The characters of the CIGAR string.
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Ops<'a> {
    /// Creates a new [`Ops`] over a CIGAR string.
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::cigar::op::Kind;
    /// use proteos::cigar::op::Op;
    /// use proteos::cigar::op::Ops;
    ///
    /// let ops = Ops::new("2S3M").collect::<Result<Vec<_>, _>>()?;
    /// assert_eq!(ops, vec![Op::new(Kind::SoftClip, 2), Op::new(Kind::Match, 3)]);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(cigar: &'a str) -> Self {
        Self {
            cigar,
            chars: cigar.char_indices().peekable(),
        }
    }
}

impl Iterator for Ops<'_> {
    type Item = Result<Op, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (start, _) = *self.chars.peek()?;
        let mut end = start;

        while let Some((i, c)) = self.chars.peek().copied() {
            if !COUNT_CHARACTERS.contains(c) {
                break;
            }

            end = i + c.len_utf8();
            self.chars.next();
        }

        if end == start {
            // Skip the offending character so that iteration always advances.
            self.chars.next();
            return Some(Err(ParseError::MissingCount(start)));
        }

        let code = match self.chars.next() {
            Some((_, c)) => c,
            None => return Some(Err(ParseError::MissingOperation)),
        };

        let count = match self.cigar[start..end].parse::<i64>() {
            Ok(count) => count,
            Err(err) => return Some(Err(ParseError::InvalidCount(err))),
        };

        let count = match usize::try_from(count) {
            Ok(count) => count,
            Err(_) => return Some(Err(ParseError::NegativeCount(count))),
        };

        Some(Kind::try_from(code).map(|kind| Op::new(kind, count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_tokenizes_every_operation_kind() -> Result<(), Box<dyn std::error::Error>> {
        let ops = Ops::new("1M2=3X4I5D6N7S8H9P").collect::<Result<Vec<_>, _>>()?;
        let kinds = ops.iter().map(|op| op.kind()).collect::<Vec<_>>();

        assert_eq!(
            kinds,
            vec![
                Kind::Match,
                Kind::Match,
                Kind::Match,
                Kind::Insertion,
                Kind::Deletion,
                Kind::Deletion,
                Kind::SoftClip,
                Kind::HardClip,
                Kind::Padding,
            ]
        );
        assert_eq!(
            ops.iter().map(|op| op.count()).collect::<Vec<_>>(),
            (1..=9).collect::<Vec<_>>()
        );

        Ok(())
    }

    #[test]
    fn missing_count() {
        let err = Ops::new("M").next().unwrap().unwrap_err();
        assert_eq!(err, ParseError::MissingCount(0));
        assert_eq!(err.to_string(), "operation at offset 0 is missing a count");
    }

    #[test]
    fn missing_operation() {
        let err = Ops::new("3M4").nth(1).unwrap().unwrap_err();
        assert_eq!(err, ParseError::MissingOperation);
    }

    #[test]
    fn negative_count() {
        let err = Ops::new("-2M").next().unwrap().unwrap_err();
        assert_eq!(err, ParseError::NegativeCount(-2));
    }

    #[test]
    fn unknown_operation() {
        let err = Ops::new("3Q").next().unwrap().unwrap_err();
        assert_eq!(err, ParseError::UnknownOperation('Q'));
        assert_eq!(err.to_string(), "unknown operation: `Q`");
    }
}
