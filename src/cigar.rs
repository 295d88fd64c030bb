//! Mapping CIGAR strings onto reference coordinates.
//!
//! A CIGAR string describes how a query sequence (here, a variant protein)
//! aligns to a reference sequence (here, the reference protein). The
//! facilities in this module turn such a string into a table that, for each
//! query position, holds the reference coordinate consumed by that position
//! (or [`None`] when the query position is an insertion).

use crate::cigar::op::Kind;
use crate::cigar::op::Ops;

pub mod op;

/// The CIGAR value used when the alignment of a variant is not known.
pub const UNKNOWN: &str = "???";

/// The most query positions a CIGAR string may describe.
///
/// This is well beyond the length of any known protein.
pub const MAX_POSITIONS: usize = 1 << 20;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to mapping a CIGAR string.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// The CIGAR string could not be parsed.
    Parse(op::ParseError),

    /// A consuming operation (or a soft clip following a hard clip) was found
    /// after the trailing clip of the alignment had started.
    OrderViolation(Kind),

    /// An operation moved a coordinate past the largest representable value.
    Overflow(Kind),

    /// The CIGAR string describes more than [`MAX_POSITIONS`] query positions.
    TooLong,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Parse(err) => write!(f, "parse error: {err}"),
            Error::OrderViolation(kind) => {
                write!(f, "{kind} operation found after the alignment was clipped")
            }
            Error::Overflow(kind) => write!(f, "{kind} operation overflows the coordinates"),
            Error::TooLong => write!(f, "cigar describes more than {MAX_POSITIONS} positions"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

/// An error related to building the position table for a single match.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TableError {
    /// The CIGAR string is [`UNKNOWN`].
    Unknown,

    /// The CIGAR string could not be mapped.
    Cigar(Error),

    /// The CIGAR string contains soft clips, which are not valid for a
    /// protein-to-protein alignment.
    SoftClip,

    /// The match extends past the end of the CIGAR string.
    TooShort {
        /// The number of positions described by the CIGAR string.
        found: usize,

        /// The end of the match.
        expected: usize,
    },
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::Unknown => write!(f, "missing cigar"),
            TableError::Cigar(err) => write!(f, "{err}"),
            TableError::SoftClip => write!(f, "soft clip in protein cigar"),
            TableError::TooShort { found, expected } => write!(
                f,
                "search reports match beyond end of the cigar: cigar covers {found} positions, \
                 match ends at {expected}"
            ),
        }
    }
}

impl std::error::Error for TableError {}

////////////////////////////////////////////////////////////////////////////////////////
// Mapping
////////////////////////////////////////////////////////////////////////////////////////

/// The reference coordinates consumed by each position of a query.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Mapping {
    /// The number of soft clipped positions before the alignment.
    soft_clip_start: usize,

    /// The number of soft clipped positions after the alignment.
    soft_clip_end: usize,

    /// The reference coordinate for each query position.
    positions: Vec<Option<usize>>,
}

impl Mapping {
    /// Gets the number of soft clipped positions at the start of the alignment.
    pub fn soft_clip_start(&self) -> usize {
        self.soft_clip_start
    }

    /// Gets the number of soft clipped positions at the end of the alignment.
    pub fn soft_clip_end(&self) -> usize {
        self.soft_clip_end
    }

    /// Gets the reference coordinate for each query position.
    pub fn positions(&self) -> &[Option<usize>] {
        &self.positions
    }

    /// Consumes `self` and returns the reference coordinate for each query
    /// position.
    pub fn into_positions(self) -> Vec<Option<usize>> {
        self.positions
    }

    /// Whether any positions were soft clipped.
    pub fn is_soft_clipped(&self) -> bool {
        self.soft_clip_start > 0 || self.soft_clip_end > 0
    }
}

/// Maps a CIGAR string onto reference coordinates starting at `start`.
///
/// Match operations (`M`, `=`, `X`) append consecutive reference coordinates,
/// insertions (`I`) append [`None`], and deletions (`D`, `N`) advance the
/// reference without appending. Clips must only appear at the ends of the
/// alignment and padding (`P`) is ignored. At most [`MAX_POSITIONS`] query
/// positions are mapped.
///
/// # Examples
///
/// ```
/// let mapping = proteos::cigar::reference_positions(0, "2S3M1I2S")?;
///
/// assert_eq!(mapping.soft_clip_start(), 2);
/// assert_eq!(mapping.soft_clip_end(), 2);
/// assert_eq!(mapping.positions(), &[Some(0), Some(1), Some(2), None]);
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn reference_positions(start: usize, cigar: &str) -> Result<Mapping> {
    let mut mapping = Mapping::default();
    let mut reference = start;
    let mut seen_consuming = false;
    let mut seen_trailing_hard_clip = false;

    for result in Ops::new(cigar) {
        let op = result.map_err(Error::Parse)?;
        let kind = op.kind();

        if kind.is_consuming() && (mapping.soft_clip_end > 0 || seen_trailing_hard_clip) {
            return Err(Error::OrderViolation(kind));
        }

        match kind {
            Kind::Match => {
                seen_consuming = true;
                grow(&mut mapping.positions, op.count())?;
                let end = reference
                    .checked_add(op.count())
                    .ok_or(Error::Overflow(kind))?;
                mapping.positions.extend((reference..end).map(Some));
                reference = end;
            }
            Kind::Insertion => {
                seen_consuming = true;
                grow(&mut mapping.positions, op.count())?;
                mapping
                    .positions
                    .extend(std::iter::repeat(None).take(op.count()));
            }
            Kind::Deletion => {
                seen_consuming = true;
                reference = reference
                    .checked_add(op.count())
                    .ok_or(Error::Overflow(kind))?;
            }
            Kind::SoftClip => {
                if seen_trailing_hard_clip {
                    return Err(Error::OrderViolation(kind));
                }

                let clip = if seen_consuming {
                    &mut mapping.soft_clip_end
                } else {
                    &mut mapping.soft_clip_start
                };

                *clip = clip.checked_add(op.count()).ok_or(Error::Overflow(kind))?;
            }
            Kind::HardClip => {
                if seen_consuming || mapping.soft_clip_start > 0 {
                    seen_trailing_hard_clip = true;
                }
            }
            Kind::Padding => {}
        }
    }

    Ok(mapping)
}

/// Ensures that `count` more positions fit within [`MAX_POSITIONS`].
fn grow(positions: &mut Vec<Option<usize>>, count: usize) -> Result<()> {
    match positions.len().checked_add(count) {
        Some(len) if len <= MAX_POSITIONS => {
            positions.reserve(count);
            Ok(())
        }
        _ => Err(Error::TooLong),
    }
}

/// Creates an identity position table of length `len`.
///
/// # Examples
///
/// ```
/// assert_eq!(proteos::cigar::identity(3), vec![Some(0), Some(1), Some(2)]);
/// ```
pub fn identity(len: usize) -> Vec<Option<usize>> {
    (0..len).map(Some).collect()
}

/// Builds the variant-to-reference position table for a match ending at
/// `match_end` (exclusive) from the CIGAR string of the variant.
///
/// The table must cover the whole match and must not contain soft clips.
///
/// # Examples
///
/// ```
/// use proteos::cigar;
/// use proteos::cigar::TableError;
///
/// assert_eq!(
///     cigar::match_table("2M1I2M", 4)?,
///     vec![Some(0), Some(1), None, Some(2), Some(3)]
/// );
/// assert_eq!(cigar::match_table("???", 4), Err(TableError::Unknown));
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn match_table(
    cigar: &str,
    match_end: usize,
) -> std::result::Result<Vec<Option<usize>>, TableError> {
    if cigar == UNKNOWN {
        return Err(TableError::Unknown);
    }

    let mapping = reference_positions(0, cigar).map_err(TableError::Cigar)?;

    if mapping.is_soft_clipped() {
        return Err(TableError::SoftClip);
    }

    if mapping.positions().len() < match_end {
        return Err(TableError::TooShort {
            found: mapping.positions().len(),
            expected: match_end,
        });
    }

    Ok(mapping.into_positions())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_match() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mapping = reference_positions(0, "3M")?;

        assert_eq!(mapping.soft_clip_start(), 0);
        assert_eq!(mapping.soft_clip_end(), 0);
        assert_eq!(mapping.positions(), &[Some(0), Some(1), Some(2)]);

        Ok(())
    }

    #[test]
    fn clips_on_both_ends() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mapping = reference_positions(0, "2S3M1I2S")?;

        assert_eq!(mapping.soft_clip_start(), 2);
        assert_eq!(mapping.soft_clip_end(), 2);
        assert_eq!(mapping.positions(), &[Some(0), Some(1), Some(2), None]);

        Ok(())
    }

    #[test]
    fn deletions_advance_the_reference() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mapping = reference_positions(10, "2M2D1N2=1X")?;
        assert_eq!(
            mapping.positions(),
            &[Some(10), Some(11), Some(15), Some(16), Some(17)]
        );
        Ok(())
    }

    #[test]
    fn padding_and_leading_hard_clips_are_ignored(
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mapping = reference_positions(0, "3H2M1P1M")?;
        assert_eq!(mapping.positions(), &[Some(0), Some(1), Some(2)]);
        Ok(())
    }

    #[test]
    fn positions_cover_match_and_insertion_counts(
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        for cigar in ["3M", "1S2M3I4D5M2S", "2H4M1I1M1H", "7I", "1M1D1M1D1M", "0M"] {
            let mapping = reference_positions(0, cigar)?;
            let consumed = Ops::new(cigar)
                .map(|op| op.unwrap())
                .filter(|op| matches!(op.kind(), Kind::Match | Kind::Insertion))
                .map(|op| op.count())
                .sum::<usize>();
            assert_eq!(mapping.positions().len(), consumed, "cigar: {cigar}");

            let mapped = mapping.positions().iter().flatten().collect::<Vec<_>>();
            assert!(mapped.windows(2).all(|w| w[0] < w[1]), "cigar: {cigar}");
        }

        Ok(())
    }

    #[test]
    fn match_after_trailing_soft_clip() {
        let err = reference_positions(0, "2M1S1M").unwrap_err();
        assert_eq!(err, Error::OrderViolation(Kind::Match));
        assert_eq!(
            err.to_string(),
            "match operation found after the alignment was clipped"
        );
    }

    #[test]
    fn insertion_after_trailing_hard_clip() {
        let err = reference_positions(0, "2M1H1I").unwrap_err();
        assert_eq!(err, Error::OrderViolation(Kind::Insertion));
    }

    #[test]
    fn soft_clip_after_hard_clip() {
        let err = reference_positions(0, "1S1H1S").unwrap_err();
        assert_eq!(err, Error::OrderViolation(Kind::SoftClip));
    }

    #[test]
    fn zero_length_trailing_clip_is_allowed() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let mapping = reference_positions(0, "2M0S1M")?;
        assert_eq!(mapping.positions().len(), 3);
        Ok(())
    }

    #[test]
    fn malformed_cigars() {
        assert!(matches!(
            reference_positions(0, "M"),
            Err(Error::Parse(op::ParseError::MissingCount(0)))
        ));
        assert!(matches!(
            reference_positions(0, "3M2"),
            Err(Error::Parse(op::ParseError::MissingOperation))
        ));
        assert!(matches!(
            reference_positions(0, "-1M"),
            Err(Error::Parse(op::ParseError::NegativeCount(-1)))
        ));
        assert!(matches!(
            reference_positions(0, "3Z"),
            Err(Error::Parse(op::ParseError::UnknownOperation('Z')))
        ));
    }

    #[test]
    fn coordinates_must_not_overflow() {
        let cigar = "9223372036854775807D9223372036854775807D9223372036854775807D1M";
        let err = reference_positions(0, cigar).unwrap_err();
        assert_eq!(err, Error::Overflow(Kind::Deletion));
        assert_eq!(err.to_string(), "deletion operation overflows the coordinates");

        let err = reference_positions(usize::MAX, "1D1M").unwrap_err();
        assert_eq!(err, Error::Overflow(Kind::Deletion));

        let err = reference_positions(usize::MAX - 1, "2M").unwrap_err();
        assert_eq!(err, Error::Overflow(Kind::Match));

        let cigar = "9223372036854775807S9223372036854775807S9223372036854775807S1M";
        let err = reference_positions(0, cigar).unwrap_err();
        assert_eq!(err, Error::Overflow(Kind::SoftClip));
    }

    #[test]
    fn position_tables_are_bounded() -> std::result::Result<(), Box<dyn std::error::Error>> {
        assert_eq!(
            reference_positions(0, "9000000000000M").unwrap_err(),
            Error::TooLong
        );
        assert_eq!(
            reference_positions(0, "9223372036854775807I").unwrap_err(),
            Error::TooLong
        );

        let cigar = format!("{}M1I", MAX_POSITIONS);
        assert_eq!(reference_positions(0, &cigar).unwrap_err(), Error::TooLong);

        let cigar = format!("{}M", MAX_POSITIONS);
        assert_eq!(reference_positions(0, &cigar)?.positions().len(), MAX_POSITIONS);

        assert!(matches!(
            match_table("9000000000000M", 4),
            Err(TableError::Cigar(Error::TooLong))
        ));

        Ok(())
    }

    #[test]
    fn match_tables() {
        assert_eq!(match_table("???", 2), Err(TableError::Unknown));
        assert_eq!(match_table("1S3M", 2), Err(TableError::SoftClip));
        assert_eq!(
            match_table("2M", 3),
            Err(TableError::TooShort {
                found: 2,
                expected: 3
            })
        );
        assert!(matches!(
            match_table("2Q", 1),
            Err(TableError::Cigar(Error::Parse(_)))
        ));
        assert_eq!(match_table("3M", 2), Ok(vec![Some(0), Some(1), Some(2)]));
    }
}
