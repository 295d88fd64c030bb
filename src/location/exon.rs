//! The genomic location of a single exon.

use std::num::ParseIntError;

use omics::coordinate::Strand;
use omics::coordinate::position::Number;

/// The number of blob items that describe one exon.
pub const NUM_EXON_ITEMS: usize = 4;

/// The token denoting the negative strand.
const NEGATIVE_STRAND: &str = "-";

/// The token written for the positive strand.
const POSITIVE_STRAND: &str = "+";

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to the parsing of exon locations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// The number of items is not a multiple of [`NUM_EXON_ITEMS`].
    IncorrectNumberOfItems(usize),

    /// An invalid start position.
    InvalidStart(ParseIntError),

    /// An invalid end position.
    InvalidEnd(ParseIntError),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::IncorrectNumberOfItems(n) => write!(
                f,
                "location data must have {NUM_EXON_ITEMS} entries (chromosome, start, end, \
                 strand) per exon, found {n} entries"
            ),
            ParseError::InvalidStart(err) => write!(f, "invalid start: {err}"),
            ParseError::InvalidEnd(err) => write!(f, "invalid end: {err}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// A [`Result`](std::result::Result) with a [`ParseError`].
type Result<T> = std::result::Result<T, ParseError>;

////////////////////////////////////////////////////////////////////////////////////////
// Exon locations
////////////////////////////////////////////////////////////////////////////////////////

/// The location of an exon within the genome.
///
/// The start is inclusive and the end is exclusive.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExonLocation {
    /// The chromosome.
    chromosome: String,

    /// The first base of the exon.
    start: Number,

    /// The base after the last base of the exon.
    end: Number,

    /// The strand.
    strand: Strand,
}

impl ExonLocation {
    /// Creates a new [`ExonLocation`].
    ///
    /// # Examples
    ///
    /// ```
    /// use omics::coordinate::Strand;
    /// use proteos::location::ExonLocation;
    ///
    /// let exon = ExonLocation::new("chr1", 100, 109, Strand::Positive);
    ///
    /// assert_eq!(exon.chromosome(), "chr1");
    /// assert_eq!(exon.len(), 9);
    /// assert!(exon.is_forward());
    /// assert_eq!(exon.to_string(), "chr1:100:109:+");
    /// ```
    pub fn new(chromosome: impl Into<String>, start: Number, end: Number, strand: Strand) -> Self {
        Self {
            chromosome: chromosome.into(),
            start,
            end,
            strand,
        }
    }

    /// Attempts to parse one exon from its four blob items.
    ///
    /// Any strand token other than `-` is taken to mean the positive strand.
    fn try_from_items(chromosome: &str, start: &str, end: &str, strand: &str) -> Result<Self> {
        let start = start.parse().map_err(ParseError::InvalidStart)?;
        let end = end.parse().map_err(ParseError::InvalidEnd)?;
        let strand = match strand {
            NEGATIVE_STRAND => Strand::Negative,
            _ => Strand::Positive,
        };

        Ok(Self::new(chromosome, start, end, strand))
    }

    /// Gets the chromosome.
    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    /// Gets the first base (inclusive).
    pub fn start(&self) -> Number {
        self.start
    }

    /// Gets the end (exclusive).
    pub fn end(&self) -> Number {
        self.end
    }

    /// Gets the strand.
    pub fn strand(&self) -> Strand {
        self.strand
    }

    /// Whether the exon lies on the forward strand.
    pub fn is_forward(&self) -> bool {
        self.strand == Strand::Positive
    }

    /// Gets the number of bases in the exon.
    pub fn len(&self) -> Number {
        self.end.saturating_sub(self.start)
    }

    /// Whether the exon contains no bases.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gets the bases of the exon in ascending order.
    pub fn bases(&self) -> std::ops::Range<Number> {
        self.start..self.end.max(self.start)
    }
}

impl std::fmt::Display for ExonLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.chromosome,
            self.start,
            self.end,
            strand_token(self.strand)
        )
    }
}

/// Gets the token for a strand.
fn strand_token(strand: Strand) -> &'static str {
    match strand {
        Strand::Positive => POSITIVE_STRAND,
        Strand::Negative => NEGATIVE_STRAND,
    }
}

/// Parses the items of a `LOCS` blob into exon locations.
///
/// # Examples
///
/// ```
/// use proteos::location::exon;
///
/// let exons = exon::parse_all(&["chr1", "100", "109", "+", "chr1", "200", "209", "+"])?;
/// assert_eq!(exons.len(), 2);
/// assert_eq!(exons[1].start(), 200);
///
/// assert!(exon::parse_all(&["chr1", "100", "109"]).is_err());
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn parse_all(items: &[&str]) -> Result<Vec<ExonLocation>> {
    if items.len() % NUM_EXON_ITEMS != 0 {
        return Err(ParseError::IncorrectNumberOfItems(items.len()));
    }

    items
        .chunks_exact(NUM_EXON_ITEMS)
        .map(|chunk| ExonLocation::try_from_items(chunk[0], chunk[1], chunk[2], chunk[3]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_strands() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let exons = parse_all(&["chr1", "10", "20", "-", "chr1", "30", "40", "."])?;

        assert_eq!(exons[0].strand(), Strand::Negative);
        assert!(!exons[0].is_forward());
        assert_eq!(exons[1].strand(), Strand::Positive);
        assert_eq!(exons[1].to_string(), "chr1:30:40:+");

        Ok(())
    }

    #[test]
    fn incorrect_number_of_items() {
        let err = parse_all(&["chr1", "10", "20", "+", "chr1"]).unwrap_err();

        assert_eq!(err, ParseError::IncorrectNumberOfItems(5));
        assert_eq!(
            err.to_string(),
            "location data must have 4 entries (chromosome, start, end, strand) per exon, found \
             5 entries"
        );
    }

    #[test]
    fn invalid_positions() {
        let err = parse_all(&["chr1", "?", "20", "+"]).unwrap_err();
        assert!(matches!(err, ParseError::InvalidStart(_)));
        assert_eq!(err.to_string(), "invalid start: invalid digit found in string");

        let err = parse_all(&["chr1", "10", "-20", "+"]).unwrap_err();
        assert!(matches!(err, ParseError::InvalidEnd(_)));
    }

    #[test]
    fn inverted_exons_are_empty() {
        let exon = ExonLocation::new("chr1", 20, 10, Strand::Positive);
        assert!(exon.is_empty());
        assert_eq!(exon.bases().count(), 0);
    }
}
