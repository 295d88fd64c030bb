//! Differences between a variant protein and its reference.
//!
//! A difference is described by a compact string such as
//! `167-168S>F:109130043C>T`: the (1-based, inclusive) range of amino acids
//! that changed in the reference protein followed by the amino acid change,
//! then a colon, then the genome location followed by the genetic change.
//! Several concurrent differences may be joined with `;`.
//!
//! Parsing never fails. A string that cannot be understood produces a
//! [`Difference`] carrying a [`Warning`] and default values for the fields
//! that could not be read.

use std::hash::Hash;
use std::hash::Hasher;
use std::str::FromStr;
use std::sync::LazyLock;

use nonempty::NonEmpty;
use omics::coordinate::position::Number;
use regex::Regex;

/// The delimiter between concurrent differences.
pub const DIFFERENCE_DELIMITER: &str = ";";

/// The delimiter between the amino acid and genetic parts of a difference.
const PART_DELIMITER: char = ':';

/// The delimiter between the start and end of the amino acid range.
const RANGE_DELIMITER: char = '-';

/// The first run of digits within a string.
static DIGITS: LazyLock<Regex> = LazyLock::new(|| {
    // SAFETY: this pattern is static and known to compile.
    Regex::new(r"\d+").unwrap()
});

////////////////////////////////////////////////////////////////////////////////////////
// Warnings
////////////////////////////////////////////////////////////////////////////////////////

/// A problem encountered while parsing a difference.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Warning {
    /// The difference did not split into an amino acid and genetic part.
    Questionable,

    /// The amino acid part did not split into a start and an end.
    MalformedAminoAcidChange,

    /// The amino acid change had no start position.
    MissingStart,

    /// The amino acid change had no end position.
    MissingEnd,

    /// The genetic change had no genome location.
    MissingGenomeLocation,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::Questionable => write!(f, "questionable variant"),
            Warning::MalformedAminoAcidChange => write!(f, "malformed amino acid variant data"),
            Warning::MissingStart => write!(f, "missing amino acid change start"),
            Warning::MissingEnd => write!(f, "missing amino acid change end"),
            Warning::MissingGenomeLocation => write!(f, "missing genetic change location"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Protein ranges
////////////////////////////////////////////////////////////////////////////////////////

/// A 1-based, inclusive range of amino acids within a reference protein.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ProteinRange {
    /// The first amino acid.
    start: usize,

    /// The last amino acid.
    end: usize,
}

impl ProteinRange {
    /// Creates a new [`ProteinRange`].
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Gets the first amino acid of the range.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Gets the last amino acid of the range.
    pub fn end(&self) -> usize {
        self.end
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Differences
////////////////////////////////////////////////////////////////////////////////////////

/// A single parsed difference.
///
/// Equality and hashing only consider the original string, so identical
/// differences reported by several variants collapse within sets.
#[derive(Clone, Debug)]
pub struct Difference {
    /// The original difference string.
    raw: String,

    /// The range of the change in the reference protein.
    protein_range: Option<ProteinRange>,

    /// The amino acid change.
    protein_change: String,

    /// The genome location of the change.
    genome_location: Number,

    /// The genetic change.
    genome_change: String,

    /// The problem encountered while parsing, if any.
    warning: Option<Warning>,
}

impl Difference {
    /// Parses a single difference.
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::difference::Difference;
    /// use proteos::difference::ProteinRange;
    ///
    /// let difference = Difference::parse("167-168S>F:109130043C>T");
    ///
    /// assert_eq!(difference.protein_range(), Some(ProteinRange::new(167, 168)));
    /// assert_eq!(difference.protein_change(), "S>F");
    /// assert_eq!(difference.genome_location(), 109130043);
    /// assert_eq!(difference.genome_change(), "C>T");
    /// assert!(difference.warning().is_none());
    /// ```
    pub fn parse(s: &str) -> Self {
        let mut difference = Self {
            raw: s.to_string(),
            protein_range: None,
            protein_change: String::new(),
            genome_location: 0,
            genome_change: String::new(),
            warning: None,
        };

        if let Err(warning) = difference.fill() {
            difference.warning = Some(warning);
        }

        difference
    }

    /// Populates the parsed fields from the original string.
    fn fill(&mut self) -> Result<(), Warning> {
        let parts = self.raw.split(PART_DELIMITER).collect::<Vec<_>>();
        let &[amino_acid, genetic] = parts.as_slice() else {
            return Err(Warning::Questionable);
        };

        let (start, end) = amino_acid
            .split_once(RANGE_DELIMITER)
            .filter(|(_, end)| !end.contains(RANGE_DELIMITER))
            .ok_or(Warning::MalformedAminoAcidChange)?;

        let (start, _) = leading_number::<usize>(start).ok_or(Warning::MissingStart)?;
        let (end, change) = leading_number::<usize>(end).ok_or(Warning::MissingEnd)?;

        self.protein_range = Some(ProteinRange::new(start, end));
        self.protein_change = change.to_string();

        let (location, change) =
            leading_number::<Number>(genetic).ok_or(Warning::MissingGenomeLocation)?;

        self.genome_location = location;
        self.genome_change = change.to_string();

        Ok(())
    }

    /// Gets the original difference string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Splits the original string into its amino acid and genetic parts.
    ///
    /// A string without a genetic part yields an empty genetic part.
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::difference::Difference;
    ///
    /// let difference = Difference::parse("167-168S>F:109130043C>T");
    /// assert_eq!(difference.parts(), ("167-168S>F", "109130043C>T"));
    ///
    /// let difference = Difference::parse("167-168S>F");
    /// assert_eq!(difference.parts(), ("167-168S>F", ""));
    /// ```
    pub fn parts(&self) -> (&str, &str) {
        self.raw
            .split_once(PART_DELIMITER)
            .unwrap_or((self.raw.as_str(), ""))
    }

    /// Gets the range of the change within the reference protein.
    ///
    /// This is [`None`] when the amino acid positions could not be parsed.
    pub fn protein_range(&self) -> Option<ProteinRange> {
        self.protein_range
    }

    /// Gets the amino acid change.
    pub fn protein_change(&self) -> &str {
        &self.protein_change
    }

    /// Gets the genome location of the change (zero when not parsed).
    pub fn genome_location(&self) -> Number {
        self.genome_location
    }

    /// Gets the genetic change.
    pub fn genome_change(&self) -> &str {
        &self.genome_change
    }

    /// Gets the warning produced while parsing, if any.
    pub fn warning(&self) -> Option<&Warning> {
        self.warning.as_ref()
    }
}

impl PartialEq for Difference {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Difference {}

impl Hash for Difference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl std::fmt::Display for Difference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Parses every difference within a `;`-delimited difference string.
///
/// # Examples
///
/// ```
/// let differences = proteos::difference::parse_all("5-5A>G:100A>G;9-9K>R:112A>G");
/// assert_eq!(differences.len(), 2);
/// assert_eq!(differences.last().as_str(), "9-9K>R:112A>G");
/// ```
pub fn parse_all(s: &str) -> NonEmpty<Difference> {
    let mut tokens = s.split(DIFFERENCE_DELIMITER).map(Difference::parse);

    // `str::split` always yields at least one token.
    let mut differences = NonEmpty::new(tokens.next().unwrap_or_else(|| Difference::parse(s)));
    differences.extend(tokens);
    differences
}

/// Splits a string into its first run of digits and the text following it.
fn leading_number<T>(s: &str) -> Option<(T, &str)>
where
    T: FromStr,
{
    let found = DIGITS.find(s)?;
    let value = found.as_str().parse().ok()?;
    Some((value, &s[found.end()..]))
}
