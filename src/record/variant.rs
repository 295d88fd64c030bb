//! Variant records.

use std::num::ParseIntError;
use std::str::FromStr;

use nonempty::NonEmpty;

use crate::blob;
use crate::blob::Tag;
use crate::difference;
use crate::difference::Difference;

/// The minimum number of fields before the `INDS{` blob (index and CIGAR).
const MIN_LEADING_FIELDS: usize = 2;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to the parsing of a variant record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// The line was empty.
    Empty,

    /// An invalid match index.
    InvalidIndex(ParseIntError),

    /// A blob was missing or malformed.
    Blob(blob::Error),

    /// The line did not carry a CIGAR string before the individuals.
    MissingCigar,

    /// The differences appeared before the individuals.
    MisplacedDifferences,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Empty => write!(f, "empty variant line"),
            ParseError::InvalidIndex(err) => write!(f, "invalid match index: {err}"),
            ParseError::Blob(err) => write!(f, "blob error: {err}"),
            ParseError::MissingCigar => write!(f, "missing cigar column"),
            ParseError::MisplacedDifferences => write!(
                f,
                "`{}` blob must follow the `{}` blob",
                Tag::Differences.opener(),
                Tag::Individuals.opener()
            ),
        }
    }
}

impl std::error::Error for ParseError {}

////////////////////////////////////////////////////////////////////////////////////////
// Variant records
////////////////////////////////////////////////////////////////////////////////////////

/// A variant of a reference protein that a peptide matched.
///
/// The line is made up of whitespace-delimited fields: the match index, an
/// optional variant name, the CIGAR string aligning the variant to its
/// reference, the individuals carrying the variant (`INDS{ ... }SDNI`) and,
/// optionally, the differences from the reference (`DIFS{ ... }SFID`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VariantRecord {
    /// The index of the match this record belongs to.
    index: u64,

    /// The name of the variant, if present.
    name: Option<String>,

    /// The CIGAR string (possibly [`crate::cigar::UNKNOWN`]).
    cigar: String,

    /// The individuals (or haplotypes) carrying this variant.
    individuals: Vec<String>,

    /// The differences, grouped by the item they were listed in. [`None`]
    /// when the differences are unknown.
    differences: Option<Vec<NonEmpty<Difference>>>,
}

impl VariantRecord {
    /// Creates a new [`VariantRecord`].
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::record::VariantRecord;
    ///
    /// let record = VariantRecord::new(4, None, "3M", vec![String::from("HG00096")], None);
    /// assert_eq!(record.to_string(), "4\t3M\tINDS{\tHG00096\t}SDNI");
    /// ```
    pub fn new(
        index: u64,
        name: Option<String>,
        cigar: impl Into<String>,
        individuals: Vec<String>,
        differences: Option<Vec<NonEmpty<Difference>>>,
    ) -> Self {
        Self {
            index,
            name,
            cigar: cigar.into(),
            individuals,
            differences,
        }
    }

    /// Gets the index of the match.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Gets the name of the variant.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Gets the CIGAR string.
    pub fn cigar(&self) -> &str {
        &self.cigar
    }

    /// Gets the individuals carrying this variant.
    pub fn individuals(&self) -> &[String] {
        &self.individuals
    }

    /// Whether the differences of this variant are known.
    pub fn has_differences(&self) -> bool {
        self.differences.is_some()
    }

    /// Gets every difference of this variant.
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::record::VariantRecord;
    ///
    /// let line = "0\t5M\tINDS{\tA\t}SDNI\tDIFS{\t2-2K>R:90A>G;3-3L>P:93T>C\t}SFID";
    /// let record = line.parse::<VariantRecord>()?;
    ///
    /// let differences = record.differences().map(|d| d.as_str()).collect::<Vec<_>>();
    /// assert_eq!(differences, ["2-2K>R:90A>G", "3-3L>P:93T>C"]);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn differences(&self) -> impl Iterator<Item = &Difference> {
        self.differences.iter().flatten().flat_map(|item| item.iter())
    }
}

impl FromStr for VariantRecord {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = s.split_ascii_whitespace().collect::<Vec<_>>();
        let index = fields.first().ok_or(ParseError::Empty)?;
        let index = index.parse().map_err(ParseError::InvalidIndex)?;

        let individuals = blob::require(&fields, Tag::Individuals).map_err(ParseError::Blob)?;

        if individuals.opener() < MIN_LEADING_FIELDS {
            return Err(ParseError::MissingCigar);
        }

        let cigar = fields[individuals.opener() - 1].to_string();
        let name = if individuals.opener() > MIN_LEADING_FIELDS {
            Some(fields[1].to_string())
        } else {
            None
        };

        let differences = match blob::find(&fields, Tag::Differences).map_err(ParseError::Blob)? {
            Some(located) if located.opener() < individuals.opener() => {
                return Err(ParseError::MisplacedDifferences);
            }
            Some(located) => Some(
                located
                    .items()
                    .iter()
                    .map(|item| difference::parse_all(item))
                    .collect(),
            ),
            None => None,
        };

        Ok(Self {
            index,
            name,
            cigar,
            individuals: individuals.items().iter().map(|s| s.to_string()).collect(),
            differences,
        })
    }
}

impl std::fmt::Display for VariantRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.index)?;

        if let Some(name) = &self.name {
            write!(f, "\t{name}")?;
        }

        write!(
            f,
            "\t{}\t{}",
            self.cigar,
            blob::encode(Tag::Individuals, &self.individuals)
        )?;

        if let Some(differences) = &self.differences {
            let items = differences.iter().map(|item| {
                item.iter()
                    .map(|difference| difference.as_str())
                    .collect::<Vec<_>>()
                    .join(difference::DIFFERENCE_DELIMITER)
            });

            write!(f, "\t{}", blob::encode(Tag::Differences, items))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_short_layout() -> Result<(), Box<dyn std::error::Error>> {
        let line = "12\t2M1I2M\tINDS{\tHG00096\tHG00097\t}SDNI\tDIFS{\t3-3R>Q:1000G>A\t}SFID";
        let record = line.parse::<VariantRecord>()?;

        assert_eq!(record.index(), 12);
        assert_eq!(record.name(), None);
        assert_eq!(record.cigar(), "2M1I2M");
        assert_eq!(record.individuals(), &["HG00096", "HG00097"]);
        assert_eq!(record.differences().count(), 1);
        assert_eq!(record.to_string(), line);

        Ok(())
    }

    #[test]
    fn parses_the_named_layout() -> Result<(), Box<dyn std::error::Error>> {
        let line = "0\tENSP0001_3\t???\tINDS{\tHG00096\t}SDNI";
        let record = line.parse::<VariantRecord>()?;

        assert_eq!(record.name(), Some("ENSP0001_3"));
        assert_eq!(record.cigar(), "???");
        assert!(!record.has_differences());
        assert_eq!(record.differences().count(), 0);
        assert_eq!(record.to_string(), line);

        Ok(())
    }

    #[test]
    fn empty_difference_blob_is_known() -> Result<(), Box<dyn std::error::Error>> {
        let record = "0\t3M\tINDS{\t}SDNI\tDIFS{\t}SFID".parse::<VariantRecord>()?;
        assert!(record.has_differences());
        assert_eq!(record.differences().count(), 0);
        Ok(())
    }

    #[test]
    fn missing_individuals_are_fatal() {
        let err = "0\t3M".parse::<VariantRecord>().unwrap_err();
        assert_eq!(err, ParseError::Blob(blob::Error::Missing(Tag::Individuals)));
    }

    #[test]
    fn missing_cigar() {
        let err = "0\tINDS{\t}SDNI".parse::<VariantRecord>().unwrap_err();
        assert_eq!(err, ParseError::MissingCigar);
    }

    #[test]
    fn misplaced_differences() {
        let err = "0\t3M\tDIFS{\t}SFID\tINDS{\t}SDNI"
            .parse::<VariantRecord>()
            .unwrap_err();
        assert_eq!(err, ParseError::MisplacedDifferences);
    }

    #[test]
    fn unclosed_differences() {
        let err = "0\t3M\tINDS{\t}SDNI\tDIFS{\t1-1A>G:1A>G"
            .parse::<VariantRecord>()
            .unwrap_err();
        assert_eq!(err, ParseError::Blob(blob::Error::Unclosed(Tag::Differences)));
    }
}
