//! Protein records.

use std::num::ParseIntError;
use std::str::FromStr;

use crate::blob;
use crate::blob::Tag;
use crate::location::ExonLocation;
use crate::location::exon;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to the parsing of a protein record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// The line was empty.
    Empty,

    /// An invalid match index.
    InvalidIndex(ParseIntError),

    /// The location blob was missing or malformed.
    Blob(blob::Error),

    /// The location blob could not be parsed into exons.
    Locations(exon::ParseError),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Empty => write!(f, "empty protein line"),
            ParseError::InvalidIndex(err) => write!(f, "invalid match index: {err}"),
            ParseError::Blob(err) => write!(f, "blob error: {err}"),
            ParseError::Locations(err) => write!(f, "location error: {err}"),
        }
    }
}

impl std::error::Error for ParseError {}

////////////////////////////////////////////////////////////////////////////////////////
// Protein records
////////////////////////////////////////////////////////////////////////////////////////

/// A protein that a peptide matched, along with where its exons are.
///
/// The line is made up of whitespace-delimited fields: the match index, the
/// protein name, any number of opaque metadata fields, and a `LOCS{ ... }SCOL`
/// blob holding four items (chromosome, start, end, strand) per exon.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProteinRecord {
    /// The index of the match this record belongs to.
    index: u64,

    /// The name of the protein, if present.
    name: Option<String>,

    /// The exons, in the order they were stored.
    exons: Vec<ExonLocation>,

    /// The original line.
    raw: String,
}

impl ProteinRecord {
    /// Gets the index of the match.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Gets the name of the protein.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Gets the exons.
    pub fn exons(&self) -> &[ExonLocation] {
        &self.exons
    }

    /// Gets the original line.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Renders the exons as `chrom:start:end:strand` joined with `|`.
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::record::ProteinRecord;
    ///
    /// let record = "3\tENSP01\tLOCS{\tchr1\t10\t19\t+\tchr1\t30\t36\t+\t}SCOL"
    ///     .parse::<ProteinRecord>()?;
    ///
    /// assert_eq!(record.location_summary(), "chr1:10:19:+|chr1:30:36:+");
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn location_summary(&self) -> String {
        self.exons
            .iter()
            .map(|exon| exon.to_string())
            .collect::<Vec<_>>()
            .join("|")
    }
}

impl FromStr for ProteinRecord {
    type Err = ParseError;

    /// Parses a protein line.
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::record::ProteinRecord;
    ///
    /// let record = "3\tENSP01\tLOCS{\tchr1\t10\t19\t+\t}SCOL".parse::<ProteinRecord>()?;
    ///
    /// assert_eq!(record.index(), 3);
    /// assert_eq!(record.name(), Some("ENSP01"));
    /// assert_eq!(record.exons().len(), 1);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = s.split_ascii_whitespace().collect::<Vec<_>>();
        let index = fields.first().ok_or(ParseError::Empty)?;
        let index = index.parse().map_err(ParseError::InvalidIndex)?;

        let locations = blob::require(&fields, Tag::Locations).map_err(ParseError::Blob)?;
        let exons = exon::parse_all(locations.items()).map_err(ParseError::Locations)?;

        let name = match locations.opener() {
            0 | 1 => None,
            _ => fields.get(1).map(|name| name.to_string()),
        };

        Ok(Self {
            index,
            name,
            exons,
            raw: s.to_string(),
        })
    }
}

impl std::fmt::Display for ProteinRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use omics::coordinate::Strand;

    use super::*;

    #[test]
    fn parses_exons_on_both_strands() -> Result<(), Box<dyn std::error::Error>> {
        let line = "0\tENSP0001_1\tmeta\tLOCS{\tchr7\t300\t306\t-\tchr7\t100\t103\t-\t}SCOL";
        let record = line.parse::<ProteinRecord>()?;

        assert_eq!(record.index(), 0);
        assert_eq!(record.name(), Some("ENSP0001_1"));
        assert_eq!(
            record.exons(),
            &[
                ExonLocation::new("chr7", 300, 306, Strand::Negative),
                ExonLocation::new("chr7", 100, 103, Strand::Negative),
            ]
        );
        assert_eq!(record.to_string(), line);

        Ok(())
    }

    #[test]
    fn name_is_optional() -> Result<(), Box<dyn std::error::Error>> {
        let record = "9\tLOCS{\t}SCOL".parse::<ProteinRecord>()?;
        assert_eq!(record.name(), None);
        assert!(record.exons().is_empty());
        assert_eq!(record.location_summary(), "");
        Ok(())
    }

    #[test]
    fn missing_locations_are_fatal() {
        let err = "1\tENSP01".parse::<ProteinRecord>().unwrap_err();
        assert_eq!(err, ParseError::Blob(blob::Error::Missing(Tag::Locations)));
    }

    #[test]
    fn locations_must_come_in_fours() {
        let err = "1\tENSP01\tLOCS{\tchr1\t1\t4\t}SCOL"
            .parse::<ProteinRecord>()
            .unwrap_err();
        assert_eq!(
            err,
            ParseError::Locations(exon::ParseError::IncorrectNumberOfItems(3))
        );
    }

    #[test]
    fn invalid_index() {
        assert!(matches!(
            "x\tLOCS{\t}SCOL".parse::<ProteinRecord>(),
            Err(ParseError::InvalidIndex(_))
        ));
        assert_eq!("".parse::<ProteinRecord>(), Err(ParseError::Empty));
    }
}
