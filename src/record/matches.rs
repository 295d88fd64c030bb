//! Binary match records written by the search engine.

use std::ops::Range;

/// The number of bytes in a single match record.
pub const MATCH_RECORD_SIZE: usize = 32;

/// The number of bytes in a single field of a match record.
const FIELD_SIZE: usize = 8;

/// An error related to a match record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// The end of the match comes before its start.
    InvertedSpan {
        /// The start of the match.
        start: u64,

        /// The end of the match.
        end: u64,
    },

    /// An offset does not fit within the address space of this platform.
    OffsetOverflow(u64),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvertedSpan { start, end } => write!(
                f,
                "bad match entry (high index below low index): start {start}, end {end}"
            ),
            Error::OffsetOverflow(offset) => write!(f, "offset is too large: {offset}"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

/// A single match of a peptide within the reference protein database.
///
/// On disk, a record is four big-endian unsigned 64-bit integers: the index
/// of the peptide, a field reserved for the search engine, and the start and
/// end (exclusive) of the match in amino acids.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MatchRecord {
    /// The index of the query peptide.
    peptide_index: u64,

    /// A value that is opaque to this crate.
    reserved: u64,

    /// The start of the match (0-based).
    start: usize,

    /// The end of the match (0-based, exclusive).
    end: usize,
}

impl MatchRecord {
    /// Attempts to create a new [`MatchRecord`].
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::record::MatchRecord;
    ///
    /// let record = MatchRecord::try_new(0, 42, 10, 15)?;
    /// assert_eq!(record.span(), 10..15);
    ///
    /// assert!(MatchRecord::try_new(0, 42, 15, 10).is_err());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_new(peptide_index: u64, reserved: u64, start: u64, end: u64) -> Result<Self> {
        if end < start {
            return Err(Error::InvertedSpan { start, end });
        }

        let start = usize::try_from(start).map_err(|_| Error::OffsetOverflow(start))?;
        let end = usize::try_from(end).map_err(|_| Error::OffsetOverflow(end))?;

        Ok(Self {
            peptide_index,
            reserved,
            start,
            end,
        })
    }

    /// Attempts to decode a [`MatchRecord`] from its binary form.
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::record::MatchRecord;
    ///
    /// let mut bytes = [0u8; 32];
    /// bytes[7] = 1;
    /// bytes[15] = 9;
    /// bytes[23] = 3;
    /// bytes[31] = 7;
    ///
    /// let record = MatchRecord::from_bytes(&bytes)?;
    /// assert_eq!(record.peptide_index(), 1);
    /// assert_eq!(record.reserved(), 9);
    /// assert_eq!(record.span(), 3..7);
    /// assert_eq!(record.to_bytes(), bytes);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_bytes(bytes: &[u8; MATCH_RECORD_SIZE]) -> Result<Self> {
        let mut fields = bytes.chunks_exact(FIELD_SIZE).map(|chunk| {
            let mut field = [0u8; FIELD_SIZE];
            field.copy_from_slice(chunk);
            u64::from_be_bytes(field)
        });

        let mut next = || fields.next().unwrap_or_default();
        let (peptide_index, reserved, start, end) = (next(), next(), next(), next());

        Self::try_new(peptide_index, reserved, start, end)
    }

    /// Encodes the record in its binary form.
    pub fn to_bytes(&self) -> [u8; MATCH_RECORD_SIZE] {
        let mut bytes = [0u8; MATCH_RECORD_SIZE];
        let fields = [
            self.peptide_index,
            self.reserved,
            self.start as u64,
            self.end as u64,
        ];

        for (chunk, field) in bytes.chunks_exact_mut(FIELD_SIZE).zip(fields) {
            chunk.copy_from_slice(&field.to_be_bytes());
        }

        bytes
    }

    /// Gets the index of the query peptide.
    pub fn peptide_index(&self) -> u64 {
        self.peptide_index
    }

    /// Gets the reserved field.
    pub fn reserved(&self) -> u64 {
        self.reserved
    }

    /// Gets the start of the match.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Gets the end of the match.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Gets the span of the match within the protein.
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_round_trips() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let record = MatchRecord::try_new(7, u64::MAX, 0, 12)?;
        let decoded = MatchRecord::from_bytes(&record.to_bytes())?;

        assert_eq!(decoded, record);
        assert_eq!(decoded.reserved(), u64::MAX);

        Ok(())
    }

    #[test]
    fn empty_spans_are_allowed() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let record = MatchRecord::try_new(0, 0, 5, 5)?;
        assert!(record.span().is_empty());
        Ok(())
    }

    #[test]
    fn inverted_span() {
        let mut bytes = [0u8; MATCH_RECORD_SIZE];
        bytes[23] = 9;
        bytes[31] = 4;

        let err = MatchRecord::from_bytes(&bytes).unwrap_err();
        assert_eq!(err, Error::InvertedSpan { start: 9, end: 4 });
        assert_eq!(
            err.to_string(),
            "bad match entry (high index below low index): start 9, end 4"
        );
    }
}
