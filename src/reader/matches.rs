//! A cursor over the binary match records.

use std::io;
use std::io::Read;

use tracing::debug;

use crate::record::MatchRecord;
use crate::record::matches;
use crate::record::matches::MATCH_RECORD_SIZE;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to reading match records.
#[derive(Debug)]
pub enum Error {
    /// An I/O error.
    Io(io::Error),

    /// The stream ended partway through a record.
    Truncated {
        /// The number of bytes of the partial record.
        read: usize,
    },

    /// A record could not be decoded.
    Record(matches::Error),

    /// A record was found for a peptide that has already been read.
    Unsorted {
        /// The peptide index of the record.
        found: u64,

        /// The peptide index being read.
        current: u64,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::Truncated { read } => write!(
                f,
                "partial match record: expected {MATCH_RECORD_SIZE} bytes, found {read} bytes"
            ),
            Error::Record(err) => write!(f, "record error: {err}"),
            Error::Unsorted { found, current } => write!(
                f,
                "unsorted match stream: found peptide index {found} while reading peptide index \
                 {current}"
            ),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Matches
////////////////////////////////////////////////////////////////////////////////////////

/// A cursor over match records sorted by peptide index.
#[derive(Debug)]
pub struct Matches<R>
where
    R: Read,
{
    /// The inner reader.
    inner: R,

    /// A record that belongs to a later peptide.
    lookahead: Option<MatchRecord>,

    /// Whether the inner reader is exhausted.
    eof: bool,
}

impl<R> Matches<R>
where
    R: Read,
{
    /// Creates a new [`Matches`].
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            lookahead: None,
            eof: false,
        }
    }

    /// Reads the next record from the inner reader.
    fn read_record(&mut self) -> Result<Option<MatchRecord>> {
        if self.eof {
            return Ok(None);
        }

        let mut buffer = [0u8; MATCH_RECORD_SIZE];
        let mut filled = 0;

        while filled < MATCH_RECORD_SIZE {
            match self.inner.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(Error::Io(err)),
            }
        }

        match filled {
            0 => {
                debug!("reached the end of the match records");
                self.eof = true;
                Ok(None)
            }
            MATCH_RECORD_SIZE => MatchRecord::from_bytes(&buffer)
                .map(Some)
                .map_err(Error::Record),
            read => Err(Error::Truncated { read }),
        }
    }

    /// Takes every record for the provided peptide.
    ///
    /// The first record for a later peptide is held back for the next call.
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::reader::matches::Matches;
    /// use proteos::record::MatchRecord;
    ///
    /// let data = [
    ///     MatchRecord::try_new(0, 0, 1, 4)?.to_bytes(),
    ///     MatchRecord::try_new(2, 0, 5, 9)?.to_bytes(),
    /// ]
    /// .concat();
    ///
    /// let mut matches = Matches::new(&data[..]);
    ///
    /// assert_eq!(matches.take_group(0)?.len(), 1);
    /// assert_eq!(matches.take_group(1)?.len(), 0);
    /// assert_eq!(matches.take_group(2)?[0].span(), 5..9);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn take_group(&mut self, peptide_index: u64) -> Result<Vec<MatchRecord>> {
        let mut group = Vec::new();

        loop {
            let record = match self.lookahead.take() {
                Some(record) => record,
                None => match self.read_record()? {
                    Some(record) => record,
                    None => break,
                },
            };

            if record.peptide_index() < peptide_index {
                return Err(Error::Unsorted {
                    found: record.peptide_index(),
                    current: peptide_index,
                });
            }

            if record.peptide_index() > peptide_index {
                self.lookahead = Some(record);
                break;
            }

            group.push(record);
        }

        Ok(group)
    }

    /// Whether records remain that have not been taken.
    pub fn has_remaining(&mut self) -> Result<bool> {
        if self.lookahead.is_none() {
            self.lookahead = self.read_record()?;
        }

        Ok(self.lookahead.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(records: &[(u64, u64, u64)]) -> Vec<u8> {
        records
            .iter()
            .flat_map(|(peptide, start, end)| {
                MatchRecord::try_new(*peptide, 0, *start, *end)
                    .unwrap()
                    .to_bytes()
            })
            .collect()
    }

    #[test]
    fn groups_by_peptide() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let data = encode(&[(0, 0, 3), (0, 4, 7), (0, 8, 11), (1, 0, 2)]);
        let mut matches = Matches::new(&data[..]);

        let group = matches.take_group(0)?;
        assert_eq!(group.len(), 3);
        assert_eq!(group[2].span(), 8..11);

        assert!(matches.has_remaining()?);
        assert_eq!(matches.take_group(1)?.len(), 1);
        assert!(!matches.has_remaining()?);
        assert!(matches.take_group(2)?.is_empty());

        Ok(())
    }

    #[test]
    fn duplicate_spans_are_kept() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let data = encode(&[(0, 1, 4), (0, 1, 4)]);
        let mut matches = Matches::new(&data[..]);
        assert_eq!(matches.take_group(0)?.len(), 2);
        Ok(())
    }

    #[test]
    fn decreasing_keys_are_fatal() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let data = encode(&[(1, 0, 3), (0, 0, 3)]);
        let mut matches = Matches::new(&data[..]);

        assert!(matches.take_group(0)?.is_empty());

        let err = matches.take_group(1).unwrap_err();
        assert!(matches!(
            err,
            Error::Unsorted {
                found: 0,
                current: 1
            }
        ));

        Ok(())
    }

    #[test]
    fn partial_records_are_fatal() {
        let mut data = encode(&[(0, 0, 3)]);
        data.truncate(20);

        let err = Matches::new(&data[..]).take_group(0).unwrap_err();
        assert!(matches!(err, Error::Truncated { read: 20 }));
        assert_eq!(
            err.to_string(),
            "partial match record: expected 32 bytes, found 20 bytes"
        );
    }

    #[test]
    fn inverted_spans_are_fatal() {
        let mut data = encode(&[(0, 0, 3)]);
        data[23] = 9;

        let err = Matches::new(&data[..]).take_group(0).unwrap_err();
        assert!(matches!(
            err,
            Error::Record(matches::Error::InvertedSpan { start: 9, end: 3 })
        ));
    }
}
