//! A cursor over tables of records keyed by match index.

use std::io;
use std::io::BufRead;
use std::str::FromStr;

use tracing::debug;

use crate::reader::read_line;
use crate::record::ProteinRecord;
use crate::record::VariantRecord;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to reading a keyed table.
#[derive(Debug)]
pub enum Error<E> {
    /// An I/O error.
    Io(io::Error),

    /// A line could not be parsed.
    Parse {
        /// The line number (1-based).
        line_no: usize,

        /// The parse error.
        err: E,
    },

    /// A record was found for a match that has already been read.
    Unsorted {
        /// The key of the record.
        found: u64,

        /// The lowest key still being read.
        lowest: u64,
    },

    /// More than one record was found for the same match.
    Duplicate(u64),
}

impl<E> std::fmt::Display for Error<E>
where
    E: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::Parse { line_no, err } => write!(f, "parse error at line {line_no}: {err}"),
            Error::Unsorted { found, lowest } => write!(
                f,
                "unsorted table: found match index {found} after reading up to match index \
                 {lowest}"
            ),
            Error::Duplicate(key) => write!(f, "duplicate record for match index {key}"),
        }
    }
}

impl<E> std::error::Error for Error<E> where E: std::fmt::Debug + std::fmt::Display {}

////////////////////////////////////////////////////////////////////////////////////////
// Keyed records
////////////////////////////////////////////////////////////////////////////////////////

/// A record that is keyed by match index.
pub trait Keyed {
    /// Gets the match index.
    fn key(&self) -> u64;
}

impl Keyed for ProteinRecord {
    fn key(&self) -> u64 {
        self.index()
    }
}

impl Keyed for VariantRecord {
    fn key(&self) -> u64 {
        self.index()
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Tables
////////////////////////////////////////////////////////////////////////////////////////

/// A cursor over records sorted by match index.
///
/// Tables are sparse: a match need not have a record.
#[derive(Debug)]
pub struct Table<R, T>
where
    R: BufRead,
{
    /// The inner reader.
    inner: R,

    /// A record that belongs to a later group of matches.
    lookahead: Option<T>,

    /// Whether the inner reader is exhausted.
    eof: bool,

    /// The number of lines read so far.
    line_no: usize,
}

impl<R, T> Table<R, T>
where
    R: BufRead,
    T: FromStr + Keyed,
{
    /// Creates a new [`Table`].
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            lookahead: None,
            eof: false,
            line_no: 0,
        }
    }

    /// Reads the next record from the inner reader.
    fn read_record(&mut self) -> Result<Option<T>, Error<T::Err>> {
        let mut buffer = String::new();

        while !self.eof {
            if read_line(&mut self.inner, &mut buffer).map_err(Error::Io)? == 0 {
                debug!(records = std::any::type_name::<T>(), "reached the end of the table");
                self.eof = true;
                break;
            }

            self.line_no += 1;

            if buffer.trim().is_empty() {
                continue;
            }

            return buffer.parse().map(Some).map_err(|err| Error::Parse {
                line_no: self.line_no,
                err,
            });
        }

        Ok(None)
    }

    /// Fills one slot for each of the `len` matches starting at match index
    /// `base`.
    ///
    /// Slots without a record are [`None`]. The first record for a later
    /// match is held back for the next call.
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::reader::table::Table;
    /// use proteos::record::ProteinRecord;
    ///
    /// let data = b"1\tA\tLOCS{\t}SCOL\n4\tB\tLOCS{\t}SCOL\n";
    /// let mut table = Table::<_, ProteinRecord>::new(&data[..]);
    ///
    /// let slots = table.fill(0, 3)?;
    /// assert!(slots[0].is_none());
    /// assert_eq!(slots[1].as_ref().and_then(|r| r.name()), Some("A"));
    /// assert!(slots[2].is_none());
    ///
    /// let slots = table.fill(3, 2)?;
    /// assert_eq!(slots[1].as_ref().and_then(|r| r.name()), Some("B"));
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn fill(&mut self, base: u64, len: usize) -> Result<Vec<Option<T>>, Error<T::Err>> {
        let mut slots = std::iter::repeat_with(|| None)
            .take(len)
            .collect::<Vec<Option<T>>>();
        let watermark = base + len as u64;

        loop {
            let record = match self.lookahead.take() {
                Some(record) => record,
                None => match self.read_record()? {
                    Some(record) => record,
                    None => break,
                },
            };

            let key = record.key();

            if key < base {
                return Err(Error::Unsorted {
                    found: key,
                    lowest: base,
                });
            }

            if key >= watermark {
                self.lookahead = Some(record);
                break;
            }

            // The key is within `[base, watermark)`, so it fits within `len`.
            let slot = &mut slots[(key - base) as usize];

            if slot.is_some() {
                return Err(Error::Duplicate(key));
            }

            *slot = Some(record);
        }

        Ok(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::protein;
    use crate::record::variant;

    #[test]
    fn sparse_tables() -> Result<(), Box<dyn std::error::Error>> {
        let data = b"\n2\t3M\tINDS{\tA\t}SDNI\n\n5\t1M\tINDS{\tB\t}SDNI\n";
        let mut table = Table::<_, VariantRecord>::new(&data[..]);

        assert!(table.fill(0, 2)?.iter().all(Option::is_none));
        assert!(table.fill(2, 0)?.is_empty());

        let slots = table.fill(2, 4)?;
        assert_eq!(slots.iter().filter(|slot| slot.is_some()).count(), 2);
        assert_eq!(slots[0].as_ref().map(|r| r.cigar()), Some("3M"));
        assert_eq!(slots[3].as_ref().map(|r| r.cigar()), Some("1M"));

        assert!(table.fill(6, 10)?.iter().all(Option::is_none));

        Ok(())
    }

    #[test]
    fn unsorted_tables() -> Result<(), Box<dyn std::error::Error>> {
        let data = b"3\t3M\tINDS{\t}SDNI\n1\t3M\tINDS{\t}SDNI\n";
        let mut table = Table::<_, VariantRecord>::new(&data[..]);

        assert!(table.fill(0, 3)?.iter().all(Option::is_none));

        let err = table.fill(3, 1).unwrap_err();
        assert!(matches!(err, Error::Unsorted { found: 1, lowest: 3 }));

        Ok(())
    }

    #[test]
    fn duplicate_keys() {
        let data = b"0\tA\tLOCS{\t}SCOL\n0\tB\tLOCS{\t}SCOL\n";
        let mut table = Table::<_, ProteinRecord>::new(&data[..]);

        let err = table.fill(0, 1).unwrap_err();
        assert!(matches!(err, Error::Duplicate(0)));
        assert_eq!(err.to_string(), "duplicate record for match index 0");
    }

    #[test]
    fn parse_errors_carry_line_numbers() {
        let data = b"\n0\tA\n";
        let mut table = Table::<_, ProteinRecord>::new(&data[..]);

        let err = table.fill(0, 1).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse {
                line_no: 2,
                err: protein::ParseError::Blob(_)
            }
        ));
    }

    #[test]
    fn parse_errors_in_variants() {
        let data = b"0\tINDS{\t}SDNI\n";
        let mut table = Table::<_, VariantRecord>::new(&data[..]);

        let err = table.fill(0, 1).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse {
                err: variant::ParseError::MissingCigar,
                ..
            }
        ));
    }
}
