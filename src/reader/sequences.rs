//! A cursor over the query peptide sequences.

use std::io;
use std::io::BufRead;

use tracing::debug;

use crate::reader::read_line;

/// The character that starts a fasta header line.
const HEADER_START: char = '>';

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to reading query sequences.
#[derive(Debug)]
pub enum Error {
    /// An I/O error.
    Io(io::Error),

    /// A line that should have been a header was not.
    Malformed {
        /// The line number (1-based).
        line_no: usize,

        /// The offending line.
        line: String,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::Malformed { line_no, line } => {
                write!(f, "malformed fasta at line {line_no}: expected header, found `{line}`")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Sequences
////////////////////////////////////////////////////////////////////////////////////////

/// A query peptide.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sequence {
    /// The header of the record (without the leading `>`).
    name: String,

    /// The residues of the peptide.
    residues: String,
}

impl Sequence {
    /// Creates a new [`Sequence`].
    pub fn new(name: impl Into<String>, residues: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            residues: residues.into(),
        }
    }

    /// Gets the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the residues.
    pub fn residues(&self) -> &str {
        &self.residues
    }

    /// Consumes `self` and returns the name and residues.
    pub fn into_parts(self) -> (String, String) {
        (self.name, self.residues)
    }
}

/// A cursor over fasta records that may wrap their sequences across lines.
///
/// The header of the following record is held as lookahead once the end of
/// the current record has been found. Blank lines are skipped.
#[derive(Debug)]
pub struct Sequences<R>
where
    R: BufRead,
{
    /// The inner reader.
    inner: R,

    /// The header of the next record, if it has already been read.
    lookahead: Option<String>,

    /// Whether the inner reader is exhausted.
    eof: bool,

    /// The number of lines read so far.
    line_no: usize,
}

impl<R> Sequences<R>
where
    R: BufRead,
{
    /// Creates a new [`Sequences`].
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            lookahead: None,
            eof: false,
            line_no: 0,
        }
    }

    /// Reads the next non-blank line, if any.
    fn next_line(&mut self) -> Result<Option<String>> {
        let mut buffer = String::new();

        while !self.eof {
            if read_line(&mut self.inner, &mut buffer).map_err(Error::Io)? == 0 {
                debug!("reached the end of the sequences");
                self.eof = true;
                break;
            }

            self.line_no += 1;

            let line = buffer.trim();
            if !line.is_empty() {
                return Ok(Some(line.to_string()));
            }
        }

        Ok(None)
    }

    /// Reads the next sequence.
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::reader::sequences::Sequences;
    ///
    /// let data = b">p0\nPEP\nTIDE\n\n>p1\nKR\n";
    /// let mut sequences = Sequences::new(&data[..]);
    ///
    /// let sequence = sequences.next_sequence()?.unwrap();
    /// assert_eq!(sequence.name(), "p0");
    /// assert_eq!(sequence.residues(), "PEPTIDE");
    ///
    /// assert_eq!(sequences.next_sequence()?.unwrap().residues(), "KR");
    /// assert!(sequences.next_sequence()?.is_none());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn next_sequence(&mut self) -> Result<Option<Sequence>> {
        let header = match self.lookahead.take() {
            Some(header) => header,
            None => match self.next_line()? {
                Some(line) => line,
                None => return Ok(None),
            },
        };

        let name = match header.strip_prefix(HEADER_START) {
            Some(name) => name.trim().to_string(),
            None => {
                return Err(Error::Malformed {
                    line_no: self.line_no,
                    line: header,
                });
            }
        };

        let mut residues = String::new();

        while let Some(line) = self.next_line()? {
            if line.starts_with(HEADER_START) {
                self.lookahead = Some(line);
                break;
            }

            residues.push_str(&line);
        }

        Ok(Some(Sequence { name, residues }))
    }
}

#[cfg(test)]
mod tests {
    use noodles::fasta;

    use super::*;

    #[test]
    fn reads_wrapped_records() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut writer = fasta::writer::Builder::default()
            .set_line_base_count(4)
            .build_from_writer(Vec::new());

        for (name, residues) in [("p0", "PEPTIDEK"), ("p1", "ACDEFGHIKL")] {
            let record = fasta::Record::new(
                fasta::record::Definition::new(name, None),
                fasta::record::Sequence::from(residues.as_bytes().to_vec()),
            );
            writer.write_record(&record)?;
        }

        let data = writer.get_ref().clone();
        let mut sequences = Sequences::new(&data[..]);

        assert_eq!(
            sequences.next_sequence()?,
            Some(Sequence::new("p0", "PEPTIDEK"))
        );
        assert_eq!(
            sequences.next_sequence()?,
            Some(Sequence::new("p1", "ACDEFGHIKL"))
        );
        assert_eq!(sequences.next_sequence()?, None);
        assert_eq!(sequences.next_sequence()?, None);

        Ok(())
    }

    #[test]
    fn empty_records() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut sequences = Sequences::new(&b">a\n>b\nK\r\n"[..]);

        assert_eq!(sequences.next_sequence()?, Some(Sequence::new("a", "")));
        assert_eq!(sequences.next_sequence()?, Some(Sequence::new("b", "K")));
        assert_eq!(sequences.next_sequence()?, None);

        Ok(())
    }

    #[test]
    fn malformed_header() {
        let mut sequences = Sequences::new(&b"\nPEPTIDE\n"[..]);
        let err = sequences.next_sequence().unwrap_err();

        assert!(matches!(err, Error::Malformed { line_no: 2, .. }));
        assert_eq!(
            err.to_string(),
            "malformed fasta at line 2: expected header, found `PEPTIDE`"
        );
    }

    #[test]
    fn empty_input() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut sequences = Sequences::new(&b"\n\n"[..]);
        assert!(sequences.next_sequence()?.is_none());
        Ok(())
    }
}
