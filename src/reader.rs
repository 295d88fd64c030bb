//! A merge-join reader over the outputs of a peptide search.
//!
//! Five streams are read in lockstep:
//!
//! * the query peptides (fasta), one record per peptide index,
//! * the binary match records, sorted by peptide index,
//! * the names of the matched entries, one line per match record,
//! * the protein table, sorted by match index, and
//! * the variant table, sorted by match index.
//!
//! Each call to [`Reader::next_match()`] consumes one peptide and every
//! record belonging to it, producing one [`PeptideMatch`].

use std::io;
use std::io::BufRead;
use std::iter;

use tracing::debug;

use crate::peptide;
use crate::peptide::Hit;
use crate::peptide::PeptideMatch;
use crate::record::ProteinRecord;
use crate::record::VariantRecord;
use crate::record::protein;
use crate::record::variant;

pub mod matches;
pub mod names;
pub mod sequences;
pub mod table;

pub use matches::Matches;
pub use names::Names;
pub use sequences::Sequences;
pub use table::Table;

/// The new line character.
const NEW_LINE: char = '\n';

/// The carriage return character.
const CARRIAGE_RETURN: char = '\r';

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to a [`Reader`].
#[derive(Debug)]
pub enum Error {
    /// The query sequences could not be read.
    Sequences(sequences::Error),

    /// The match records could not be read.
    Matches(matches::Error),

    /// The match names could not be read.
    Names(names::Error),

    /// The protein table could not be read.
    Proteins(table::Error<protein::ParseError>),

    /// The variant table could not be read.
    Variants(table::Error<variant::ParseError>),

    /// The streams could not be assembled into a peptide match.
    Peptide(peptide::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Sequences(err) => write!(f, "sequence error: {err}"),
            Error::Matches(err) => write!(f, "match error: {err}"),
            Error::Names(err) => write!(f, "name error: {err}"),
            Error::Proteins(err) => write!(f, "protein table error: {err}"),
            Error::Variants(err) => write!(f, "variant table error: {err}"),
            Error::Peptide(err) => write!(f, "peptide error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Reader
////////////////////////////////////////////////////////////////////////////////////////

/// The state of the reader.
#[derive(Debug, Eq, PartialEq)]
enum State {
    /// Peptides remain to be read.
    Reading,

    /// The query sequences are exhausted or a fatal error occurred.
    Done,
}

/// A merge-join reader.
///
/// The reader is single-pass: once it reports the end of the peptides (or an
/// error), every later call reports the end of the peptides.
#[derive(Debug)]
pub struct Reader<S, M, N, P, V>
where
    S: BufRead,
    M: BufRead,
    N: BufRead,
    P: BufRead,
    V: BufRead,
{
    /// The query sequences.
    sequences: Sequences<S>,

    /// The match records.
    matches: Matches<M>,

    /// The match names.
    names: Names<N>,

    /// The protein table.
    proteins: Table<P, ProteinRecord>,

    /// The variant table.
    variants: Table<V, VariantRecord>,

    /// The index of the next peptide.
    peptide_index: u64,

    /// The match index of the first match of the next peptide.
    match_index: u64,

    /// The state of the reader.
    state: State,
}

impl<S, M, N, P, V> Reader<S, M, N, P, V>
where
    S: BufRead,
    M: BufRead,
    N: BufRead,
    P: BufRead,
    V: BufRead,
{
    /// Creates a new merge-join [`Reader`].
    ///
    /// # Examples
    ///
    /// ```
    /// let empty: &[u8] = b"";
    /// let mut reader = proteos::Reader::new(empty, empty, empty, empty, empty);
    /// assert!(reader.next_match()?.is_none());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(sequences: S, matches: M, names: N, proteins: P, variants: V) -> Self {
        Self {
            sequences: Sequences::new(sequences),
            matches: Matches::new(matches),
            names: Names::new(names),
            proteins: Table::new(proteins),
            variants: Table::new(variants),
            peptide_index: 0,
            match_index: 0,
            state: State::Reading,
        }
    }

    /// Gets the index of the next peptide to be read.
    pub fn peptide_index(&self) -> u64 {
        self.peptide_index
    }

    /// Gets the match index of the first match of the next peptide.
    pub fn match_index(&self) -> u64 {
        self.match_index
    }

    /// Reads the next peptide and everything that matched it.
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::record::MatchRecord;
    ///
    /// let sequences = b">p0\nPEPTIDE\n>p1\nKR\n";
    /// let matches = [
    ///     MatchRecord::try_new(0, 0, 2, 9)?.to_bytes(),
    ///     MatchRecord::try_new(0, 0, 10, 17)?.to_bytes(),
    /// ]
    /// .concat();
    /// let names = b"ENSP01_1\nENSP02_1\n";
    /// let proteins = b"1\tENSP02_1\tLOCS{\tchr1\t100\t160\t+\t}SCOL\n";
    /// let variants = b"0\tENSP01_1\t20M\tINDS{\tHG00096\t}SDNI\n";
    ///
    /// let mut reader = proteos::Reader::new(
    ///     &sequences[..],
    ///     &matches[..],
    ///     &names[..],
    ///     &proteins[..],
    ///     &variants[..],
    /// );
    ///
    /// let peptide = reader.next_match()?.unwrap();
    /// assert_eq!(peptide.sequence(), "PEPTIDE");
    /// assert_eq!(peptide.len(), 2);
    /// assert!(peptide.hits()[0].protein().is_none());
    /// assert!(peptide.hits()[1].variant().is_none());
    ///
    /// let peptide = reader.next_match()?.unwrap();
    /// assert_eq!(peptide.sequence(), "KR");
    /// assert!(peptide.is_empty());
    ///
    /// assert!(reader.next_match()?.is_none());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn next_match(&mut self) -> Result<Option<PeptideMatch>> {
        if self.state == State::Done {
            return Ok(None);
        }

        let result = self.read_peptide();

        if !matches!(result, Ok(Some(_))) {
            self.state = State::Done;
        }

        result
    }

    /// Reads one peptide from every stream.
    fn read_peptide(&mut self) -> Result<Option<PeptideMatch>> {
        // (1) Reads the query sequence. The end of the sequences is the end of
        // the join.
        let sequence = match self.sequences.next_sequence().map_err(Error::Sequences)? {
            Some(sequence) => sequence,
            None => {
                if self.matches.has_remaining().map_err(Error::Matches)? {
                    debug!(
                        peptides = self.peptide_index,
                        "match records remain after the last peptide"
                    );
                }

                return Ok(None);
            }
        };

        // (2) Drains every match record for this peptide.
        let records = self
            .matches
            .take_group(self.peptide_index)
            .map_err(Error::Matches)?;

        // (3) Reads one name for each match record.
        let names = self.names.take(records.len()).map_err(Error::Names)?;

        // (4) Fills the protein and variant slots for the new matches.
        let proteins = self
            .proteins
            .fill(self.match_index, records.len())
            .map_err(Error::Proteins)?;
        let variants = self
            .variants
            .fill(self.match_index, records.len())
            .map_err(Error::Variants)?;

        // (5) Assembles the peptide and advances both counters.
        let mut builder = peptide::Builder::default()
            .index(self.peptide_index)
            .and_then(|builder| builder.sequence(sequence))
            .map_err(Error::Peptide)?;

        let hits = records
            .into_iter()
            .zip(names)
            .zip(proteins.into_iter().zip(variants));

        for (match_index, ((record, name), (protein, variant))) in (self.match_index..).zip(hits) {
            builder = builder.push_hit(Hit::new(match_index, record, name, protein, variant));
        }

        let peptide = builder.try_build().map_err(Error::Peptide)?;

        self.peptide_index += 1;
        self.match_index += peptide.len() as u64;

        Ok(Some(peptide))
    }

    /// Returns an iterator over the remaining peptides.
    ///
    /// # Examples
    ///
    /// ```
    /// let empty: &[u8] = b"";
    /// let sequences = b">p0\nPEPTIDE\n>p1\nKR\n";
    /// let mut reader = proteos::Reader::new(&sequences[..], empty, empty, empty, empty);
    ///
    /// let peptides = reader.matches().collect::<Result<Vec<_>, _>>()?;
    /// assert_eq!(peptides.len(), 2);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn matches(&mut self) -> impl Iterator<Item = Result<PeptideMatch>> + '_ {
        iter::from_fn(move || self.next_match().transpose())
    }
}

/// Reads a line from a buffered reader, removing the line ending.
pub(crate) fn read_line<T>(reader: &mut T, buffer: &mut String) -> io::Result<usize>
where
    T: BufRead,
{
    buffer.clear();

    let n = reader.read_line(buffer)?;

    if buffer.ends_with(NEW_LINE) {
        buffer.pop();

        if buffer.ends_with(CARRIAGE_RETURN) {
            buffer.pop();
        }
    }

    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MatchRecord;

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
    fn test_read_line() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut data = &b"hello\r\nworld!"[..];
        let mut buffer = String::new();

        assert_eq!(read_line(&mut data, &mut buffer)?, 7);
        assert_eq!(buffer, "hello");
        assert_eq!(read_line(&mut data, &mut buffer)?, 6);
        assert_eq!(buffer, "world!");
        assert_eq!(read_line(&mut data, &mut buffer)?, 0);

        Ok(())
    }

    #[test]
    fn three_matches_for_one_peptide() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let sequences = b">lookie\nPEPTIDE\n";
        let matches = encode(&[(0, 0, 7), (0, 3, 10), (0, 5, 12)]);
        let names = b"ENSP01_1\nENSP02_1\nENSP03_1\n";
        let proteins = b"0\tENSP01_1\tLOCS{\tchr1\t100\t121\t+\t}SCOL\n\
                         2\tENSP03_1\tLOCS{\tchr2\t500\t545\t-\t}SCOL\n";
        let variants = b"1\tENSP02_1\t???\tINDS{\tHG00096\t}SDNI\n";

        let mut reader = Reader::new(
            &sequences[..],
            &matches[..],
            &names[..],
            &proteins[..],
            &variants[..],
        );

        let peptide = reader.next_match()?.unwrap();
        let hits = peptide.hits();
        assert_eq!(peptide.len(), 3);
        assert_eq!(peptide.name(), "lookie");
        assert_eq!(hits[2].name(), "ENSP03_1");
        assert_eq!(hits[1].record().span(), 3..10);
        assert!(hits[0].protein().is_some());
        assert!(hits[1].protein().is_none());
        assert!(hits[2].protein().is_some());
        assert!(hits[0].variant().is_none());
        assert_eq!(hits[1].cigar(), Some("???"));

        assert_eq!(reader.peptide_index(), 1);
        assert_eq!(reader.match_index(), 3);

        assert!(reader.next_match()?.is_none());
        assert!(reader.next_match()?.is_none());

        Ok(())
    }

    #[test]
    fn match_indices_accumulate_across_peptides(
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let sequences = b">a\nAAA\n>b\nCCC\n>c\nDDD\n";
        let matches = encode(&[(0, 0, 3), (2, 0, 3), (2, 4, 7)]);
        let names = b"X_1\nY_1\nZ_1\n";
        let variants = b"0\t3M\tINDS{\ta\t}SDNI\n2\t3M\tINDS{\tc\t}SDNI\n";
        let empty: &[u8] = b"";

        let mut reader = Reader::new(
            &sequences[..],
            &matches[..],
            &names[..],
            empty,
            &variants[..],
        );

        let peptides = reader.matches().collect::<Result<Vec<_>>>()?;
        assert_eq!(peptides.len(), 3);
        assert_eq!(peptides[0].hits()[0].name(), "X_1");
        assert!(peptides[1].is_empty());
        assert_eq!(peptides[2].index(), 2);

        let hits = peptides[2].hits();
        assert_eq!(hits[0].match_index(), 1);
        assert_eq!(hits[1].match_index(), 2);
        assert_eq!(hits[1].name(), "Z_1");
        assert!(hits[0].variant().is_none());
        assert_eq!(
            hits[1].variant().map(|v| v.individuals().to_vec()),
            Some(vec![String::from("c")])
        );

        Ok(())
    }

    #[test]
    fn decreasing_match_keys_are_fatal() {
        let sequences = b">a\nAAA\n>b\nCCC\n";
        let matches = encode(&[(1, 0, 3), (0, 0, 3)]);
        let names = b"X_1\nY_1\n";
        let empty: &[u8] = b"";

        let mut reader = Reader::new(&sequences[..], &matches[..], &names[..], empty, empty);

        assert!(reader.next_match().is_ok());

        let err = reader.next_match().unwrap_err();
        assert!(matches!(
            err,
            Error::Matches(matches::Error::Unsorted { found: 0, current: 1 })
        ));

        assert!(reader.next_match().unwrap().is_none());
    }

    #[test]
    fn truncated_names_are_fatal() {
        let sequences = b">a\nAAA\n";
        let matches = encode(&[(0, 0, 3), (0, 1, 4)]);
        let names = b"X_1\n";
        let empty: &[u8] = b"";

        let mut reader = Reader::new(&sequences[..], &matches[..], &names[..], empty, empty);

        assert!(matches!(
            reader.next_match(),
            Err(Error::Names(names::Error::Truncated {
                expected: 2,
                found: 1
            }))
        ));
    }

    #[test]
    fn malformed_sequences_are_fatal() {
        let empty: &[u8] = b"";
        let mut reader = Reader::new(&b"AAA\n"[..], empty, empty, empty, empty);

        let err = reader.next_match().unwrap_err();
        assert!(err.to_string().starts_with("sequence error: malformed fasta"));
    }
}
