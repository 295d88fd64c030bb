//! A builder for a peptide match.

use crate::peptide::Hit;
use crate::peptide::PeptideMatch;
use crate::reader::sequences::Sequence;

/// An error that occurs when a required field was never provided to the
/// [`Builder`].
#[derive(Debug)]
pub enum MissingError {
    /// No peptide index was provided to the [`Builder`].
    Index,

    /// No sequence was provided to the [`Builder`].
    Sequence,
}

impl std::fmt::Display for MissingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingError::Index => write!(f, "index"),
            MissingError::Sequence => write!(f, "sequence"),
        }
    }
}

impl std::error::Error for MissingError {}

/// An error that occurs when a singular field was provided multiple times to
/// the [`Builder`].
#[derive(Debug)]
pub enum MultipleError {
    /// The peptide index was provided multiple times to the [`Builder`].
    Index,

    /// The sequence was provided multiple times to the [`Builder`].
    Sequence,
}

impl std::fmt::Display for MultipleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MultipleError::Index => write!(f, "index"),
            MultipleError::Sequence => write!(f, "sequence"),
        }
    }
}

impl std::error::Error for MultipleError {}

/// An error related to a [`Builder`].
#[derive(Debug)]
pub enum Error {
    /// An error where a required field was never provided to the [`Builder`].
    Missing(MissingError),

    /// An error where a singular field was provided to the [`Builder`] more
    /// than once.
    Multiple(MultipleError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Missing(err) => write!(f, "missing required field: {err}"),
            Error::Multiple(err) => write!(f, "singular field set multiple times: {err}"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

/// A builder for a [`PeptideMatch`].
#[derive(Debug, Default)]
pub struct Builder {
    /// The index of the peptide.
    index: Option<u64>,

    /// The query sequence.
    sequence: Option<Sequence>,

    /// The hits.
    hits: Vec<Hit>,
}

impl Builder {
    /// Sets the peptide index for the [`Builder`].
    pub fn index(mut self, index: u64) -> Result<Self> {
        if self.index.is_some() {
            return Err(Error::Multiple(MultipleError::Index));
        }

        self.index = Some(index);
        Ok(self)
    }

    /// Sets the query sequence for the [`Builder`].
    pub fn sequence(mut self, sequence: Sequence) -> Result<Self> {
        if self.sequence.is_some() {
            return Err(Error::Multiple(MultipleError::Sequence));
        }

        self.sequence = Some(sequence);
        Ok(self)
    }

    /// Pushes a [`Hit`] into the [`Builder`].
    pub fn push_hit(mut self, hit: Hit) -> Self {
        self.hits.push(hit);
        self
    }

    /// Consumes `self` to attempt to build a [`PeptideMatch`].
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::peptide::Builder;
    /// use proteos::peptide::Hit;
    /// use proteos::reader::sequences::Sequence;
    /// use proteos::record::MatchRecord;
    ///
    /// let peptide = Builder::default()
    ///     .index(0)?
    ///     .sequence(Sequence::new("lookie", "PEPTIDE"))?
    ///     .push_hit(Hit::new(0, MatchRecord::try_new(0, 0, 3, 10)?, "ENSP01_1", None, None))
    ///     .try_build()?;
    ///
    /// assert_eq!(peptide.sequence(), "PEPTIDE");
    /// assert_eq!(peptide.len(), 1);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_build(self) -> Result<PeptideMatch> {
        let index = self.index.ok_or(Error::Missing(MissingError::Index))?;
        let sequence = self
            .sequence
            .ok_or(Error::Missing(MissingError::Sequence))?;
        let (name, residues) = sequence.into_parts();

        Ok(PeptideMatch {
            index,
            name,
            sequence: residues,
            hits: self.hits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields() {
        let err = Builder::default().index(0).unwrap().try_build().unwrap_err();
        assert!(matches!(err, Error::Missing(MissingError::Sequence)));
        assert_eq!(err.to_string(), "missing required field: sequence");

        let err = Builder::default()
            .sequence(Sequence::new("a", "K"))
            .unwrap()
            .try_build()
            .unwrap_err();
        assert!(matches!(err, Error::Missing(MissingError::Index)));
    }

    #[test]
    fn multiple_fields() {
        let err = Builder::default().index(0).unwrap().index(1).unwrap_err();
        assert!(matches!(err, Error::Multiple(MultipleError::Index)));
        assert_eq!(err.to_string(), "singular field set multiple times: index");
    }
}
