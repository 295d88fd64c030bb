//! A cursor over the names of matched entries.

use std::io;
use std::io::BufRead;

use tracing::debug;

use crate::reader::read_line;

/// An error related to reading match names.
#[derive(Debug)]
pub enum Error {
    /// An I/O error.
    Io(io::Error),

    /// The stream ended before every match was named.
    Truncated {
        /// The number of names requested.
        expected: usize,

        /// The number of names read before the stream ended.
        found: usize,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::Truncated { expected, found } => write!(
                f,
                "truncated name stream: expected {expected} names, found {found}"
            ),
        }
    }
}

impl std::error::Error for Error {}

/// A cursor over match names, one per line, aligned with the match records.
///
/// Blank lines are skipped.
#[derive(Debug)]
pub struct Names<R>
where
    R: BufRead,
{
    /// The inner reader.
    inner: R,
}

impl<R> Names<R>
where
    R: BufRead,
{
    /// Creates a new [`Names`].
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Takes exactly `n` names.
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::reader::names::Names;
    ///
    /// let mut names = Names::new(&b"ENSP01_1\n\nENSP02_1\n"[..]);
    ///
    /// assert_eq!(names.take(2)?, ["ENSP01_1", "ENSP02_1"]);
    /// assert!(names.take(0)?.is_empty());
    /// assert!(names.take(1).is_err());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn take(&mut self, n: usize) -> Result<Vec<String>, Error> {
        let mut names = Vec::with_capacity(n);
        let mut buffer = String::new();

        while names.len() < n {
            if read_line(&mut self.inner, &mut buffer).map_err(Error::Io)? == 0 {
                debug!(expected = n, found = names.len(), "name stream ended early");
                return Err(Error::Truncated {
                    expected: n,
                    found: names.len(),
                });
            }

            let name = buffer.trim();
            if !name.is_empty() {
                names.push(name.to_string());
            }
        }

        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation() {
        let mut names = Names::new(&b"a\nb\n"[..]);
        let err = names.take(3).unwrap_err();

        assert!(matches!(
            err,
            Error::Truncated {
                expected: 3,
                found: 2
            }
        ));
        assert_eq!(
            err.to_string(),
            "truncated name stream: expected 3 names, found 2"
        );
    }

    #[test]
    fn names_are_consumed_in_order() -> Result<(), Box<dyn std::error::Error>> {
        let mut names = Names::new(&b"a\r\nb\nc"[..]);

        assert_eq!(names.take(1)?, ["a"]);
        assert_eq!(names.take(2)?, ["b", "c"]);

        Ok(())
    }
}
