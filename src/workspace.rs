//! The work directory shared with the search engine.
//!
//! A search writes its results into a work directory under fixed names. A
//! [`Workspace`] runs the search (unless its results are already present),
//! and a [`Session`] reads the results with a merge-join [`Reader`]. Any file
//! the workspace created is removed when the session is closed or dropped, or
//! straight away if the search fails.

use std::fs;
use std::fs::File;
use std::io;
use std::io::BufRead;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use flate2::read::GzDecoder;
use tracing::debug;
use tracing::warn;

use crate::Reader;
use crate::peptide::PeptideMatch;
use crate::reader;

/// The name of the query fasta written for in-memory peptides.
pub const QUERY_FILE: &str = "searchList.fa";

/// The name of the binary match records.
pub const MATCHES_FILE: &str = "searchInds.bin";

/// The name of the match names.
pub const NAMES_FILE: &str = "searchNames.tsv";

/// The name of the protein table.
pub const PROTEINS_FILE: &str = "protdata.tsv";

/// The name of the variant table.
pub const VARIANTS_FILE: &str = "vardata.tsv";

/// The header written for each in-memory peptide.
const QUERY_HEADER: &str = "lookie";

/// The extension of gzipped inputs.
const GZIP_EXTENSION: &str = "gz";

/// A buffered input stream.
pub type Input = Box<dyn BufRead>;

/// A merge-join reader over files.
pub type FileReader = Reader<Input, Input, Input, Input, Input>;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to a [`Workspace`].
#[derive(Debug)]
pub enum Error {
    /// The work directory could not be created.
    CreateDirectory(io::Error),

    /// The query peptides could not be written.
    WriteQuery(io::Error),

    /// The search engine failed.
    Engine(io::Error),

    /// A result file could not be opened.
    Open {
        /// The path of the file.
        path: PathBuf,

        /// The underlying error.
        err: io::Error,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::CreateDirectory(err) => write!(f, "could not create work directory: {err}"),
            Error::WriteQuery(err) => write!(f, "could not write query peptides: {err}"),
            Error::Engine(err) => write!(f, "search failed: {err}"),
            Error::Open { path, err } => {
                write!(f, "could not open `{}`: {err}", path.display())
            }
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Queries and engines
////////////////////////////////////////////////////////////////////////////////////////

/// The peptides to search for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Query {
    /// A fasta file of peptides.
    Fasta(PathBuf),

    /// Peptides held in memory.
    Peptides(Vec<String>),
}

/// A peptide search engine.
///
/// Given the query fasta, an engine writes the match records, match names,
/// protein table and variant table into the work directory under
/// [`MATCHES_FILE`], [`NAMES_FILE`], [`PROTEINS_FILE`] and [`VARIANTS_FILE`],
/// each sorted as the [`Reader`] expects.
pub trait Engine {
    /// Runs the search.
    fn search(&mut self, query: &Path, work: &Path) -> io::Result<()>;
}

impl<F> Engine for F
where
    F: FnMut(&Path, &Path) -> io::Result<()>,
{
    fn search(&mut self, query: &Path, work: &Path) -> io::Result<()> {
        self(query, work)
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Workspaces
////////////////////////////////////////////////////////////////////////////////////////

/// A work directory holding the results of a search.
#[derive(Debug)]
pub struct Workspace {
    /// The work directory.
    directory: PathBuf,

    /// The query fasta.
    query: PathBuf,

    /// The files this workspace created.
    owned: Vec<PathBuf>,
}

impl Workspace {
    /// Prepares a work directory, running the search when its results are
    /// not already present.
    ///
    /// When the search runs, every result file (and the query fasta, if it
    /// was written here) is owned by the workspace. If the search fails,
    /// those files are removed before the error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::fs;
    /// use std::io;
    /// use std::path::Path;
    ///
    /// use proteos::workspace;
    /// use proteos::workspace::Query;
    /// use proteos::workspace::Workspace;
    ///
    /// let work = tempdir::TempDir::new("proteos")?;
    ///
    /// let mut engine = |_: &Path, work: &Path| -> io::Result<()> {
    ///     for file in workspace::RESULT_FILES {
    ///         fs::write(work.join(file), b"")?;
    ///     }
    ///     Ok(())
    /// };
    ///
    /// let query = Query::Peptides(vec![String::from("PEPTIDE")]);
    /// let mut session = Workspace::prepare(work.path(), query, &mut engine)?.open()?;
    ///
    /// let peptide = session.next_match()?.unwrap();
    /// assert_eq!(peptide.sequence(), "PEPTIDE");
    /// assert!(peptide.is_empty());
    ///
    /// session.close()?;
    /// assert!(!work.path().join(workspace::MATCHES_FILE).exists());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn prepare(
        directory: impl Into<PathBuf>,
        query: Query,
        engine: &mut impl Engine,
    ) -> Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory).map_err(Error::CreateDirectory)?;

        let (query, written) = match query {
            Query::Fasta(path) => (path, None),
            Query::Peptides(peptides) => (directory.join(QUERY_FILE), Some(peptides)),
        };

        let mut workspace = Self {
            directory,
            query,
            owned: Vec::new(),
        };

        if workspace.directory.join(MATCHES_FILE).exists() {
            debug!(
                directory = %workspace.directory.display(),
                "search results are already present"
            );
            return Ok(workspace);
        }

        workspace.owned = RESULT_FILES
            .iter()
            .map(|file| workspace.directory.join(file))
            .collect();

        if written.is_some() {
            workspace.owned.push(workspace.query.clone());
        }

        // Dropping the workspace on any failure below removes the owned files.
        if let Some(peptides) = written {
            write_query(&workspace.query, &peptides).map_err(Error::WriteQuery)?;
        }

        engine
            .search(&workspace.query, &workspace.directory)
            .map_err(Error::Engine)?;

        Ok(workspace)
    }

    /// Uses a work directory that already holds the results of a search.
    ///
    /// Nothing is owned, so nothing is removed when the session closes.
    pub fn existing(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        let query = directory.join(QUERY_FILE);

        Self {
            directory,
            query,
            owned: Vec::new(),
        }
    }

    /// Reads the query peptides from `path` instead of the default location.
    pub fn with_query(mut self, path: impl Into<PathBuf>) -> Self {
        self.query = path.into();
        self
    }

    /// Gets the work directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Gets the path of the query fasta.
    pub fn query(&self) -> &Path {
        &self.query
    }

    /// Gets the files that this workspace will remove.
    pub fn owned(&self) -> &[PathBuf] {
        &self.owned
    }

    /// Opens every result and hands ownership of the files to a [`Session`].
    pub fn open(mut self) -> Result<Session> {
        let open = |path: PathBuf| {
            open_input(&path).map_err(|err| Error::Open { path, err })
        };

        let reader = Reader::new(
            open(self.query.clone())?,
            open(self.directory.join(MATCHES_FILE))?,
            open(self.directory.join(NAMES_FILE))?,
            open(self.directory.join(PROTEINS_FILE))?,
            open(self.directory.join(VARIANTS_FILE))?,
        );

        Ok(Session {
            reader: Some(reader),
            owned: std::mem::take(&mut self.owned),
        })
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(err) = remove_files(&mut self.owned) {
            warn!("could not remove work files: {err}");
        }
    }
}

/// The files written by the search engine.
pub const RESULT_FILES: [&str; 4] = [MATCHES_FILE, NAMES_FILE, PROTEINS_FILE, VARIANTS_FILE];

////////////////////////////////////////////////////////////////////////////////////////
// Sessions
////////////////////////////////////////////////////////////////////////////////////////

/// An open set of search results.
pub struct Session {
    /// The reader, until the session is closed.
    reader: Option<FileReader>,

    /// The files to remove when the session is closed.
    owned: Vec<PathBuf>,
}

impl Session {
    /// Reads the next peptide, or [`None`] once the peptides (or the
    /// session) have ended.
    pub fn next_match(&mut self) -> std::result::Result<Option<PeptideMatch>, reader::Error> {
        match self.reader.as_mut() {
            Some(reader) => reader.next_match(),
            None => Ok(None),
        }
    }

    /// Returns an iterator over the remaining peptides.
    pub fn matches(
        &mut self,
    ) -> impl Iterator<Item = std::result::Result<PeptideMatch, reader::Error>> + '_ {
        std::iter::from_fn(move || self.next_match().transpose())
    }

    /// Closes every stream and removes the files this session owns.
    ///
    /// Closing more than once is harmless.
    pub fn close(&mut self) -> io::Result<()> {
        self.reader = None;
        remove_files(&mut self.owned)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("open", &self.reader.is_some())
            .field("owned", &self.owned)
            .finish()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!("could not remove work files: {err}");
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Files
////////////////////////////////////////////////////////////////////////////////////////

/// Opens a file for buffered reading, decompressing it if it is gzipped.
pub fn open_input(path: &Path) -> io::Result<Input> {
    let file = File::open(path)?;

    let input: Input = match path.extension().and_then(|ext| ext.to_str()) {
        Some(GZIP_EXTENSION) => Box::new(BufReader::new(GzDecoder::new(file))),
        _ => Box::new(BufReader::new(file)),
    };

    Ok(input)
}

/// Writes in-memory peptides as a fasta file.
fn write_query(path: &Path, peptides: &[String]) -> io::Result<()> {
    let mut writer = File::create(path).map(BufWriter::new)?;

    for peptide in peptides {
        writeln!(writer, ">{QUERY_HEADER}")?;
        writeln!(writer, "{peptide}")?;
    }

    writer.flush()
}

/// Removes every file in `paths`, emptying it.
///
/// Files that do not exist are skipped. Every file is attempted, and the first
/// failure is returned.
fn remove_files(paths: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut result = Ok(());

    for path in paths.drain(..) {
        match fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed work file"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tempdir::TempDir;

    use super::*;
    use crate::record::MatchRecord;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    /// Writes one match for the first peptide.
    fn write_results(work: &Path) -> io::Result<()> {
        fs::write(
            work.join(MATCHES_FILE),
            MatchRecord::try_new(0, 0, 0, 3)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?
                .to_bytes(),
        )?;
        fs::write(work.join(NAMES_FILE), "ENSP01_1\n")?;
        fs::write(
            work.join(PROTEINS_FILE),
            "0\tENSP01_1\tLOCS{\tchr1\t100\t109\t+\t}SCOL\n",
        )?;
        fs::write(work.join(VARIANTS_FILE), "0\t3M\tINDS{\tHG00096\t}SDNI\n")
    }

    #[test]
    fn prepared_workspaces_clean_up_after_themselves() -> TestResult {
        let tmp = TempDir::new("proteos")?;
        let work = tmp.path().join("work");

        let mut engine = |query: &Path, work: &Path| -> io::Result<()> {
            assert_eq!(fs::read_to_string(query)?, ">lookie\nPEP\n>lookie\nKR\n");
            write_results(work)
        };

        let query = Query::Peptides(vec![String::from("PEP"), String::from("KR")]);
        let workspace = Workspace::prepare(&work, query, &mut engine)?;
        assert_eq!(workspace.owned().len(), 5);

        let mut session = workspace.open()?;
        let peptides = session.matches().collect::<std::result::Result<Vec<_>, _>>()?;
        assert_eq!(peptides.len(), 2);
        assert_eq!(peptides[0].hits()[0].name(), "ENSP01_1");
        assert!(peptides[1].is_empty());

        session.close()?;
        session.close()?;
        assert!(session.next_match()?.is_none());

        for file in RESULT_FILES.iter().chain([&QUERY_FILE]) {
            assert!(!work.join(file).exists(), "{file} was not removed");
        }
        assert!(work.exists());

        Ok(())
    }

    #[test]
    fn failed_searches_remove_partial_results() -> TestResult {
        let tmp = TempDir::new("proteos")?;

        let mut engine = |_: &Path, work: &Path| -> io::Result<()> {
            fs::write(work.join(MATCHES_FILE), b"")?;
            Err(io::Error::new(io::ErrorKind::Other, "engine crashed"))
        };

        let query = Query::Peptides(vec![String::from("PEP")]);
        let err = Workspace::prepare(tmp.path(), query, &mut engine).unwrap_err();

        assert!(matches!(err, Error::Engine(_)));
        assert_eq!(err.to_string(), "search failed: engine crashed");
        assert!(!tmp.path().join(MATCHES_FILE).exists());
        assert!(!tmp.path().join(QUERY_FILE).exists());

        Ok(())
    }

    #[test]
    fn existing_results_are_reused_and_kept() -> TestResult {
        let tmp = TempDir::new("proteos")?;
        write_results(tmp.path())?;
        fs::write(tmp.path().join("peptides.fa"), ">p\nPEP\n")?;

        let calls = Cell::new(0);
        let mut engine = |_: &Path, _: &Path| -> io::Result<()> {
            calls.set(calls.get() + 1);
            Ok(())
        };

        let query = Query::Fasta(tmp.path().join("peptides.fa"));
        let workspace = Workspace::prepare(tmp.path(), query, &mut engine)?;
        assert_eq!(calls.get(), 0);
        assert!(workspace.owned().is_empty());

        let mut session = workspace.open()?;
        assert_eq!(session.next_match()?.map(|p| p.len()), Some(1));
        drop(session);

        for file in RESULT_FILES {
            assert!(tmp.path().join(file).exists());
        }

        Ok(())
    }

    #[test]
    fn dropping_a_session_removes_owned_files() -> TestResult {
        let tmp = TempDir::new("proteos")?;
        let query = tmp.path().join("peptides.fa");
        fs::write(&query, ">p\nPEP\n")?;

        let mut engine = |_: &Path, work: &Path| write_results(work);
        let session = Workspace::prepare(tmp.path(), Query::Fasta(query.clone()), &mut engine)?
            .open()?;
        drop(session);

        assert!(!tmp.path().join(MATCHES_FILE).exists());
        assert!(query.exists());

        Ok(())
    }

    #[test]
    fn missing_results_fail_to_open() -> TestResult {
        let tmp = TempDir::new("proteos")?;
        let err = Workspace::existing(tmp.path()).open().unwrap_err();

        assert!(matches!(err, Error::Open { .. }));

        Ok(())
    }

    #[test]
    fn gzipped_inputs() -> TestResult {
        let tmp = TempDir::new("proteos")?;
        let path = tmp.path().join("peptides.fa.gz");

        let mut encoder = GzEncoder::new(File::create(&path)?, Compression::default());
        encoder.write_all(b">p\nPEPTIDE\n")?;
        encoder.finish()?;

        let mut lines = open_input(&path)?.lines();
        assert_eq!(lines.next().transpose()?, Some(String::from(">p")));
        assert_eq!(lines.next().transpose()?, Some(String::from("PEPTIDE")));

        Ok(())
    }
}
