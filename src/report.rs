//! Tab-delimited reports over peptide matches.
//!
//! A [`Row`] describes one hit of a peptide (or the absence of any hit), and a
//! [`Frequency`] summarizes a peptide by the individuals and differences that
//! could have produced it.

use std::collections::HashMap;
use std::collections::HashSet;
use std::io;
use std::io::BufRead;

use crate::difference;
use crate::location;
use crate::peptide::Hit;
use crate::peptide::PeptideMatch;

/// The columns of a report, in order.
pub const COLUMNS: [&str; 17] = [
    "peptide_seq",
    "peptide_seq_ll",
    "peptide_hit",
    "protein_id",
    "transcript_id",
    "gene_id",
    "chromosome",
    "protein_location_genome",
    "peptide_location_genome",
    "peptide_start_transcript",
    "peptide_end_transcript",
    "peptide_start_reference",
    "peptide_end_reference",
    "snp_location_genome",
    "sap_location_reference",
    "sap_location_transcript",
    "sap_location_peptide",
];

/// The delimiter between columns.
const COLUMN_DELIMITER: &str = "\t";

/// The delimiter between the parts of differences within a column.
const PART_DELIMITER: &str = ",";

/// The delimiter between amino acid positions within a column.
const POSITION_DELIMITER: &str = ";";

/// The delimiter between the differences of a frequency row.
const VARIANT_DELIMITER: &str = "|";

/// The delimiter that precedes a version suffix of an identifier.
const VERSION_DELIMITER: char = '.';

/// The number of fields in a line of an identifier table.
const NUM_IDENTIFIER_FIELDS: usize = 3;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to parsing a line of an identifier table.
#[derive(Debug)]
pub enum ParseError {
    /// The line has too few fields.
    IncorrectNumberOfFields(usize),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::IncorrectNumberOfFields(fields) => write!(
                f,
                "expected at least {NUM_IDENTIFIER_FIELDS} fields, found {fields} fields"
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// An error related to reading an identifier table.
#[derive(Debug)]
pub enum Error {
    /// An I/O error.
    Io(io::Error),

    /// A line could not be parsed.
    Parse {
        /// The line number (1-based).
        line_no: usize,

        /// The parse error.
        err: ParseError,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::Parse { line_no, err } => write!(f, "parse error at line {line_no}: {err}"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Identifiers
////////////////////////////////////////////////////////////////////////////////////////

/// The transcript and gene of a protein.
#[derive(Clone, Debug, Eq, PartialEq)]
struct Parents {
    /// The transcript identifier.
    transcript: String,

    /// The gene identifier.
    gene: String,
}

/// A lookup from protein identifiers to transcript and gene identifiers.
///
/// Version suffixes are stripped from every identifier.
#[derive(Clone, Debug, Default)]
pub struct Identifiers(HashMap<String, Parents>);

impl Identifiers {
    /// Reads a whitespace-delimited `protein transcript gene` table.
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::report::Identifiers;
    ///
    /// let data = b"ENSP01.3\tENST01.2\tENSG01.1\n\nENSP02\tENST02\tENSG02\n";
    /// let identifiers = Identifiers::read(&data[..])?;
    ///
    /// assert_eq!(identifiers.len(), 2);
    /// assert_eq!(identifiers.get("ENSP01"), Some(("ENST01", "ENSG01")));
    /// assert_eq!(identifiers.get("ENSP03"), None);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn read<R>(reader: R) -> Result<Self>
    where
        R: BufRead,
    {
        let mut identifiers = HashMap::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(Error::Io)?;
            let fields = line.split_ascii_whitespace().collect::<Vec<_>>();

            if fields.is_empty() {
                continue;
            }

            let &[protein, transcript, gene, ..] = fields.as_slice() else {
                return Err(Error::Parse {
                    line_no: i + 1,
                    err: ParseError::IncorrectNumberOfFields(fields.len()),
                });
            };

            identifiers.insert(
                strip_version(protein).to_string(),
                Parents {
                    transcript: strip_version(transcript).to_string(),
                    gene: strip_version(gene).to_string(),
                },
            );
        }

        Ok(Self(identifiers))
    }

    /// Gets the transcript and gene of a protein.
    pub fn get(&self, protein: &str) -> Option<(&str, &str)> {
        self.0
            .get(protein)
            .map(|parents| (parents.transcript.as_str(), parents.gene.as_str()))
    }

    /// Gets the number of proteins.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no proteins.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Reads the peptide sequences known to the caller, in search order.
///
/// The table starts with a header line. The sequence is the first
/// whitespace-delimited field of every other line and blank lines are
/// skipped.
///
/// # Examples
///
/// ```
/// let data = b"sequence\tscore\nPEPTIDE\t0.9\n\nKR\n";
/// let sequences = proteos::report::read_sequences(&data[..])?;
///
/// assert_eq!(sequences, ["PEPTIDE", "KR"]);
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn read_sequences<R>(reader: R) -> Result<Vec<String>>
where
    R: BufRead,
{
    let mut sequences = Vec::new();
    let mut seen_header = false;

    for line in reader.lines() {
        let line = line.map_err(Error::Io)?;

        let Some(sequence) = line.split_ascii_whitespace().next() else {
            continue;
        };

        if seen_header {
            sequences.push(sequence.to_string());
        } else {
            seen_header = true;
        }
    }

    Ok(sequences)
}

/// Strips the version suffix from an identifier.
fn strip_version(identifier: &str) -> &str {
    identifier
        .split_once(VERSION_DELIMITER)
        .map_or(identifier, |(stem, _)| stem)
}

////////////////////////////////////////////////////////////////////////////////////////
// Rows
////////////////////////////////////////////////////////////////////////////////////////

/// A problem encountered while building a [`Row`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Warning {
    /// The location of the hit could not be fully reconstructed.
    Location(location::Warning),

    /// A difference could not be fully parsed.
    Difference {
        /// The original difference string.
        difference: String,

        /// The problem.
        warning: difference::Warning,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::Location(warning) => write!(f, "{warning}"),
            Warning::Difference {
                difference,
                warning,
            } => write!(f, "{warning}: {difference}"),
        }
    }
}

/// The columns describing one hit.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct Columns {
    /// The base name of the protein.
    protein: String,

    /// The transcript of the protein.
    transcript: String,

    /// The gene of the protein.
    gene: String,

    /// The chromosome.
    chromosome: String,

    /// The exon locations of the protein.
    protein_location: String,

    /// The rendered genome location of the peptide.
    peptide_location: String,

    /// The first variant amino acid of the match (1-based).
    transcript_start: usize,

    /// The last variant amino acid of the match (1-based).
    transcript_end: usize,

    /// The first and last reference amino acids of the match (1-based).
    reference: Option<(usize, usize)>,

    /// The genetic part of every difference.
    snp_locations: Vec<String>,

    /// The amino acid part of every difference.
    sap_reference: Vec<String>,

    /// The variant amino acids (1-based) at which a difference starts.
    sap_transcript: Vec<usize>,

    /// The peptide amino acids (1-based) at which a difference starts.
    sap_peptide: Vec<usize>,
}

/// One row of a report.
///
/// A row carries two sequences: the peptide as the caller knows it and the
/// peptide as it was searched for (with isoleucine collapsed to leucine).
/// Unless one is provided with [`Row::with_sequence()`], the former is the
/// latter.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Row {
    /// The peptide sequence known to the caller.
    sequence: String,

    /// The peptide sequence that was searched for.
    searched: String,

    /// The hit columns, or [`None`] when the peptide has no hit.
    columns: Option<Columns>,

    /// The problems encountered while building the row.
    warnings: Vec<Warning>,
}

impl Row {
    /// Creates the row for a peptide without any hit.
    pub fn missing(searched: impl Into<String>) -> Self {
        let searched = searched.into();

        Self {
            sequence: searched.clone(),
            searched,
            columns: None,
            warnings: Vec::new(),
        }
    }

    /// Creates the row for one hit of a peptide.
    ///
    /// Every difference of the variant is reported unless a `tolerance` is
    /// provided, in which case only the differences within that many amino
    /// acids of the hit are reported.
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::peptide::Hit;
    /// use proteos::record::MatchRecord;
    /// use proteos::record::ProteinRecord;
    /// use proteos::record::VariantRecord;
    /// use proteos::report::Row;
    ///
    /// let protein = "0\tENSP01_1\tLOCS{\tchr1\t100\t109\t+\t}SCOL".parse::<ProteinRecord>()?;
    /// let variant = "0\tENSP01_1\t3M\tINDS{\tA\t}SDNI".parse::<VariantRecord>()?;
    /// let record = MatchRecord::try_new(0, 0, 1, 3)?;
    /// let hit = Hit::new(0, record, "ENSP01_1", Some(protein), Some(variant));
    ///
    /// let row = Row::from_hit("PK", &hit, None, None);
    /// assert!(row.is_hit());
    /// assert!(row.warnings().is_empty());
    /// assert!(row.to_string().starts_with("PK\tPK\tTRUE\tENSP01\t\t\tchr1\t"));
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_hit(
        searched: impl Into<String>,
        hit: &Hit,
        identifiers: Option<&Identifiers>,
        tolerance: Option<usize>,
    ) -> Self {
        let span = hit.record().span();
        let location = hit.location();

        let mut warnings = location
            .warnings()
            .iter()
            .cloned()
            .map(Warning::Location)
            .collect::<Vec<_>>();

        let protein = hit.base_name().to_string();
        let (transcript, gene) = identifiers
            .and_then(|identifiers| identifiers.get(&protein))
            .unwrap_or_default();

        let mut columns = Columns {
            transcript: transcript.to_string(),
            gene: gene.to_string(),
            protein,
            chromosome: location.chromosome().unwrap_or_default().to_string(),
            protein_location: hit
                .protein()
                .map(|protein| protein.location_summary())
                .unwrap_or_default(),
            peptide_location: location.peptide().to_string(),
            transcript_start: span.start + 1,
            transcript_end: span.end,
            reference: location
                .reference_span(span.clone())
                .map(|(start, end)| (start + 1, end + 1)),
            ..Default::default()
        };

        let mut sap_starts = HashSet::new();

        let differences = match tolerance {
            Some(tolerance) => hit.near_variants(tolerance),
            None => hit
                .variant()
                .map(|variant| variant.differences().collect())
                .unwrap_or_default(),
        };

        for difference in differences {
            if let Some(warning) = difference.warning() {
                warnings.push(Warning::Difference {
                    difference: difference.to_string(),
                    warning: warning.clone(),
                });
            }

            if let Some(range) = difference.protein_range() {
                sap_starts.insert(range.start());
            }

            let (amino_acid, genetic) = difference.parts();
            columns.sap_reference.push(amino_acid.to_string());
            columns.snp_locations.push(genetic.to_string());
        }

        for (i, position) in location.table().iter().enumerate() {
            let Some(position) = position else {
                continue;
            };

            if sap_starts.contains(&(position + 1)) {
                columns.sap_transcript.push(i + 1);

                if span.contains(&i) {
                    columns.sap_peptide.push(i - span.start + 1);
                }
            }
        }

        let searched = searched.into();

        Self {
            sequence: searched.clone(),
            searched,
            columns: Some(columns),
            warnings,
        }
    }

    /// Replaces the peptide sequence known to the caller.
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::report::Row;
    ///
    /// let row = Row::missing("PEPTLDE");
    /// assert_eq!(row.sequence(), "PEPTLDE");
    ///
    /// let row = row.with_sequence("PEPTIDE");
    /// assert_eq!(row.sequence(), "PEPTIDE");
    /// assert_eq!(row.searched(), "PEPTLDE");
    /// assert!(row.to_string().starts_with("PEPTIDE\tPEPTLDE\tFALSE\t"));
    /// ```
    pub fn with_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.sequence = sequence.into();
        self
    }

    /// Gets the peptide sequence known to the caller.
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// Gets the peptide sequence that was searched for.
    pub fn searched(&self) -> &str {
        &self.searched
    }

    /// Whether this row describes a hit.
    pub fn is_hit(&self) -> bool {
        self.columns.is_some()
    }

    /// Gets the problems encountered while building the row.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Some(columns) = &self.columns else {
            return write!(
                f,
                "{}{COLUMN_DELIMITER}{}{COLUMN_DELIMITER}FALSE{}",
                self.sequence,
                self.searched,
                COLUMN_DELIMITER.repeat(COLUMNS.len() - 3)
            );
        };

        let (reference_start, reference_end) = match columns.reference {
            Some((start, end)) => (start.to_string(), end.to_string()),
            None => (String::new(), String::new()),
        };

        let join = |positions: &[usize]| {
            positions
                .iter()
                .map(|position| position.to_string())
                .collect::<Vec<_>>()
                .join(POSITION_DELIMITER)
        };

        let fields = [
            self.sequence.clone(),
            self.searched.clone(),
            String::from("TRUE"),
            columns.protein.clone(),
            columns.transcript.clone(),
            columns.gene.clone(),
            columns.chromosome.clone(),
            columns.protein_location.clone(),
            columns.peptide_location.clone(),
            columns.transcript_start.to_string(),
            columns.transcript_end.to_string(),
            reference_start,
            reference_end,
            columns.snp_locations.join(PART_DELIMITER),
            columns.sap_reference.join(PART_DELIMITER),
            join(&columns.sap_transcript),
            join(&columns.sap_peptide),
        ];

        write!(f, "{}", fields.join(COLUMN_DELIMITER))
    }
}

/// Builds every row for a peptide: one per hit, or a single row when the
/// peptide has no hit.
///
/// See [`Row::from_hit()`] for the meaning of `tolerance`.
pub fn rows(
    peptide: &PeptideMatch,
    identifiers: Option<&Identifiers>,
    tolerance: Option<usize>,
) -> Vec<Row> {
    if peptide.is_empty() {
        return vec![Row::missing(peptide.sequence())];
    }

    peptide
        .hits()
        .iter()
        .map(|hit| Row::from_hit(peptide.sequence(), hit, identifiers, tolerance))
        .collect()
}

////////////////////////////////////////////////////////////////////////////////////////
// Frequencies
////////////////////////////////////////////////////////////////////////////////////////

/// A peptide summarized by the individuals and differences that could have
/// produced it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frequency {
    /// The peptide sequence.
    sequence: String,

    /// The number of individuals carrying a matched variant.
    owners: usize,

    /// The differences that could have produced the peptide, sorted.
    variants: Vec<String>,
}

impl Frequency {
    /// Summarizes a peptide.
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::peptide::Builder;
    /// use proteos::peptide::Hit;
    /// use proteos::reader::sequences::Sequence;
    /// use proteos::record::MatchRecord;
    /// use proteos::record::VariantRecord;
    /// use proteos::report::Frequency;
    ///
    /// let variant = "0\t3M\tINDS{\tA\tB\t}SDNI\tDIFS{\t2-2K>R:90A>G\t}SFID"
    ///     .parse::<VariantRecord>()?;
    ///
    /// let peptide = Builder::default()
    ///     .index(0)?
    ///     .sequence(Sequence::new("lookie", "PEP"))?
    ///     .push_hit(Hit::new(0, MatchRecord::try_new(0, 0, 0, 3)?, "ENSP01_1", None, Some(variant)))
    ///     .try_build()?;
    ///
    /// let frequency = Frequency::new(&peptide);
    /// assert_eq!(frequency.owners(), 2);
    /// assert_eq!(frequency.to_string(), "PEP\t2\t2-2K>R:90A>G");
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(peptide: &PeptideMatch) -> Self {
        let mut variants = peptide
            .variant_set()
            .into_iter()
            .map(|difference| difference.to_string())
            .collect::<Vec<_>>();
        variants.sort();

        Self {
            sequence: peptide.sequence().to_string(),
            owners: peptide.ownership_set().len(),
            variants,
        }
    }

    /// Gets the peptide sequence.
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// Gets the number of individuals carrying a matched variant.
    pub fn owners(&self) -> usize {
        self.owners
    }

    /// Gets the differences that could have produced the peptide.
    pub fn variants(&self) -> &[String] {
        &self.variants
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{COLUMN_DELIMITER}{}{COLUMN_DELIMITER}{}",
            self.sequence,
            self.owners,
            self.variants.join(VARIANT_DELIMITER)
        )
    }
}
