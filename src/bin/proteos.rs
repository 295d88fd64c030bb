//! A binary to report every match of a peptide search.
//!
//! ```shell
//! cargo run --release --bin=proteos --features=binaries -- work/
//! ```
//!
//! The work directory must already hold the results of a search. Each input
//! may be gzipped, in which case its name must end in `.gz`.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufRead as _;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::ValueEnum;
use clap_verbosity_flag::Verbosity;
use proteos::peptide::PeptideMatch;
use proteos::report;
use proteos::report::Frequency;
use proteos::report::Identifiers;
use proteos::report::Row;
use proteos::workspace;
use proteos::workspace::Workspace;
use tracing::info;
use tracing::warn;
use tracing_log::AsTrace as _;
use tracing_subscriber::EnvFilter;

////////////////////////////////////////////////////////////////////////////////////////
// Arguments
////////////////////////////////////////////////////////////////////////////////////////

/// What to write for each peptide.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum Mode {
    /// One row per hit, with genomic locations and differences.
    #[default]
    Report,

    /// One row per peptide, with the number of owning individuals and every
    /// difference that could have produced it.
    Frequencies,
}

/// Joins the results of a peptide search against genomic annotation data.
#[derive(Parser)]
struct Args {
    /// The work directory holding the results of the search.
    work: PathBuf,

    /// The peptides that were searched for (defaults to `searchList.fa` within
    /// the work directory).
    #[arg(short, long)]
    fasta: Option<PathBuf>,

    /// A table (with a header line) whose first column holds the peptides as
    /// they are known to the caller, in search order (defaults to the
    /// searched sequences).
    #[arg(short, long)]
    sequences: Option<PathBuf>,

    /// A whitespace-delimited table of protein, transcript and gene
    /// identifiers.
    #[arg(short, long)]
    identifiers: Option<PathBuf>,

    /// A file listing the base protein names to restrict the hits to.
    #[arg(short, long)]
    proteins: Option<PathBuf>,

    /// What to write for each peptide.
    #[arg(short, long, value_enum, default_value_t)]
    mode: Mode,

    /// If desired, only report the differences within this many amino acids
    /// of each hit.
    #[arg(short, long)]
    tolerance: Option<usize>,

    /// Where to write the output (defaults to stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    verbose: Verbosity,
}

////////////////////////////////////////////////////////////////////////////////////////
// Inputs
////////////////////////////////////////////////////////////////////////////////////////

/// Reads the identifier table.
fn read_identifiers(path: &Path) -> Result<Identifiers> {
    let input = workspace::open_input(path)
        .with_context(|| format!("opening identifier table: {}", path.display()))?;

    Identifiers::read(input)
        .with_context(|| format!("reading identifier table: {}", path.display()))
}

/// Reads the peptide sequences known to the caller.
fn read_sequences(path: &Path) -> Result<Vec<String>> {
    let input = workspace::open_input(path)
        .with_context(|| format!("opening sequence table: {}", path.display()))?;

    report::read_sequences(input)
        .with_context(|| format!("reading sequence table: {}", path.display()))
}

/// Reads the base protein names, one per line.
fn read_proteins(path: &Path) -> Result<HashSet<String>> {
    let input = workspace::open_input(path)
        .with_context(|| format!("opening protein list: {}", path.display()))?;

    let mut proteins = HashSet::new();

    for line in input.lines() {
        let line = line.with_context(|| format!("reading protein list: {}", path.display()))?;
        let protein = line.trim();

        if !protein.is_empty() {
            proteins.insert(protein.to_string());
        }
    }

    Ok(proteins)
}

////////////////////////////////////////////////////////////////////////////////////////
// Main
////////////////////////////////////////////////////////////////////////////////////////

/// Writes the output for a single peptide.
fn write_peptide(
    writer: &mut impl Write,
    peptide: &PeptideMatch,
    sequence: Option<&str>,
    args: &Args,
    identifiers: Option<&Identifiers>,
) -> Result<()> {
    let sequence = sequence.unwrap_or(peptide.sequence());

    match args.mode {
        Mode::Report if peptide.is_empty() => writeln!(
            writer,
            "{}",
            Row::missing(peptide.sequence()).with_sequence(sequence)
        )?,
        Mode::Report => {
            for hit in peptide.hits() {
                let row = Row::from_hit(peptide.sequence(), hit, identifiers, args.tolerance)
                    .with_sequence(sequence);

                for warning in row.warnings() {
                    warn!("{}: {warning}", hit.name());
                }

                writeln!(writer, "{row}")?;
            }
        }
        Mode::Frequencies => writeln!(writer, "{}", Frequency::new(peptide))?,
    }

    Ok(())
}

/// Joins the results and writes the output.
fn run(args: &Args) -> Result<()> {
    let identifiers = args
        .identifiers
        .as_deref()
        .map(read_identifiers)
        .transpose()?;

    let proteins = args.proteins.as_deref().map(read_proteins).transpose()?;
    let sequences = args.sequences.as_deref().map(read_sequences).transpose()?;

    let mut workspace = Workspace::existing(&args.work);

    if let Some(fasta) = &args.fasta {
        workspace = workspace.with_query(fasta);
    }

    let mut session = workspace
        .open()
        .with_context(|| format!("opening search results: {}", args.work.display()))?;

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating output: {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };

    if let Mode::Report = args.mode {
        writeln!(writer, "{}", report::COLUMNS.join("\t"))?;
    }

    let mut peptides = 0usize;
    let mut hits = 0usize;

    for result in session.matches() {
        let mut peptide = result.context("reading search results")?;

        if let Some(proteins) = &proteins {
            peptide = peptide.limit_to_proteins(proteins);
        }

        let sequence = match &sequences {
            Some(sequences) => Some(sequences.get(peptides).with_context(|| {
                format!("sequence table has no entry for peptide {}", peptides + 1)
            })?),
            None => None,
        };

        peptides += 1;
        hits += peptide.len();

        write_peptide(
            &mut writer,
            &peptide,
            sequence.map(String::as_str),
            args,
            identifiers.as_ref(),
        )?;
    }

    writer.flush().context("writing output")?;
    session.close().context("removing work files")?;

    info!("wrote {hits} hits across {peptides} peptides");

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_max_level(args.verbose.log_level_filter().as_trace())
            .init(),
    };

    run(&args)
}
