//! `proteos` is a crate for joining the results of a peptide search against
//! genomic annotation data.
//!
//! An external search engine finds every occurrence of each query peptide in a
//! database of (possibly variant) proteins. It writes four sorted outputs: the
//! binary match records, the name of each matched entry, and two tables keyed
//! by match index describing the exon locations of the matched protein and the
//! variant that produced it. This crate joins those streams with the query
//! peptides and turns alignment data into genomic coordinates.
//!
//! ## Reading matches
//!
//! The [`Reader`] walks the five streams in lockstep and yields one
//! [`PeptideMatch`](crate::peptide::PeptideMatch) per query peptide, in query
//! order, including peptides that matched nothing. Each
//! [`Hit`](crate::peptide::Hit) of a peptide carries its match record, the
//! name of the matched entry, and the protein and variant records when the
//! tables have them.
//!
//! ```
//! use proteos::Reader;
//! use proteos::record::MatchRecord;
//!
//! let sequences = b">lookie\nPEP\n>lookie\nKR\n";
//! let matches = MatchRecord::try_new(0, 0, 0, 3)?.to_bytes();
//! let names = b"ENSP01_1\n";
//! let proteins = b"0\tENSP01_1\tLOCS{\tchr1\t100\t109\t+\t}SCOL\n";
//! let variants = b"0\t3M\tINDS{\tHG00096\t}SDNI\n";
//!
//! let mut reader = Reader::new(
//!     &sequences[..],
//!     &matches[..],
//!     &names[..],
//!     &proteins[..],
//!     &variants[..],
//! );
//!
//! let peptide = reader.next_match()?.unwrap();
//! assert_eq!(peptide.sequence(), "PEP");
//! assert_eq!(peptide.hits()[0].location().peptide(), "chr1:100-108");
//!
//! let peptide = reader.next_match()?.unwrap();
//! assert!(peptide.is_empty());
//!
//! assert!(reader.next_match()?.is_none());
//!
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Locations and differences
//!
//! A variant protein is aligned to its reference protein by a CIGAR string
//! ([`cigar`]). The reference protein is in turn located on the genome by its
//! exons ([`location::ExonLocation`]). [`location::locate()`] combines the two
//! to render the genomic bases of a match. The [`difference`] module parses
//! the amino acid and genetic changes that a variant carries, and
//! [`Hit::near_variants()`](crate::peptide::Hit::near_variants) finds those
//! that could have produced a match.
//!
//! Problems with individual records (an unknown CIGAR, exons on both strands,
//! a questionable difference) never stop the join. They are returned as
//! warnings alongside the degraded result. Structural problems with the
//! streams themselves are errors.
//!
//! ## Work directories
//!
//! The [`workspace`] module runs a search engine into a work directory, opens
//! its results, and removes any file it created once the results have been
//! read.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod blob;
pub mod cigar;
pub mod difference;
pub mod location;
pub mod peptide;
pub mod reader;
pub mod record;
pub mod report;
pub mod workspace;

pub use self::reader::Reader;
