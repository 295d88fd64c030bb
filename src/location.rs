//! Reconstructing genomic locations for proteins and peptides.
//!
//! The exons of a transcript are flattened into the ordered sequence of bases
//! that encode the reference protein (reversed on the negative strand) and
//! grouped into codons. The position table produced from the CIGAR string of
//! a variant then maps each amino acid of the variant onto a codon of the
//! reference, which yields the genomic bases behind any span of the variant.
//!
//! Locations are rendered compactly as `chrom:start-end` runs joined by `|`,
//! where a run is a maximal stretch of bases that step by one in the direction
//! of the strand. Stretches without a genomic location render as `-1`.

use std::ops::Range;

use omics::coordinate::Strand;
use omics::coordinate::position::Number;

use crate::cigar;
use crate::cigar::TableError;

pub mod exon;

pub use exon::ExonLocation;

/// The number of bases in a codon.
const CODON_SIZE: usize = 3;

/// The delimiter between runs in a rendered location.
const RUN_DELIMITER: &str = "|";

/// The rendering of a run of unmapped positions.
const UNMAPPED: &str = "-1";

/// A codon of genomic bases.
pub type Codon = [Number; CODON_SIZE];

////////////////////////////////////////////////////////////////////////////////////////
// Warnings
////////////////////////////////////////////////////////////////////////////////////////

/// A problem encountered while reconstructing a location.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Warning {
    /// There was no location data for the protein.
    NoLocationData,

    /// The exons of the transcript lie on both strands.
    MixedStrands,

    /// The exons of the transcript lie on more than one chromosome.
    MultipleChromosomes {
        /// The chromosome of the first exon.
        first: String,

        /// The first differing chromosome.
        other: String,
    },

    /// The location data does not cover a whole number of codons.
    PartialCodon {
        /// The number of bases left over.
        remainder: usize,
    },

    /// The CIGAR string could not be used, so an identity table was used.
    Cigar {
        /// The CIGAR string.
        cigar: String,

        /// The reason the CIGAR string could not be used.
        reason: TableError,
    },

    /// The CIGAR string maps past the end of the location data.
    BeyondLocations,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::NoLocationData => write!(f, "has no location data"),
            Warning::MixedStrands => write!(f, "transcript uses both strands"),
            Warning::MultipleChromosomes { first, other } => write!(
                f,
                "uses multiple chromosomes in location data ({first} and {other})"
            ),
            Warning::PartialCodon { remainder } => write!(
                f,
                "location data does not cover a whole number of codons ({remainder} bases left \
                 over)"
            ),
            Warning::Cigar {
                reason: TableError::Unknown,
                ..
            } => write!(f, "missing cigar"),
            Warning::Cigar { cigar, reason } => write!(f, "bad cigar {cigar}: {reason}"),
            Warning::BeyondLocations => write!(f, "cigar extends beyond location data"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Position tables
////////////////////////////////////////////////////////////////////////////////////////

/// Resolves the variant-to-reference position table for a match ending at
/// `match_end`.
///
/// When the CIGAR string is missing or unusable, an identity table covering
/// the match is returned and the problem is pushed onto `warnings`. The
/// identity table never exceeds [`cigar::MAX_POSITIONS`] entries.
///
/// # Examples
///
/// ```
/// use proteos::location;
///
/// let mut warnings = Vec::new();
///
/// let table = location::resolve_table(Some("1M1I1M"), 3, &mut warnings);
/// assert_eq!(table, vec![Some(0), None, Some(1)]);
/// assert!(warnings.is_empty());
///
/// let table = location::resolve_table(Some("???"), 2, &mut warnings);
/// assert_eq!(table, vec![Some(0), Some(1)]);
/// assert_eq!(warnings.len(), 1);
/// ```
pub fn resolve_table(
    cigar: Option<&str>,
    match_end: usize,
    warnings: &mut Vec<Warning>,
) -> Vec<Option<usize>> {
    let cigar = cigar.unwrap_or(cigar::UNKNOWN);

    match cigar::match_table(cigar, match_end) {
        Ok(table) => table,
        Err(reason) => {
            warnings.push(Warning::Cigar {
                cigar: cigar.to_string(),
                reason,
            });
            cigar::identity(match_end.min(cigar::MAX_POSITIONS))
        }
    }
}

/// Restricts a span to the first `len` positions.
pub(crate) fn clamp(span: &Range<usize>, len: usize) -> Range<usize> {
    span.start.min(len)..span.end.min(len)
}

////////////////////////////////////////////////////////////////////////////////////////
// Layouts
////////////////////////////////////////////////////////////////////////////////////////

/// The codons of a transcript laid out along the genome.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Layout {
    /// The chromosome of the first exon.
    chromosome: String,

    /// The strand of the first exon.
    strand: Strand,

    /// The codons, in the order they encode the protein.
    codons: Vec<Codon>,
}

impl Layout {
    /// Lays out the codons described by a set of exons.
    ///
    /// Exons are expected to share one chromosome and one strand. Expansion
    /// stops at the first exon on a different strand, while exons on a
    /// different chromosome are kept. Both problems are pushed onto
    /// `warnings`, as are any bases left over after the last whole codon.
    ///
    /// Returns [`None`] when there are no exons.
    ///
    /// # Examples
    ///
    /// ```
    /// use omics::coordinate::Strand;
    /// use proteos::location::ExonLocation;
    /// use proteos::location::Layout;
    ///
    /// let exons = vec![
    ///     ExonLocation::new("chr1", 100, 104, Strand::Positive),
    ///     ExonLocation::new("chr1", 200, 205, Strand::Positive),
    /// ];
    ///
    /// let mut warnings = Vec::new();
    /// let layout = Layout::from_exons(&exons, &mut warnings).unwrap();
    ///
    /// assert_eq!(layout.codons(), &[[100, 101, 102], [103, 200, 201], [202, 203, 204]]);
    /// assert!(warnings.is_empty());
    /// ```
    pub fn from_exons(exons: &[ExonLocation], warnings: &mut Vec<Warning>) -> Option<Self> {
        let first = exons.first()?;
        let chromosome = first.chromosome().to_string();
        let strand = first.strand();

        let mut bases = Vec::new();
        let mut warned_chromosome = false;

        for exon in exons {
            if exon.strand() != strand {
                warnings.push(Warning::MixedStrands);
                break;
            }

            if exon.chromosome() != chromosome && !warned_chromosome {
                warnings.push(Warning::MultipleChromosomes {
                    first: chromosome.clone(),
                    other: exon.chromosome().to_string(),
                });
                warned_chromosome = true;
            }

            bases.extend(exon.bases());
        }

        if !first.is_forward() {
            bases.reverse();
        }

        let chunks = bases.chunks_exact(CODON_SIZE);
        let remainder = chunks.remainder().len();

        let codons = chunks
            .map(|chunk| [chunk[0], chunk[1], chunk[2]])
            .collect::<Vec<_>>();

        if remainder > 0 {
            warnings.push(Warning::PartialCodon { remainder });
        }

        Some(Self {
            chromosome,
            strand,
            codons,
        })
    }

    /// Gets the chromosome.
    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    /// Gets the strand.
    pub fn strand(&self) -> Strand {
        self.strand
    }

    /// Gets the codons.
    pub fn codons(&self) -> &[Codon] {
        &self.codons
    }

    /// Unmaps every entry of a position table that points past the last codon.
    ///
    /// A single warning is pushed onto `warnings` if any entry was unmapped.
    pub fn restrict(&self, table: &mut [Option<usize>], warnings: &mut Vec<Warning>) {
        let mut warned = false;

        for entry in table.iter_mut() {
            if matches!(entry, Some(position) if *position >= self.codons.len()) {
                if !warned {
                    warnings.push(Warning::BeyondLocations);
                    warned = true;
                }

                *entry = None;
            }
        }
    }

    /// Expands a span of amino acids into the genomic bases behind it.
    ///
    /// Amino acids without a codon are represented by [`None`]. Every amino
    /// acid past the end of the table collapses into a single [`None`].
    pub fn expand(&self, table: &[Option<usize>], span: Range<usize>) -> Vec<Option<Number>> {
        let covered = clamp(&span, table.len());
        let mut bases = Vec::new();

        for i in covered.clone() {
            match table[i].and_then(|position| self.codons.get(position)) {
                Some(codon) => bases.extend(codon.iter().copied().map(Some)),
                None => bases.push(None),
            }
        }

        if covered.end < span.end {
            bases.push(None);
        }

        bases
    }

    /// Renders genomic bases as compressed runs.
    ///
    /// # Examples
    ///
    /// ```
    /// use omics::coordinate::Strand;
    /// use proteos::location::ExonLocation;
    /// use proteos::location::Layout;
    ///
    /// let exons = vec![ExonLocation::new("chr1", 100, 109, Strand::Positive)];
    /// let layout = Layout::from_exons(&exons, &mut Vec::new()).unwrap();
    ///
    /// let bases = layout.expand(&[Some(0), Some(1), Some(2)], 0..3);
    /// assert_eq!(layout.render(&bases), "chr1:100-108");
    ///
    /// let bases = layout.expand(&[Some(0), None, Some(2)], 0..3);
    /// assert_eq!(layout.render(&bases), "chr1:100-102|-1|chr1:106-108");
    /// ```
    pub fn render(&self, bases: &[Option<Number>]) -> String {
        let mut runs = Vec::new();
        let mut i = 0;

        while i < bases.len() {
            match bases[i] {
                None => {
                    while i < bases.len() && bases[i].is_none() {
                        i += 1;
                    }

                    runs.push(UNMAPPED.to_string());
                }
                Some(first) => {
                    let mut last = first;
                    i += 1;

                    while let Some(Some(next)) = bases.get(i) {
                        if self.step(last) != Some(*next) {
                            break;
                        }

                        last = *next;
                        i += 1;
                    }

                    if first == last {
                        runs.push(format!("{}:{}", self.chromosome, first));
                    } else {
                        runs.push(format!("{}:{}-{}", self.chromosome, first, last));
                    }
                }
            }
        }

        runs.join(RUN_DELIMITER)
    }

    /// Gets the base expected to follow `base` along the strand.
    fn step(&self, base: Number) -> Option<Number> {
        match self.strand {
            Strand::Positive => base.checked_add(1),
            Strand::Negative => base.checked_sub(1),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Locations
////////////////////////////////////////////////////////////////////////////////////////

/// The reconstructed genomic location of a match.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Location {
    /// The chromosome, when location data was present.
    chromosome: Option<String>,

    /// The rendered location of the whole mapped protein.
    protein: String,

    /// The rendered location of the peptide span.
    peptide: String,

    /// The resolved variant-to-reference position table.
    table: Vec<Option<usize>>,

    /// The problems encountered along the way.
    warnings: Vec<Warning>,
}

impl Location {
    /// Gets the chromosome, if there was location data.
    pub fn chromosome(&self) -> Option<&str> {
        self.chromosome.as_deref()
    }

    /// Gets the rendered location of every mapped amino acid of the protein.
    pub fn protein(&self) -> &str {
        &self.protein
    }

    /// Gets the rendered location of the peptide.
    pub fn peptide(&self) -> &str {
        &self.peptide
    }

    /// Gets the variant-to-reference position table used for the location.
    pub fn table(&self) -> &[Option<usize>] {
        &self.table
    }

    /// Gets the warnings encountered while reconstructing the location.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Gets the first and last reference amino acid (0-based) mapped by the
    /// provided span of the variant, if any are mapped.
    pub fn reference_span(&self, span: Range<usize>) -> Option<(usize, usize)> {
        let mapped = clamp(&span, self.table.len()).filter_map(|i| self.table[i]);

        mapped.fold(None, |acc, position| match acc {
            None => Some((position, position)),
            Some((low, high)) => Some((low.min(position), high.max(position))),
        })
    }
}

/// Reconstructs the genomic location of a match.
///
/// `span` is the span of the match in amino acids of the variant protein and
/// `cigar` is the alignment of the variant to the reference (or [`None`] when
/// it is unknown).
///
/// # Examples
///
/// ```
/// use omics::coordinate::Strand;
/// use proteos::location;
/// use proteos::location::ExonLocation;
///
/// let exons = vec![ExonLocation::new("chr2", 200, 212, Strand::Negative)];
/// let location = location::locate(&exons, Some("4M"), 1..3);
///
/// assert_eq!(location.chromosome(), Some("chr2"));
/// assert_eq!(location.protein(), "chr2:211-200");
/// assert_eq!(location.peptide(), "chr2:208-203");
/// assert!(location.warnings().is_empty());
/// ```
pub fn locate(exons: &[ExonLocation], cigar: Option<&str>, span: Range<usize>) -> Location {
    let mut warnings = Vec::new();
    let mut table = resolve_table(cigar, span.end, &mut warnings);

    let layout = match Layout::from_exons(exons, &mut warnings) {
        Some(layout) => layout,
        None => {
            warnings.push(Warning::NoLocationData);
            return Location {
                table,
                warnings,
                ..Default::default()
            };
        }
    };

    layout.restrict(&mut table, &mut warnings);

    let protein = layout.render(&layout.expand(&table, 0..table.len()));
    let peptide = layout.render(&layout.expand(&table, span));

    Location {
        chromosome: Some(layout.chromosome().to_string()),
        protein,
        peptide,
        table,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward(chromosome: &str, start: Number, end: Number) -> ExonLocation {
        ExonLocation::new(chromosome, start, end, Strand::Positive)
    }

    fn reverse(chromosome: &str, start: Number, end: Number) -> ExonLocation {
        ExonLocation::new(chromosome, start, end, Strand::Negative)
    }

    #[test]
    fn single_forward_exon_with_identity_table() {
        let location = locate(&[forward("chr1", 100, 109)], None, 0..3);

        assert_eq!(location.peptide(), "chr1:100-108");
        assert_eq!(location.protein(), "chr1:100-108");
        assert_eq!(
            location.warnings(),
            &[Warning::Cigar {
                cigar: String::from("???"),
                reason: TableError::Unknown
            }]
        );
        assert_eq!(location.warnings()[0].to_string(), "missing cigar");
    }

    #[test]
    fn reverse_strand_runs_descend() {
        let location = locate(&[reverse("chr2", 200, 206)], Some("2M"), 0..2);
        assert_eq!(location.peptide(), "chr2:205-200");
    }

    #[test]
    fn exon_boundaries_break_runs() {
        let exons = [forward("chr1", 100, 104), forward("chr1", 200, 205)];
        let location = locate(&exons, Some("3M"), 0..3);

        assert_eq!(location.peptide(), "chr1:100-103|chr1:200-204");
        assert!(location.warnings().is_empty());
    }

    #[test]
    fn reverse_strand_exons_are_read_backwards() {
        let exons = [reverse("chr3", 10, 13), reverse("chr3", 20, 23)];
        let location = locate(&exons, Some("2M"), 1..2);

        // Flattened as 22 21 20 12 11 10.
        assert_eq!(location.peptide(), "chr3:12-10");
    }

    #[test]
    fn insertions_render_as_unmapped() {
        let location = locate(&[forward("chr1", 100, 106)], Some("1M1I1M"), 0..3);
        assert_eq!(location.peptide(), "chr1:100-102|-1|chr1:103-105");
        assert_eq!(location.protein(), "chr1:100-102|-1|chr1:103-105");
    }

    #[test]
    fn leading_and_trailing_unmapped_runs_collapse() {
        let location = locate(&[forward("chr1", 0, 3)], Some("2I1M2I"), 0..5);
        assert_eq!(location.peptide(), "-1|chr1:0-2|-1");
    }

    #[test]
    fn peptide_span_is_a_subset_of_the_protein() {
        let location = locate(&[forward("chr1", 100, 115)], Some("5M"), 2..4);

        assert_eq!(location.protein(), "chr1:100-114");
        assert_eq!(location.peptide(), "chr1:106-111");
        assert_eq!(location.reference_span(2..4), Some((2, 3)));
    }

    #[test]
    fn partial_codons_are_dropped() {
        let location = locate(&[forward("chr1", 100, 110)], Some("3M"), 0..3);

        assert_eq!(location.peptide(), "chr1:100-108");
        assert_eq!(
            location.warnings(),
            &[Warning::PartialCodon { remainder: 1 }]
        );
    }

    #[test]
    fn cigar_beyond_location_data() {
        let location = locate(&[forward("chr1", 100, 109)], Some("5M"), 0..5);

        assert_eq!(location.peptide(), "chr1:100-108|-1");
        assert_eq!(location.warnings(), &[Warning::BeyondLocations]);
        assert_eq!(location.table()[3], None);
        assert_eq!(location.table()[4], None);
    }

    #[test]
    fn mixed_strands_stop_expansion() {
        let exons = [forward("chr1", 100, 106), reverse("chr1", 200, 206)];
        let location = locate(&exons, Some("2M"), 0..2);

        assert_eq!(location.peptide(), "chr1:100-105");
        assert_eq!(location.warnings(), &[Warning::MixedStrands]);
    }

    #[test]
    fn multiple_chromosomes_warn_once() {
        let exons = [
            forward("chr1", 100, 103),
            forward("chr2", 10, 13),
            forward("chr3", 20, 23),
        ];
        let location = locate(&exons, Some("3M"), 0..3);

        assert_eq!(
            location.warnings(),
            &[Warning::MultipleChromosomes {
                first: String::from("chr1"),
                other: String::from("chr2"),
            }]
        );
        assert_eq!(location.chromosome(), Some("chr1"));
        assert_eq!(location.peptide(), "chr1:100-102|chr1:10-12|chr1:20-22");
    }

    #[test]
    fn no_location_data() {
        let location = locate(&[], Some("3M"), 0..3);

        assert_eq!(location.chromosome(), None);
        assert_eq!(location.peptide(), "");
        assert_eq!(location.warnings(), &[Warning::NoLocationData]);
        assert_eq!(location.table().len(), 3);
    }

    #[test]
    fn oversized_matches_fall_back_to_a_bounded_table() {
        let end = 1 << 40;
        let location = locate(&[forward("chr1", 100, 109)], Some("3M"), 1..end);

        assert_eq!(location.table().len(), cigar::MAX_POSITIONS);
        assert_eq!(location.protein(), "chr1:100-108|-1");
        assert_eq!(location.peptide(), "chr1:103-108|-1");
        assert_eq!(location.reference_span(1..end), Some((1, 2)));
        assert_eq!(
            location.warnings()[0].to_string(),
            format!(
                "bad cigar 3M: search reports match beyond end of the cigar: cigar covers 3 \
                 positions, match ends at {end}"
            )
        );
        assert_eq!(location.warnings()[1], Warning::BeyondLocations);
    }

    #[test]
    fn spans_past_the_table_render_as_unmapped() {
        let exons = vec![forward("chr1", 100, 109)];
        let layout = Layout::from_exons(&exons, &mut Vec::new()).unwrap();

        let bases = layout.expand(&[Some(0), Some(1)], 1..usize::MAX);
        assert_eq!(bases.len(), 4);
        assert_eq!(layout.render(&bases), "chr1:103-105|-1");

        assert!(layout.expand(&[Some(0)], 5..9).iter().all(Option::is_none));
    }

    #[test]
    fn bad_cigars_fall_back_to_identity() {
        let location = locate(&[forward("chr1", 100, 109)], Some("1S2M"), 0..2);

        assert_eq!(location.peptide(), "chr1:100-105");
        assert_eq!(
            location.warnings()[0].to_string(),
            "bad cigar 1S2M: soft clip in protein cigar"
        );
    }

    #[test]
    fn single_bases_render_without_a_range() {
        let layout = Layout {
            chromosome: String::from("chr1"),
            strand: Strand::Positive,
            codons: Vec::new(),
        };

        assert_eq!(layout.render(&[Some(5), Some(7)]), "chr1:5|chr1:7");
        assert_eq!(layout.render(&[Some(5), Some(4)]), "chr1:5|chr1:4");
        assert_eq!(layout.render(&[]), "");
    }
}
