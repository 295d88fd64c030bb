//! Peptide matches and the queries derived from them.

use std::collections::HashSet;

use rust_lapper as lapper;

use crate::difference::Difference;
use crate::location;
use crate::location::Location;
use crate::record::MatchRecord;
use crate::record::ProteinRecord;
use crate::record::VariantRecord;

pub mod builder;

pub use builder::Builder;
pub use builder::Error;

/// The delimiter between the base protein name and the rest of a match name.
const NAME_DELIMITER: char = '_';

/// An interval of reference amino acids tagged with the position of its
/// difference.
type Iv = lapper::Interval<usize, usize>;

////////////////////////////////////////////////////////////////////////////////////////
// Hits
////////////////////////////////////////////////////////////////////////////////////////

/// A single match of a peptide, joined with its protein and variant records.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Hit {
    /// The index of the match across every peptide.
    match_index: u64,

    /// The match record.
    record: MatchRecord,

    /// The name of the matched entry.
    name: String,

    /// The protein record, if one was found.
    protein: Option<ProteinRecord>,

    /// The variant record, if one was found.
    variant: Option<VariantRecord>,
}

impl Hit {
    /// Creates a new [`Hit`].
    pub fn new(
        match_index: u64,
        record: MatchRecord,
        name: impl Into<String>,
        protein: Option<ProteinRecord>,
        variant: Option<VariantRecord>,
    ) -> Self {
        Self {
            match_index,
            record,
            name: name.into(),
            protein,
            variant,
        }
    }

    /// Gets the index of the match across every peptide.
    pub fn match_index(&self) -> u64 {
        self.match_index
    }

    /// Gets the match record.
    pub fn record(&self) -> &MatchRecord {
        &self.record
    }

    /// Gets the name of the matched entry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the base protein name (the name up to the first `_`).
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::peptide::Hit;
    /// use proteos::record::MatchRecord;
    ///
    /// let hit = Hit::new(0, MatchRecord::try_new(0, 0, 0, 3)?, "ENSP01_2_x", None, None);
    /// assert_eq!(hit.base_name(), "ENSP01");
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn base_name(&self) -> &str {
        self.name
            .split(NAME_DELIMITER)
            .next()
            .unwrap_or(&self.name)
    }

    /// Gets the protein record, if one was found.
    pub fn protein(&self) -> Option<&ProteinRecord> {
        self.protein.as_ref()
    }

    /// Gets the variant record, if one was found.
    pub fn variant(&self) -> Option<&VariantRecord> {
        self.variant.as_ref()
    }

    /// Gets the CIGAR string of the variant, if a variant record was found.
    pub fn cigar(&self) -> Option<&str> {
        self.variant.as_ref().map(|variant| variant.cigar())
    }

    /// Reconstructs the genomic location of this hit.
    pub fn location(&self) -> Location {
        let exons = self
            .protein
            .as_ref()
            .map(|protein| protein.exons())
            .unwrap_or_default();

        location::locate(exons, self.cigar(), self.record.span())
    }

    /// Gets the window of reference amino acids (1-based, inclusive) covered
    /// by this hit.
    ///
    /// Each boundary is the nearest mapped reference position inside the
    /// match. When nothing inside the match is mapped, the search continues
    /// outward from the match. Returns [`None`] when no position is mapped.
    pub fn reference_window(&self) -> Option<(usize, usize)> {
        let span = self.record.span();
        let table = location::resolve_table(self.cigar(), span.end, &mut Vec::new());
        let span = location::clamp(&span, table.len());
        let mapped = |i: usize| table[i];

        let low = span
            .clone()
            .find_map(mapped)
            .or_else(|| (0..span.start).rev().find_map(mapped));
        let high = span
            .clone()
            .rev()
            .find_map(mapped)
            .or_else(|| (span.end..table.len()).find_map(mapped));

        let (low, high) = match (low, high) {
            (None, None) => return None,
            (Some(low), None) => (low, low),
            (None, Some(high)) => (high, high),
            (Some(low), Some(high)) => (low, high),
        };

        Some((low + 1, high + 1))
    }

    /// Gets the differences of the variant that lie within `tolerance` amino
    /// acids of the reference window of this hit.
    ///
    /// Differences without a parsed protein range are never kept. The
    /// differences are returned in the order the variant lists them.
    ///
    /// # Examples
    ///
    /// ```
    /// use proteos::peptide::Hit;
    /// use proteos::record::MatchRecord;
    /// use proteos::record::VariantRecord;
    ///
    /// let variant = "0\t10M\tINDS{\tA\t}SDNI\tDIFS{\t2-2K>R:90A>G;6-6L>P:93T>C\t}SFID"
    ///     .parse::<VariantRecord>()?;
    /// let hit = Hit::new(0, MatchRecord::try_new(0, 0, 4, 8)?, "ENSP01_1", None, Some(variant));
    ///
    /// let near = hit.near_variants(0);
    /// assert_eq!(near.len(), 1);
    /// assert_eq!(near[0].as_str(), "6-6L>P:93T>C");
    ///
    /// assert_eq!(hit.near_variants(3).len(), 2);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn near_variants(&self, tolerance: usize) -> Vec<&Difference> {
        let differences = match &self.variant {
            Some(variant) => variant.differences().collect::<Vec<_>>(),
            None => return Vec::new(),
        };

        let Some((low, high)) = self.reference_window() else {
            return Vec::new();
        };

        let low = low.saturating_sub(tolerance);
        let high = high.saturating_add(tolerance);

        let intervals = differences
            .iter()
            .enumerate()
            .filter_map(|(i, difference)| {
                let range = difference.protein_range()?;

                Some(Iv {
                    start: range.start(),
                    stop: range.end().saturating_add(1),
                    val: i,
                })
            })
            .collect::<Vec<_>>();

        let lapper = lapper::Lapper::new(intervals);

        let mut kept = lapper
            .find(low, high.saturating_add(1))
            .map(|iv| iv.val)
            .collect::<Vec<_>>();
        kept.sort_unstable();
        kept.dedup();

        kept.into_iter().map(|i| differences[i]).collect()
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Peptide matches
////////////////////////////////////////////////////////////////////////////////////////

/// One query peptide together with every match of it.
///
/// Values are independent once built: deriving a restricted match copies the
/// relevant hits.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PeptideMatch {
    /// The index of the peptide.
    index: u64,

    /// The name of the peptide.
    name: String,

    /// The residues of the peptide.
    sequence: String,

    /// The hits, in match index order.
    hits: Vec<Hit>,
}

impl PeptideMatch {
    /// Gets the index of the peptide.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Gets the name of the peptide.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the residues of the peptide.
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// Gets the hits.
    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    /// Gets the number of hits.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Whether the peptide has no hits.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Gets every individual that carries a variant matched by this peptide.
    pub fn ownership_set(&self) -> HashSet<&str> {
        self.hits
            .iter()
            .filter_map(|hit| hit.variant())
            .flat_map(|variant| variant.individuals())
            .map(|individual| individual.as_str())
            .collect()
    }

    /// Gets every difference that could have produced this peptide.
    pub fn variant_set(&self) -> HashSet<&Difference> {
        self.hits
            .iter()
            .filter_map(|hit| hit.variant())
            .flat_map(|variant| variant.differences())
            .collect()
    }

    /// Gets, for each hit, the differences within `tolerance` amino acids of
    /// the hit.
    pub fn near_match_variants(&self, tolerance: usize) -> Vec<Vec<&Difference>> {
        self.hits
            .iter()
            .map(|hit| hit.near_variants(tolerance))
            .collect()
    }

    /// Gets the genomic location of each hit.
    pub fn genome_locations(&self) -> Vec<Location> {
        self.hits.iter().map(|hit| hit.location()).collect()
    }

    /// Creates a copy containing only the hits whose base protein name is in
    /// `proteins`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashSet;
    ///
    /// use proteos::peptide::Builder;
    /// use proteos::peptide::Hit;
    /// use proteos::reader::sequences::Sequence;
    /// use proteos::record::MatchRecord;
    ///
    /// let record = MatchRecord::try_new(0, 0, 0, 3)?;
    /// let peptide = Builder::default()
    ///     .index(0)?
    ///     .sequence(Sequence::new("lookie", "KRK"))?
    ///     .push_hit(Hit::new(0, record, "ENSP01_1", None, None))
    ///     .push_hit(Hit::new(1, record, "ENSP02_1", None, None))
    ///     .try_build()?;
    ///
    /// let proteins = HashSet::from([String::from("ENSP02")]);
    /// let limited = peptide.limit_to_proteins(&proteins);
    ///
    /// assert_eq!(limited.len(), 1);
    /// assert_eq!(limited.hits()[0].match_index(), 1);
    /// assert_eq!(peptide.len(), 2);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn limit_to_proteins(&self, proteins: &HashSet<String>) -> Self {
        Self {
            index: self.index,
            name: self.name.clone(),
            sequence: self.sequence.clone(),
            hits: self
                .hits
                .iter()
                .filter(|hit| proteins.contains(hit.base_name()))
                .cloned()
                .collect(),
        }
    }
}
