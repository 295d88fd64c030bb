//! Bracketed lists embedded within tab-delimited lines.
//!
//! Protein and variant lines carry lists of values as a run of fields opened
//! by a tag (e.g., `LOCS{`) and closed by the reversed tag (e.g., `}SCOL`):
//!
//! ```text
//! TAG{ item item ... }GAT
//! ```
//!
//! The opening and closing tags are fields of their own, so the items are
//! exactly the fields in between.

/// The delimiter between fields of an encoded blob.
const DELIMITER: char = '\t';

/// The tag of a blob.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Tag {
    /// Exon locations (`LOCS{ ... }SCOL`).
    Locations,

    /// Individuals or haplotypes (`INDS{ ... }SDNI`).
    Individuals,

    /// Differences (`DIFS{ ... }SFID`).
    Differences,
}

impl Tag {
    /// Gets the field that opens a blob with this tag.
    pub fn opener(&self) -> &'static str {
        match self {
            Tag::Locations => "LOCS{",
            Tag::Individuals => "INDS{",
            Tag::Differences => "DIFS{",
        }
    }

    /// Gets the field that closes a blob with this tag.
    pub fn closer(&self) -> &'static str {
        match self {
            Tag::Locations => "}SCOL",
            Tag::Individuals => "}SDNI",
            Tag::Differences => "}SFID",
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.opener(), self.closer())
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to locating a blob within a line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// A required blob was not present.
    Missing(Tag),

    /// The blob was opened but never closed.
    Unclosed(Tag),

    /// The blob was closed without being opened.
    Unopened(Tag),

    /// The blob was opened more than once.
    Repeated(Tag),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Missing(tag) => write!(f, "missing required `{}` blob", tag.opener()),
            Error::Unclosed(tag) => write!(
                f,
                "`{}` blob is missing its closing `{}`",
                tag.opener(),
                tag.closer()
            ),
            Error::Unopened(tag) => write!(
                f,
                "found `{}` without an opening `{}`",
                tag.closer(),
                tag.opener()
            ),
            Error::Repeated(tag) => write!(f, "`{}` blob appears more than once", tag.opener()),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Decoding and encoding
////////////////////////////////////////////////////////////////////////////////////////

/// A blob located within a line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Located<'a, 'b> {
    /// The index of the opening field.
    opener: usize,

    /// The fields between the opener and the closer.
    items: &'b [&'a str],
}

impl<'a, 'b> Located<'a, 'b> {
    /// Gets the index of the field that opens the blob.
    pub fn opener(&self) -> usize {
        self.opener
    }

    /// Gets the items of the blob.
    pub fn items(&self) -> &'b [&'a str] {
        self.items
    }
}

/// Finds the blob with the provided tag within the fields of a line.
///
/// Returns [`None`] when the blob is absent altogether.
///
/// # Examples
///
/// ```
/// use proteos::blob;
/// use proteos::blob::Tag;
///
/// let fields = ["0", "3M", "INDS{", "HG00096", "HG00097", "}SDNI"];
/// let blob = blob::find(&fields, Tag::Individuals)?.unwrap();
///
/// assert_eq!(blob.opener(), 2);
/// assert_eq!(blob.items(), &["HG00096", "HG00097"]);
/// assert!(blob::find(&fields, Tag::Differences)?.is_none());
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn find<'a, 'b>(fields: &'b [&'a str], tag: Tag) -> Result<Option<Located<'a, 'b>>> {
    let mut openers = fields
        .iter()
        .enumerate()
        .filter(|(_, field)| **field == tag.opener())
        .map(|(i, _)| i);
    let mut closers = fields
        .iter()
        .enumerate()
        .filter(|(_, field)| **field == tag.closer())
        .map(|(i, _)| i);

    let (opener, closer) = match (openers.next(), closers.next()) {
        (None, None) => return Ok(None),
        (None, Some(_)) => return Err(Error::Unopened(tag)),
        (Some(_), None) => return Err(Error::Unclosed(tag)),
        (Some(opener), Some(closer)) if closer < opener => return Err(Error::Unopened(tag)),
        (Some(opener), Some(closer)) => (opener, closer),
    };

    if openers.next().is_some() || closers.next().is_some() {
        return Err(Error::Repeated(tag));
    }

    Ok(Some(Located {
        opener,
        items: &fields[opener + 1..closer],
    }))
}

/// Finds a blob that must be present within the fields of a line.
pub fn require<'a, 'b>(fields: &'b [&'a str], tag: Tag) -> Result<Located<'a, 'b>> {
    find(fields, tag)?.ok_or(Error::Missing(tag))
}

/// Encodes items as a tab-delimited blob.
///
/// # Examples
///
/// ```
/// use proteos::blob;
/// use proteos::blob::Tag;
///
/// assert_eq!(
///     blob::encode(Tag::Individuals, ["HG00096", "HG00097"]),
///     "INDS{\tHG00096\tHG00097\t}SDNI"
/// );
/// assert_eq!(blob::encode(Tag::Differences, Vec::<String>::new()), "DIFS{\t}SFID");
/// ```
pub fn encode<I, T>(tag: Tag, items: I) -> String
where
    I: IntoIterator<Item = T>,
    T: std::fmt::Display,
{
    let mut result = String::from(tag.opener());

    for item in items {
        result.push(DELIMITER);
        result.push_str(&item.to_string());
    }

    result.push(DELIMITER);
    result.push_str(tag.closer());
    result
}
