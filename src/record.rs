//! Records joined by the merge-join reader.

pub mod matches;
pub mod protein;
pub mod variant;

pub use matches::MatchRecord;
pub use protein::ProteinRecord;
pub use variant::VariantRecord;

