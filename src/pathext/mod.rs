//! Path-extension decision engine: given a partial genome path and a set of
//! candidate continuation edges, decide which edge (if any) to traverse next.

pub mod analysis;
pub mod chooser;
pub mod coverage;
pub mod unique;
pub mod weight;

pub use analysis::PathAnalyzer;
pub use chooser::{
    AlternativeContainer, ExclusionStrategy, ExtensionChooser, ReadCloudFlavor, TenXParams,
};
pub use unique::LongReadsUniqueEdgeAnalyzer;
