pub mod analysis;
pub mod archive;
pub mod senders;

pub use analysis::{ANALYSIS_HEADERS, AnalysisRow, AnalysisTable, group_by_domain, value_counts};
pub use archive::{ArchiveEntry, ArchiveWriter};
pub use senders::{SenderCount, SenderTally};
