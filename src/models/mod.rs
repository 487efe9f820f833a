pub mod stats;

pub use stats::{VisitOutcome, VisitStats, VisitorRecord};
