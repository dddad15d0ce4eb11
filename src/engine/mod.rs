//! Pure computation engine for cohort tracking and profit attribution.

pub mod cohort;
pub mod forecast;
pub mod notices;
pub mod replay;

pub use cohort::{CohortBook, CohortMember, OpenPosition};
pub use forecast::{annual_forecast, tier_icon};
pub use replay::{
    replay, CloseSummary, Outbox, ReplayOutcome, ReplaySettings, Replayer, RosterChange,
};
