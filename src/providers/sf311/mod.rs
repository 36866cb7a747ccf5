mod client;
mod core;
pub mod cycle_time;
pub mod filters;
pub mod resubmissions;

pub use self::core::Sf311Provider;
pub use filters::CaseFilters;
pub use resubmissions::DEFAULT_REOPEN_WINDOW_DAYS;
