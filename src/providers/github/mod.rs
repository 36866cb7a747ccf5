mod client;
mod core;
pub mod health;
pub mod portfolio;

pub use self::core::{GitHubProvider, ProbeSettings};
pub use health::IssueFilter;
