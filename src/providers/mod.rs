pub mod github;
pub mod sf311;
