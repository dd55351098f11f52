pub mod filter;
pub mod lifecycle;
pub mod query;
pub mod transition;
