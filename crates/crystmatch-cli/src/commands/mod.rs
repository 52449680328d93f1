pub mod build;
pub mod reduce;
pub mod search;
