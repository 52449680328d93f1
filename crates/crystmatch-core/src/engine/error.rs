use super::config::ConfigError;
use crate::core::io::graph_format::GraphFormatError;
use crate::core::lattice::CellError;
use crate::core::models::graph::GraphError;
use crate::core::symmetry::SymopParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Symmetry operation parse error: {0}")]
    Parse(#[from] SymopParseError),

    #[error("Template parse error: {0}")]
    Format(#[from] GraphFormatError),

    #[error("Degenerate cell: {0}")]
    DegenerateCell(#[from] CellError),

    #[error("Site {site} has the wildcard element set {types}; assembly needs concrete elements")]
    UnorderedStructure { site: usize, types: String },

    #[error("No symmetry: {0}")]
    NoSymmetry(&'static str),

    #[error("Invalid template: {0}")]
    InvalidTemplate(#[from] GraphError),

    #[error("Pack is not registered with this engine")]
    UnknownPack,

    #[error("Condition is not registered with this engine")]
    UnknownCondition,

    #[error("Anchor node {node} is out of range for a template with {len} nodes")]
    InvalidAnchor { node: usize, len: usize },

    #[error("Match {index} of pack '{pack}' does not fit its template or target")]
    InvalidMatch { pack: String, index: usize },

    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
