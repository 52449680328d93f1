use super::atom_types::AtomTypeSet;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A crystallographic site of the asymmetric unit.
///
/// Sites are produced by external parsers and only read by the core. The
/// `properties` map carries caller-provided extras verbatim; nothing in this
/// crate reads from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Fractional coordinates.
    pub fractional: Point3<f64>,
    /// Element(s) occupying the site.
    pub types: AtomTypeSet,
    /// Optional site label (e.g. "O1").
    pub label: Option<String>,
    /// Opaque auxiliary properties.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Site {
    /// Creates an unlabelled site.
    pub fn new(fractional: Point3<f64>, types: AtomTypeSet) -> Self {
        Self {
            fractional,
            types,
            label: None,
            properties: BTreeMap::new(),
        }
    }

    /// Creates a site for a concrete element given by symbol.
    pub fn from_symbol(symbol: &str, x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z), AtomTypeSet::from_symbol(symbol))
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label if present, otherwise the element symbol(s) and index.
    pub fn display_name(&self, index: usize) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => format!("{}{}", self.types, index + 1),
        }
    }
}
