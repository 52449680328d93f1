use crate::error::{CliError, Result};
use crystmatch::core::lattice::{CellParameters, Centring, UnitCell};
use crystmatch::core::models::atom_types::AtomTypeSet;
use crystmatch::core::models::element;
use crystmatch::core::models::site::Site;
use crystmatch::core::symmetry::SymmetryOperation;
use crystmatch::engine::error::EngineError;
use crystmatch::workflows::assemble::Structure;
use nalgebra::Point3;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct CellSection {
    a: f64,
    b: f64,
    c: f64,
    alpha: f64,
    beta: f64,
    gamma: f64,
    #[serde(default = "default_centring")]
    centring: String,
}

fn default_centring() -> String {
    "P".to_string()
}

fn identity_symops() -> Vec<String> {
    vec!["x,y,z".to_string()]
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct SiteEntry {
    label: Option<String>,
    /// An element symbol, or several separated by commas for a disordered site.
    element: String,
    x: f64,
    y: f64,
    z: f64,
    #[serde(default)]
    properties: BTreeMap<String, String>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct StructureFile {
    name: Option<String>,
    cell: CellSection,
    #[serde(default = "identity_symops")]
    symops: Vec<String>,
    #[serde(default)]
    sites: Vec<SiteEntry>,
}

fn parse_types(symbols: &str) -> Result<AtomTypeSet> {
    let numbers = symbols
        .split(',')
        .map(|symbol| {
            let element = element::by_symbol(symbol.trim());
            if element.is_unknown() {
                Err(CliError::Config(format!("Unknown element symbol '{}'", symbol.trim())))
            } else {
                Ok(element.number)
            }
        })
        .collect::<Result<Vec<_>>>()?;
    AtomTypeSet::new(numbers)
        .ok_or_else(|| CliError::Config("A site needs at least one element".to_string()))
}

impl StructureFile {
    fn into_structure(self, fallback_name: &str) -> Result<Structure> {
        let cell = self.cell;
        let params = CellParameters::new(cell.a, cell.b, cell.c, cell.alpha, cell.beta, cell.gamma);
        let centring: Centring = cell.centring.parse().map_err(EngineError::from)?;
        let unit_cell = UnitCell::new(params, centring).map_err(EngineError::from)?;

        let operations = self
            .symops
            .iter()
            .map(|text| SymmetryOperation::parse(text).map_err(EngineError::from))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let sites = self
            .sites
            .into_iter()
            .map(|entry| {
                let mut site = Site::new(
                    Point3::new(entry.x, entry.y, entry.z),
                    parse_types(&entry.element)?,
                );
                site.label = entry.label;
                site.properties = entry.properties;
                Ok(site)
            })
            .collect::<Result<Vec<_>>>()?;

        let name = self.name.unwrap_or_else(|| fallback_name.to_string());
        Ok(Structure::new(name, unit_cell, sites, operations))
    }
}

/// Loads a structure file, naming the structure after the file stem unless
/// the file names it.
pub fn load_structure(path: &Path) -> Result<Structure> {
    debug!("Loading structure from file: {:?}", path);
    let content = std::fs::read_to_string(path)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "structure".to_string());
    let file: StructureFile = toml::from_str(&content).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    file.into_structure(&stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn parse_structure(text: &str, fallback_name: &str) -> Result<Structure> {
        let file: StructureFile = toml::from_str(text)
            .map_err(|e| CliError::Config(format!("Invalid structure: {e}")))?;
        file.into_structure(fallback_name)
    }

    const WATER: &str = r#"
        name = "water"
        symops = ["x,y,z"]

        [cell]
        a = 10.0
        b = 10.0
        c = 10.0
        alpha = 90.0
        beta = 90.0
        gamma = 90.0

        [[sites]]
        label = "O1"
        element = "O"
        x = 0.2
        y = 0.3
        z = 0.4

        [[sites]]
        element = "H"
        x = 0.27
        y = 0.35
        z = 0.4
    "#;

    #[test]
    fn parses_a_structure_document() {
        let structure = parse_structure(WATER, "fallback").unwrap();
        assert_eq!(structure.name, "water");
        assert_eq!(structure.sites.len(), 2);
        assert_eq!(structure.sites[0].label.as_deref(), Some("O1"));
        assert_eq!(structure.sites[1].types, AtomTypeSet::single(1));
        assert_eq!(structure.operations.len(), 1);
        assert_eq!(structure.cell.centring(), Centring::P);
    }

    #[test]
    fn defaults_to_identity_and_primitive_cell() {
        let text = r#"
            [cell]
            a = 5.0
            b = 6.0
            c = 7.0
            alpha = 90.0
            beta = 100.0
            gamma = 90.0
        "#;
        let structure = parse_structure(text, "unnamed").unwrap();
        assert_eq!(structure.name, "unnamed");
        assert!(structure.operations[0].is_identity());
        assert!(structure.sites.is_empty());
    }

    #[test]
    fn disordered_sites_become_wildcards() {
        let text = WATER.replace("element = \"O\"", "element = \"O, N\"");
        let structure = parse_structure(&text, "x").unwrap();
        assert!(structure.sites[0].types.is_wildcard());
    }

    #[test]
    fn rejects_bad_input() {
        let unknown = WATER.replace("element = \"H\"", "element = \"Xx\"");
        assert!(matches!(parse_structure(&unknown, "x"), Err(CliError::Config(_))));

        let bad_symop = WATER.replace("symops = [\"x,y,z\"]", "symops = [\"x,y,q\"]");
        assert!(matches!(
            parse_structure(&bad_symop, "x"),
            Err(CliError::Core(EngineError::Parse(_)))
        ));

        let flat = WATER.replace("c = 10.0", "c = 0.0");
        assert!(matches!(
            parse_structure(&flat, "x"),
            Err(CliError::Core(EngineError::DegenerateCell(_)))
        ));

        let extra = format!("{WATER}\nspace-group = \"P1\"\n");
        assert!(parse_structure(&extra, "x").is_err());
    }

    #[test]
    fn file_stem_names_unnamed_structures() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ice.toml");
        fs::write(&path, WATER.replace("name = \"water\"", "")).unwrap();
        let structure = load_structure(&path).unwrap();
        assert_eq!(structure.name, "ice");

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "[cell").unwrap();
        assert!(matches!(
            load_structure(&broken),
            Err(CliError::FileParsing { .. })
        ));
    }
}
