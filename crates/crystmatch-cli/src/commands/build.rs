use crate::cli::BuildArgs;
use crate::config::PartialBuildConfig;
use crate::error::{CliError, Result};
use crate::input;
use crystmatch::core::io::graph_format::write_graphs;
use crystmatch::core::models::graph::Graph;
use crystmatch::core::models::molecule::Molecule;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

pub fn run(args: BuildArgs) -> Result<()> {
    let structure = input::load_structure(&args.input)?;
    let options = PartialBuildConfig::default().merge_with_cli(&args.assembly)?;

    info!("Building molecules of '{}'.", structure.name);
    let molecules = structure.build(&options)?;

    println!("{}", summarize(&structure.name, &molecules));

    if let Some(output) = &args.output {
        write_molecule_graphs(&molecules, output)?;
        println!(
            "✓ Wrote {} molecule graph(s) to: {}",
            molecules.len(),
            output.display()
        );
    }
    Ok(())
}

fn summarize(name: &str, molecules: &[Molecule]) -> String {
    let atoms: usize = molecules.iter().map(Molecule::len).sum();
    let mut lines = vec![format!(
        "{name}: {} molecule(s), {atoms} atom(s)",
        molecules.len()
    )];
    lines.extend(molecules.iter().enumerate().map(|(i, molecule)| {
        format!(
            "  #{:<4} {:<16} {:>5} atoms {:>5} bonds",
            i + 1,
            molecule.formula(),
            molecule.len(),
            molecule.bonds().len()
        )
    }));
    lines.join("\n")
}

fn write_molecule_graphs(molecules: &[Molecule], path: &Path) -> Result<()> {
    let graphs: Vec<Graph> = molecules.iter().map(Graph::from).collect();
    let file = File::create(path).map_err(|e| CliError::Output {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    let mut writer = BufWriter::new(file);
    write_graphs(&graphs, &mut writer)
        .map_err(anyhow::Error::from)
        .and_then(|()| writer.flush().map_err(anyhow::Error::from))
        .map_err(|source| CliError::Output {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::AssemblyArgs;
    use crystmatch::core::io::graph_format::read_graphs;
    use std::fs;
    use std::io::BufReader;
    use tempfile::tempdir;

    const CARBON_PAIR: &str = r#"
        name = "pair"

        [cell]
        a = 5.0
        b = 5.0
        c = 5.0
        alpha = 90.0
        beta = 90.0
        gamma = 90.0

        [[sites]]
        element = "C"
        x = 0.1
        y = 0.5
        z = 0.5

        [[sites]]
        element = "C"
        x = 0.9
        y = 0.5
        z = 0.5
    "#;

    fn run_build(pack_complete: bool) -> Vec<Graph> {
        let dir = tempdir().unwrap();
        let input = dir.path().join("pair.toml");
        let output = dir.path().join("pair.graphs");
        fs::write(&input, CARBON_PAIR).unwrap();

        run(BuildArgs {
            input,
            output: Some(output.clone()),
            assembly: AssemblyArgs {
                bond_tolerance: None,
                pack_complete,
            },
        })
        .unwrap();

        let mut reader = BufReader::new(File::open(output).unwrap());
        read_graphs(&mut reader).unwrap()
    }

    #[test]
    fn writes_one_graph_per_molecule() {
        let graphs = run_build(false);
        assert_eq!(graphs.len(), 2);
        assert!(graphs.iter().all(|g| g.len() == 1 && g.edge_count() == 0));
    }

    #[test]
    fn pack_complete_joins_across_the_cell_face() {
        let graphs = run_build(true);
        assert_eq!(graphs.len(), 1);
        assert_eq!(graphs[0].edge_count(), 1);
    }

    #[test]
    fn summary_lists_each_molecule() {
        let text = summarize("empty", &[Molecule::new(Vec::new())]);
        assert!(text.starts_with("empty: 1 molecule(s), 0 atom(s)"));
        assert_eq!(text.lines().count(), 2);
    }
}
