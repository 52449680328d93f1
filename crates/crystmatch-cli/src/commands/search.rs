use crate::cli::SearchArgs;
use crate::config::PartialQueryConfig;
use crate::error::{CliError, Result};
use crate::input;
use crate::utils::progress::CliProgressHandler;
use crystmatch::core::io::table::write_csv_to_path;
use crystmatch::engine::matcher::{CancelReason, MatchStatus};
use crystmatch::engine::progress::ProgressReporter;
use crystmatch::workflows::search::{self, TargetReport};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub fn run(args: SearchArgs) -> Result<()> {
    let partial_config = PartialQueryConfig::from_file(&args.query)?;
    info!("Merging query file and CLI arguments...");
    let (query, config) = partial_config.merge_with_cli(&args)?;

    let structures = args
        .inputs
        .iter()
        .map(|path| input::load_structure(path))
        .collect::<Result<Vec<_>>>()?;
    std::fs::create_dir_all(&args.output)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Searching {} structure(s)...", structures.len());
    let results = search::search(&structures, &query, &config, &reporter)?;

    let mut written = 0;
    let mut failed = 0;
    for result in &results {
        let report = match &result.report {
            Ok(report) => report,
            Err(e) => {
                failed += 1;
                warn!("Structure '{}' was skipped: {}", result.name, e);
                eprintln!("✗ {}: {}", result.name, e);
                continue;
            }
        };
        println!("{}", describe(&result.name, report));

        for (index, table) in report.tables.iter().enumerate() {
            if table.is_empty() {
                continue;
            }
            let path = table_path(&args.output, &result.name, index + 1);
            write_csv_to_path(table, &path).map_err(|e| CliError::Output {
                path: path.clone(),
                source: e.into(),
            })?;
            info!("Wrote {} row(s) to {:?}", table.len(), path);
            written += 1;
        }
    }

    println!("✓ Wrote {} table(s) to: {}", written, args.output.display());
    if failed > 0 {
        println!("Warning: {failed} structure(s) could not be searched.");
    }
    Ok(())
}

fn status_note(status: MatchStatus) -> &'static str {
    match status {
        MatchStatus::Complete => "",
        MatchStatus::Cancelled(CancelReason::MatchLimitReached) => " (match limit reached)",
        MatchStatus::Cancelled(CancelReason::TimeBudgetExceeded) => " (time budget exceeded)",
        MatchStatus::Cancelled(CancelReason::StopRequested) => " (stopped)",
    }
}

fn describe(name: &str, report: &TargetReport) -> String {
    if report.screened_out() {
        return format!("{name}: screened out ({} atoms)", report.atoms);
    }
    let packs: Vec<String> = report
        .packs
        .iter()
        .map(|p| {
            format!(
                "{}={}{}",
                p.name,
                p.outcome.matches.len(),
                status_note(p.outcome.status)
            )
        })
        .collect();
    let rows: usize = report.tables.iter().map(|t| t.len()).sum();
    format!(
        "{name}: {} molecule(s), matches {}, {rows} row(s)",
        report.molecules,
        packs.join(" ")
    )
}

/// `<dir>/<structure>_<n>.csv`, with characters unsafe in file names replaced.
fn table_path(dir: &Path, structure: &str, index: usize) -> PathBuf {
    let stem: String = structure
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    dir.join(format!("{stem}_{index}.csv"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::ffi::OsString;
    use std::fs;
    use tempfile::tempdir;

    const CO2: &str = r#"
        name = "co2"

        [cell]
        a = 10.0
        b = 10.0
        c = 10.0
        alpha = 90.0
        beta = 90.0
        gamma = 90.0

        [[sites]]
        element = "C"
        x = 0.5
        y = 0.5
        z = 0.5

        [[sites]]
        element = "O"
        x = 0.384
        y = 0.5
        z = 0.5

        [[sites]]
        element = "O"
        x = 0.616
        y = 0.5
        z = 0.5
    "#;

    const NEON: &str = r#"
        name = "neon"

        [cell]
        a = 4.4
        b = 4.4
        c = 4.4
        alpha = 90.0
        beta = 90.0
        gamma = 90.0

        [[sites]]
        element = "Ne"
        x = 0.0
        y = 0.0
        z = 0.0
    "#;

    const QUERY: &str = r#"
        [search]
        unique = true

        [[packs]]
        name = "OCO"
        template = "1 3 2 8 -1 0 14 6 -1 0 14 8 -1 0 14 1 2 2 3 0"

        [[conditions]]
        name = "linear"
        measure = "angle"
        anchors = ["OCO:1", "OCO:2", "OCO:3"]
        at-least = 170.0
    "#;

    #[test]
    fn search_writes_csv_tables_for_hits_only() {
        let dir = tempdir().unwrap();
        let co2 = dir.path().join("co2.toml");
        let neon = dir.path().join("neon.toml");
        let query = dir.path().join("query.toml");
        let output = dir.path().join("tables");
        fs::write(&co2, CO2).unwrap();
        fs::write(&neon, NEON).unwrap();
        fs::write(&query, QUERY).unwrap();

        let argv: Vec<OsString> = vec![
            "crystmatch".into(),
            "search".into(),
            co2.into(),
            neon.into(),
            "--query".into(),
            query.into(),
            "-o".into(),
            output.clone().into(),
        ];
        let cli = Cli::try_parse_from(argv).unwrap();
        let Commands::Search(args) = cli.command else {
            panic!("expected the search command");
        };
        run(args).unwrap();

        let csv = fs::read_to_string(output.join("co2_1.csv")).unwrap();
        assert_eq!(csv, "OCO:1,OCO:2,OCO:3,linear\n2,1,3,180.0000\n");
        assert!(!output.join("neon_1.csv").exists());
    }

    #[test]
    fn table_names_are_sanitised() {
        let path = table_path(Path::new("out"), "CSD/ABC 01", 2);
        assert_eq!(path, Path::new("out").join("CSD_ABC_01_2.csv"));
    }

    #[test]
    fn statuses_are_annotated() {
        assert_eq!(status_note(MatchStatus::Complete), "");
        assert_eq!(
            status_note(MatchStatus::Cancelled(CancelReason::MatchLimitReached)),
            " (match limit reached)"
        );
    }
}
