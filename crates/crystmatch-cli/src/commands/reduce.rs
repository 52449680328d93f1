use crate::cli::ReduceArgs;
use crate::error::Result;
use crate::input;
use crystmatch::core::lattice::reduce_cell;
use crystmatch::engine::error::EngineError;
use tracing::info;

pub fn run(args: ReduceArgs) -> Result<()> {
    let structure = input::load_structure(&args.input)?;
    let cell = &structure.cell;
    info!(
        "Reducing the {} cell of '{}'.",
        cell.centring(),
        structure.name
    );

    let reduced = reduce_cell(cell.params(), cell.centring()).map_err(EngineError::from)?;

    println!("{}", structure.name);
    println!("  input   {}  ({})", cell.params(), cell.centring());
    println!("  reduced {}", reduced.params);
    println!("  volume  {:.4} Å³ (primitive)", reduced.volume);
    Ok(())
}
