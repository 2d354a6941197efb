use anyhow::{bail, Result};
use clap::Parser;
use event2py::cli::{Args, Command};
use event2py::translate::{run_batch, run_print};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.into_command()? {
        Command::Print(print) => run_print(&print),
        Command::Batch(batch) => {
            let report = run_batch(&batch)?;
            let failed = report.failures();
            println!(
                "Translated {} of {} events into {}",
                report.events.len() - failed,
                report.events.len(),
                batch.output_dir.display()
            );
            for (kind, count) in report.unsupported_kind_counts() {
                println!("  unsupported {kind}: {count}");
            }
            if failed > 0 {
                bail!("{failed} events failed to translate");
            }
            Ok(())
        }
    }
}

/// `RUST_LOG` wins over the default filter picked from `--verbose`.
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}
