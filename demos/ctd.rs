use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use log::info;

use ctd_rs::config::Settings;
use ctd_rs::engine::{RowEngine, Termination};
use ctd_rs::factor::FactorSpace;
use ctd_rs::ipo::covering_array;
use ctd_rs::model::ModelContract;
use ctd_rs::row::PartialRow;

#[derive(Debug, Parser)]
#[command(author, version, about = "Pairwise test generation against a nuXmv model")]
struct Cli {
    /// More logging (`-v` for debug, `-vv` for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the constraint-blind pairwise covering array.
    Pairwise {
        /// Settings file (JSON).
        #[arg(value_name = "FILE")]
        settings: PathBuf,

        /// Also print the query formula of every row.
        #[arg(long)]
        formulas: bool,

        /// Print every factor's domain with the atom of each value first.
        #[arg(long)]
        domains: bool,
    },
    /// Generate tests against a model with nuXmv.
    Run {
        /// Settings file (JSON).
        #[arg(value_name = "FILE")]
        settings: PathBuf,

        /// nuXmv model.
        #[arg(value_name = "MODEL")]
        model: PathBuf,

        /// Directory for the `run_<name>.txt` step files.
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        out: PathBuf,

        /// Write every accepted test, not only the minimized suite.
        #[arg(long)]
        all: bool,
    },
}

fn render(space: &FactorSpace, row: &PartialRow) -> String {
    space
        .ids()
        .map(|id| match row.get(id) {
            Some(v) => space.describe(id, v),
            None => format!("{}=*", space.factor(id).name()),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn pairwise(settings: PathBuf, show_formulas: bool, show_domains: bool) -> color_eyre::Result<()> {
    let parts = Settings::load(&settings)?.into_parts()?;
    let space = &parts.space;

    if show_domains {
        for factor in space.factors() {
            println!("{}", factor);
        }
        println!();
    }

    let rows = covering_array(&space.domain_sizes());
    println!(
        "{} factor(s), {} pair(s): {} pairwise row(s) instead of {} exhaustive",
        space.len(),
        space.pair_count(),
        rows.len(),
        space.combination_count()
    );
    for (i, row) in rows.iter().enumerate() {
        println!("{:>4}: {}", i + 1, render(space, row));
        if show_formulas {
            println!("      {}", parts.formulas.build(space, row));
        }
    }
    Ok(())
}

fn run(settings: PathBuf, model: PathBuf, out: PathBuf, all: bool) -> color_eyre::Result<()> {
    let settings = Settings::load(&settings)?;
    let model_text =
        fs::read_to_string(&model).wrap_err_with(|| format!("cannot read model {}", model.display()))?;
    let contract = ModelContract::check(&model_text, &settings)?;
    info!("model declares {} name(s)", contract.declared().count());

    let oracle = settings.oracle.oracle(&model);
    let completion = settings.engine.completion();
    let parts = settings.into_parts()?;
    let space = &parts.space;

    let outcome = RowEngine::new(space, &parts.formulas, &parts.extractor, oracle)
        .with_completion(completion)
        .with_config(parts.engine.clone())
        .run()?;

    let report = outcome.report();
    println!("{}", report.describe(space));
    println!("{}", outcome.stats);
    if let Termination::Stalled { unresolved } = &outcome.termination {
        println!("stalled with {} pair(s) unresolved", unresolved.len());
    }
    for failure in &outcome.extraction_failures {
        println!("rejected witness for {}: {}", failure.row.describe(space), failure.error);
    }

    let suite = outcome.minimize();
    println!(
        "{} accepted test(s), {} after minimization",
        outcome.tests.len(),
        suite.len()
    );
    let tests = if all { outcome.tests.as_slice() } else { suite.tests() };

    fs::create_dir_all(&out).wrap_err_with(|| format!("cannot create {}", out.display()))?;
    for test in tests {
        let path = out.join(format!("run_{}.txt", test.name()));
        fs::write(&path, test.render_steps()).wrap_err_with(|| format!("cannot write {}", path.display()))?;
        println!("{}: {}", path.display(), test.assignment().describe(space));
    }

    println!("coverage:");
    for (pair, test) in suite.coverage() {
        println!("  {} -> {}", pair.describe(space), test.name());
    }
    Ok(())
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    let level = match args.verbose {
        0 => simplelog::LevelFilter::Info,
        1 => simplelog::LevelFilter::Debug,
        _ => simplelog::LevelFilter::Trace,
    };
    simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    match args.command {
        Command::Pairwise {
            settings,
            formulas,
            domains,
        } => pairwise(settings, formulas, domains)?,
        Command::Run {
            settings,
            model,
            out,
            all,
        } => run(settings, model, out, all)?,
    }

    println!("All done in {:.3} s", time_total.elapsed().as_secs_f64());
    Ok(())
}
