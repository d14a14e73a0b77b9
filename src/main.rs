use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::{LevelFilter, info};
use osemosys_annualize::{
    Settings, annualize_file, capital_recovery_factor, concat::concatenate_dir, sort::sort_dir,
};

/// Capital investment annualization and result table tools for OSeMOSYS runs.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// TOML file with annualization settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only report warnings and errors.
    #[arg(short, long, global = true, default_value_t = false)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add the annualized capital investment column to a result file, in place
    Annualize(AnnualizeArgs),

    /// Print the capital recovery factor
    Crf(CrfArgs),

    /// Merge a folder of per-parameter result files into one table
    Concat(ConcatArgs),

    /// Sort every CSV file of a folder by all of its columns, in place
    Sort(SortArgs),
}

#[derive(Args)]
struct AnnualizeArgs {
    /// The input file, overwritten with the new column.
    input: Option<PathBuf>,

    /// Discount rate as a fraction (0.05 for 5%).
    #[arg(long)]
    discount_rate: Option<f64>,

    /// Asset lifetime in years.
    #[arg(long)]
    lifetime: Option<u32>,

    /// Column holding the capital investments.
    #[arg(long)]
    capital_column: Option<String>,

    /// Name of the column to add.
    #[arg(long)]
    new_column: Option<String>,

    /// Column holding the year.
    #[arg(long)]
    year_column: Option<String>,

    /// Candidate grouping columns, comma separated.
    #[arg(long, value_delimiter = ',')]
    group_by: Option<Vec<String>>,
}

impl AnnualizeArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(input) = &self.input {
            settings.input_file = input.clone();
        }
        if let Some(discount_rate) = self.discount_rate {
            settings.discount_rate = discount_rate;
        }
        if let Some(lifetime) = self.lifetime {
            settings.asset_lifetime = lifetime;
        }
        if let Some(column) = &self.capital_column {
            settings.capital_column = column.clone();
        }
        if let Some(column) = &self.new_column {
            settings.new_column = column.clone();
        }
        if let Some(column) = &self.year_column {
            settings.year_column = column.clone();
        }
        if let Some(columns) = &self.group_by {
            settings.grouping_columns = columns.clone();
        }
    }
}

#[derive(Args)]
struct CrfArgs {
    /// Discount rate as a fraction.
    #[arg(long)]
    discount_rate: f64,

    /// Asset lifetime in years.
    #[arg(long)]
    lifetime: u32,
}

#[derive(Args)]
struct ConcatArgs {
    /// Folder with one result file per parameter.
    input_dir: PathBuf,

    /// Output file; `.csv` is appended when missing.
    output: PathBuf,
}

#[derive(Args)]
struct SortArgs {
    /// Folder whose CSV files are sorted.
    folder: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    match execute(&cli) {
        Ok(()) => {
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {err:?}");
            std::process::exit(1);
        }
    }
}

fn execute(cli: &Cli) -> Result<()> {
    let mut settings =
        Settings::load_or_default(cli.config.as_deref()).context("failed to load settings")?;
    init_logger(settings.verbose && !cli.quiet);

    match &cli.command {
        Commands::Annualize(args) => {
            args.apply(&mut settings);
            annualize_file(&settings)
                .with_context(|| format!("annualization of {:?} failed", settings.input_file))?;
        }
        Commands::Crf(args) => {
            let crf = capital_recovery_factor(args.discount_rate, args.lifetime)?;
            println!("{crf:.6}");
        }
        Commands::Concat(args) => {
            let summary = concatenate_dir(&args.input_dir, &args.output)
                .with_context(|| format!("concatenation of {:?} failed", args.input_dir))?;
            info!("Merged {} parameters into {:?}", summary.parameters.len(), summary.output);
        }
        Commands::Sort(args) => {
            let summary = sort_dir(&args.folder)?;
            if !summary.failed.is_empty() {
                let total = summary.failed.len() + summary.sorted.len();
                bail!("{} of {total} files could not be sorted", summary.failed.len());
            }
        }
    }

    Ok(())
}

fn init_logger(verbose: bool) {
    let level = if verbose { LevelFilter::Info } else { LevelFilter::Warn };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_target(false)
        .format_timestamp(None)
        .init();
}
