//! Model Monitoring CLI
//!
//! - `model-monitor psi` - Population Stability Index for a distribution snapshot
//! - `model-monitor max-dpd` - forward Max DPD / Bad Flag tables
//! - `model-monitor gini` - KS, AUROC and Gini over the performance base
//! - `model-monitor run` - all of the above

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use model_monitoring::discrimination::as_percent;
use model_monitoring::pipeline::{DiscriminationRun, PerformanceRun, PsiRun};
use model_monitoring::{report, MonitoringConfig, MonitoringRunner, Segment, WholesaleScheme, YearMonth};
use std::path::{Path, PathBuf};

/// Monitoring statistics for credit-risk PD models
#[derive(Parser)]
#[command(name = "model-monitor")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory reports are written to
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Directory holding search_dpd_<MMYY>.csv files
    #[arg(long, global = true)]
    dpd_dir: Option<PathBuf>,

    /// Wholesale binning scheme (numeric-cutoff, categorical-grade)
    #[arg(long, global = true)]
    wholesale_scheme: Option<WholesaleScheme>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct PerformanceArgs {
    /// Performance snapshot CSV
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Observation periods, comma separated (YYYY.MM)
    #[arg(short, long, value_delimiter = ',', required = true)]
    periods: Vec<String>,

    /// Delinquency months to load, comma separated (MMYY). Defaults to every
    /// month in the periods' forward windows.
    #[arg(short, long, value_delimiter = ',')]
    dpd_months: Vec<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Population Stability Index
    Psi {
        /// Segment (SME, Wholesale, Mortgage)
        #[arg(long)]
        segment: Segment,

        /// Distribution snapshot CSV
        #[arg(short, long)]
        snapshot: PathBuf,
    },

    /// Max DPD and Bad Flag over the forward twelve months
    MaxDpd {
        #[arg(long)]
        segment: Segment,

        #[command(flatten)]
        performance: PerformanceArgs,
    },

    /// KS, AUROC and Gini
    Gini {
        #[arg(long)]
        segment: Segment,

        #[command(flatten)]
        performance: PerformanceArgs,
    },

    /// PSI, Max DPD and Gini in one run
    Run {
        #[arg(long)]
        segment: Segment,

        /// Distribution snapshot CSV for PSI
        #[arg(long)]
        distribution: PathBuf,

        #[command(flatten)]
        performance: PerformanceArgs,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let mut config =
        MonitoringConfig::load(cli.config.as_deref()).context("Loading configuration failed")?;
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(dir) = cli.dpd_dir {
        config.dpd_dir = dir;
    }
    if let Some(scheme) = cli.wholesale_scheme {
        config.wholesale_scheme = scheme;
    }
    let out = config.output_dir.clone();

    match cli.command {
        Command::Psi { segment, snapshot } => {
            let runner = MonitoringRunner::new(segment, config);
            let psi = runner.run_psi(&snapshot).context("PSI calculation failed")?;
            print_psi(&psi);
            write_psi(&out, &psi)?;
        }
        Command::MaxDpd { segment, performance } => {
            let runner = MonitoringRunner::new(segment, config);
            let perf = max_dpd(&runner, &performance)?;
            print_performance(&perf);
            write_performance(&out, &perf)?;
        }
        Command::Gini { segment, performance } => {
            let runner = MonitoringRunner::new(segment, config);
            let perf = max_dpd(&runner, &performance)?;
            let gini = runner
                .run_discrimination(&perf.base)
                .context("Gini calculation failed")?;
            print_performance(&perf);
            print_gini(&gini);
            write_gini(&out, &gini)?;
        }
        Command::Run {
            segment,
            distribution,
            performance,
        } => {
            let runner = MonitoringRunner::new(segment, config);
            let psi = runner.run_psi(&distribution).context("PSI calculation failed")?;
            let perf = max_dpd(&runner, &performance)?;
            let gini = runner
                .run_discrimination(&perf.base)
                .context("Gini calculation failed")?;

            print_psi(&psi);
            print_performance(&perf);
            print_gini(&gini);

            write_psi(&out, &psi)?;
            write_performance(&out, &perf)?;
            write_gini(&out, &gini)?;
        }
    }

    Ok(())
}

fn max_dpd(runner: &MonitoringRunner, args: &PerformanceArgs) -> Result<PerformanceRun> {
    let periods = args
        .periods
        .iter()
        .map(|p| YearMonth::parse_period(p))
        .collect::<model_monitoring::Result<Vec<_>>>()
        .context("Reading observation periods failed")?;

    let dpd_months = if args.dpd_months.is_empty() {
        let mut months: Vec<YearMonth> = periods.iter().flat_map(|p| p.forward_window()).collect();
        months.sort();
        months.dedup();
        months
    } else {
        args.dpd_months
            .iter()
            .map(|m| YearMonth::parse_mmyy(m))
            .collect::<model_monitoring::Result<Vec<_>>>()
            .context("Reading delinquency months failed")?
    };

    runner
        .run_max_dpd(&args.snapshot, &periods, &dpd_months)
        .context("Max DPD calculation failed")
}

fn print_psi(run: &PsiRun) {
    println!("\nPSI - {}", run.segment);
    println!("  Rows: {}  Customers: {}", run.input_rows, run.customers);
    for (size, result) in run.report.results() {
        if let Some(size) = size {
            println!("\n  {}", size);
        }
        println!(
            "  {:>8} {:>8} {:>10} {:>10} {:>10} {:>10}",
            "PD Group", "Total", "Actual", "Expected", "ln(A/E)", "Index"
        );
        println!("  {}", "-".repeat(61));
        for bin in &result.bins {
            println!(
                "  {:>8} {:>8} {:>10.4} {:>10.4} {:>10.4} {:>10.6}",
                bin.pd_group.to_string(),
                bin.total,
                bin.actual_pct,
                bin.expected,
                bin.log_ratio,
                bin.index
            );
        }
        println!("  PSI: {:.6}", result.psi);
    }
}

fn print_performance(run: &PerformanceRun) {
    println!("\nMax DPD - {}", run.segment);
    println!("  {:>8} {:>10} {:>8}", "Period", "Accounts", "Bad");
    println!("  {}", "-".repeat(28));
    for table in &run.base.tables {
        println!(
            "  {:>8} {:>10} {:>8}",
            table.period.to_string(),
            table.rows.len(),
            table.bad_count()
        );
    }
    if !run.base.missing_months.is_empty() {
        let missing: Vec<String> = run.base.missing_months.iter().map(|m| m.mmyy()).collect();
        println!("  Missing delinquency months: {}", missing.join(", "));
    }
}

fn print_gini(run: &DiscriminationRun) {
    let r = &run.report;
    println!("\nGini - {}", run.segment);
    println!("  Rows: {}  Customers: {}", run.input_rows, run.customers);
    println!(
        "  {:>8} {:>6} {:>8} {:>8} {:>10} {:>8}",
        "PD Group", "Bad", "Good", "Total", "Bad Rate", "KS"
    );
    println!("  {}", "-".repeat(53));
    for bin in &r.bins {
        let bad_rate = bin
            .bad_rate
            .map(|b| format!("{:.4}", b))
            .unwrap_or_default();
        println!(
            "  {:>8} {:>6} {:>8} {:>8} {:>10} {:>8.4}",
            bin.pd_group.to_string(),
            bin.bad,
            bin.good,
            bin.total,
            bad_rate,
            bin.ks
        );
    }
    println!("  KS:    {:.2}%", as_percent(r.ks));
    println!("  AUROC: {:.2}%", as_percent(r.auroc));
    println!("  Gini:  {:.2}%", as_percent(r.gini));
}

fn write_psi(out: &Path, run: &PsiRun) -> Result<()> {
    let paths =
        report::write_psi(out, run.segment, &run.report).context("Writing PSI report failed")?;
    for path in paths {
        println!("\nPSI written to: {}", path.display());
    }
    Ok(())
}

fn write_performance(out: &Path, run: &PerformanceRun) -> Result<()> {
    let dir = report::write_performance(out, run.segment, &run.base)
        .context("Writing Max DPD tables failed")?;
    println!("\nMax DPD tables written to: {}", dir.display());
    Ok(())
}

fn write_gini(out: &Path, run: &DiscriminationRun) -> Result<()> {
    let path = report::write_gini(out, run.segment, &run.report)
        .context("Writing Gini report failed")?;
    println!("\nGini written to: {}", path.display());
    Ok(())
}
