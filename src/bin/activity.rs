//! activity - paired abundance/activity analysis CLI
//!
//! Command-line interface for gene-, pathway-, taxon- and bin-level activity
//! analysis of paired count tables.

use clap::{Parser, Subcommand, ValueEnum};
use composable_activity::combine::{CombinedTable, SourceTable};
use composable_activity::config::ActivityConfig;
use composable_activity::data::{ActivityRecord, ActivityTable, CountMatrix, FeatureActivityTable};
use composable_activity::error::Result;
use composable_activity::pipeline::{
    Analysis, FeatureReport, GeneReport, PairingSpec, Pipeline, PipelineConfig,
};
use composable_activity::profile::profile_depth;
use composable_activity::rank::{Order, Statistic};
use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};

/// Output format for summaries.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Paired abundance / activity analysis
#[derive(Parser)]
#[command(name = "activity")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Gene-level activity from per-sample log2 ratios
    Genes {
        /// Genomic (metagenome) count table
        #[arg(short, long)]
        genomic: PathBuf,

        /// Activity (metatranscriptome) count table
        #[arg(short, long)]
        activity: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Token in genomic sample ids replaced to find the activity sample
        #[arg(long, default_value = "MG")]
        from: String,

        /// Replacement token for activity sample ids
        #[arg(long, default_value = "MTX")]
        to: String,

        /// Over-active threshold on the mean log2 ratio
        #[arg(long, default_value = "2.0")]
        threshold: f64,

        /// Summary format
        #[arg(long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Pathway-level activity from across-sample means
    Pathways {
        /// Genomic pathway abundance table
        #[arg(short, long)]
        genomic: PathBuf,

        /// Activity pathway abundance table
        #[arg(short, long)]
        activity: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Number of features in the top / bottom lists
        #[arg(long, default_value = "20")]
        top: usize,
    },

    /// Taxon-level activity scores on percent-normalized tables
    Taxa {
        /// Genomic taxon abundance table
        #[arg(short, long)]
        genomic: PathBuf,

        /// Activity taxon abundance table
        #[arg(short, long)]
        activity: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Number of features in the top / bottom lists
        #[arg(long, default_value = "20")]
        top: usize,
    },

    /// Combine bin relative abundance with bin coverage
    Bins {
        /// Wide relative-abundance table (bins x samples, percent)
        #[arg(short, long)]
        abundance: PathBuf,

        /// Long-format coverage table
        #[arg(short, long)]
        coverage: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Bin id column of the coverage table
        #[arg(long, default_value = "genome")]
        id_column: String,

        /// Sample column of the coverage table
        #[arg(long, default_value = "sample")]
        sample_column: String,

        /// Value column of the coverage table
        #[arg(long, default_value = "coverage")]
        value_column: String,
    },

    /// Run an analysis from a YAML configuration file
    Run {
        /// Path to pipeline configuration YAML
        #[arg(short, long)]
        config: PathBuf,

        /// Genomic table (or bin abundance table)
        #[arg(short, long)]
        genomic: PathBuf,

        /// Activity table (or long-format bin coverage table)
        #[arg(short, long)]
        activity: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Profile sequencing depth of a count table
    Profile {
        /// Count table
        #[arg(short, long)]
        counts: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Write an example pipeline configuration
    Example {
        /// Output path for the YAML file
        #[arg(short, long, default_value = "pipeline.yaml")]
        output: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Genes {
            genomic,
            activity,
            output,
            from,
            to,
            threshold,
            format,
        } => cmd_genes(&genomic, &activity, &output, &from, &to, threshold, format),

        Commands::Pathways {
            genomic,
            activity,
            output,
            top,
        } => cmd_features(
            &genomic,
            &activity,
            &output,
            ActivityConfig::gene(),
            true,
            Statistic::Log2Ratio,
            top,
        ),

        Commands::Taxa {
            genomic,
            activity,
            output,
            top,
        } => cmd_features(
            &genomic,
            &activity,
            &output,
            ActivityConfig::taxon(),
            false,
            Statistic::ActivityScore,
            top,
        ),

        Commands::Bins {
            abundance,
            coverage,
            output,
            id_column,
            sample_column,
            value_column,
        } => cmd_bins(
            &abundance,
            &coverage,
            &output,
            &id_column,
            &sample_column,
            &value_column,
        ),

        Commands::Run {
            config,
            genomic,
            activity,
            output,
        } => cmd_run(&config, &genomic, &activity, &output),

        Commands::Profile { counts, format } => cmd_profile(&counts, format),

        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn load_pair(genomic_path: &Path, activity_path: &Path) -> Result<(CountMatrix, CountMatrix)> {
    info!("Loading {:?} and {:?}...", genomic_path, activity_path);
    let genomic = CountMatrix::from_delimited(genomic_path)?;
    let activity = CountMatrix::from_delimited(activity_path)?;
    info!(
        "Loaded genomic {} x {}, activity {} x {}",
        genomic.n_features(),
        genomic.n_samples(),
        activity.n_features(),
        activity.n_samples()
    );
    Ok((genomic, activity))
}

/// Gene-level analysis with substitution pairing
fn cmd_genes(
    genomic_path: &Path,
    activity_path: &Path,
    output_dir: &Path,
    from: &str,
    to: &str,
    threshold: f64,
    format: Format,
) -> Result<()> {
    let (genomic, activity) = load_pair(genomic_path, activity_path)?;

    let config = ActivityConfig {
        threshold_high: threshold,
        ..ActivityConfig::gene()
    };
    let report = Pipeline::gene()
        .name("genes")
        .config(config)
        .pairing(PairingSpec::Substitution {
            from: from.to_string(),
            to: to.to_string(),
        })
        .run_gene(&genomic, &activity)?;

    write_gene_report(&report, output_dir, format)
}

fn write_gene_report(report: &GeneReport, output_dir: &Path, format: Format) -> Result<()> {
    fs::create_dir_all(output_dir)?;
    report.genomic_normalized.to_tsv(output_dir.join("genomic_normalized.tsv"))?;
    report.activity_normalized.to_tsv(output_dir.join("activity_normalized.tsv"))?;
    report.table.to_tsv(output_dir.join("activity_ratios.tsv"))?;

    let highly_active = report.highly_active()?;
    let under_active = report.under_active()?;
    report
        .table
        .write_records(output_dir.join("highly_active.tsv"), highly_active.iter().copied())?;
    report
        .table
        .write_records(output_dir.join("under_active.tsv"), under_active.iter().copied())?;

    let summary = report.run_summary()?;
    fs::write(
        output_dir.join("summary.json"),
        serde_json::to_string_pretty(&summary)?,
    )?;
    info!("Wrote results to {:?}", output_dir);

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        Format::Text => {
            print!("{}", report.alignment);
            print!("{}", report.summary);
            print_extremes("Most over-active", &report.table, &highly_active);
            print_extremes("Most under-active", &report.table, &under_active);
        }
    }
    Ok(())
}

fn print_extremes(
    title: &str,
    table: &ActivityTable,
    records: &[&ActivityRecord],
) {
    if records.is_empty() {
        return;
    }
    println!("\n{} ({} of {}):", title, records.len(), table.len());
    for r in records.iter().take(5) {
        println!(
            "  {}: mean log2 ratio={:.3}, sd={:.3}",
            r.feature_id, r.mean_log2_ratio, r.std_dev
        );
    }
}

/// Mean-level analysis (pathways, taxa)
fn cmd_features(
    genomic_path: &Path,
    activity_path: &Path,
    output_dir: &Path,
    config: ActivityConfig,
    require_genomic_signal: bool,
    statistic: Statistic,
    top: usize,
) -> Result<()> {
    let (genomic, activity) = load_pair(genomic_path, activity_path)?;

    let report = Pipeline::features()
        .config(config)
        .require_genomic_signal(require_genomic_signal)
        .run_features(&genomic, &activity)?;

    write_feature_report(&report, output_dir, statistic, top)
}

fn write_feature_report(
    report: &FeatureReport,
    output_dir: &Path,
    statistic: Statistic,
    top: usize,
) -> Result<()> {
    fs::create_dir_all(output_dir)?;
    report.genomic_normalized.to_tsv(output_dir.join("genomic_normalized.tsv"))?;
    report.activity_normalized.to_tsv(output_dir.join("activity_normalized.tsv"))?;
    report.table.to_tsv(output_dir.join("feature_activity.tsv"))?;

    let most = report.top_by(statistic, Order::Descending, top)?;
    let least = report.top_by(statistic, Order::Ascending, top)?;
    FeatureActivityTable::write_records(output_dir.join("most_active.tsv"), most.iter().copied())?;
    FeatureActivityTable::write_records(output_dir.join("least_active.tsv"), least.iter().copied())?;
    info!("Wrote results to {:?}", output_dir);

    print!("{}", report.alignment);
    println!("Activity tiers:");
    for (tier, count) in report.tier_counts() {
        println!("  {}: {}", tier.name(), count);
    }
    println!("Quadrants (median thresholds):");
    for (quadrant, count) in report.quadrant_counts() {
        println!("  {}: {}", quadrant.name(), count);
    }
    if !most.is_empty() {
        println!("\nTop {} by {}:", most.len().min(5), statistic.name());
        for r in most.iter().take(5) {
            println!(
                "  {}: score={:.3}, log2 ratio={:.3}",
                r.feature_id, r.activity_score, r.log2_ratio
            );
        }
    }
    Ok(())
}

/// Bin-level join and classification
fn cmd_bins(
    abundance_path: &Path,
    coverage_path: &Path,
    output_dir: &Path,
    id_column: &str,
    sample_column: &str,
    value_column: &str,
) -> Result<()> {
    let abundance = SourceTable::from_matrix(&CountMatrix::from_delimited(abundance_path)?);
    let coverage = SourceTable::from_long_tsv(coverage_path, id_column, sample_column, value_column)?;

    let table = Pipeline::bins().run_bins(&abundance, &coverage)?;
    write_combined(&table, output_dir)
}

fn write_combined(table: &CombinedTable, output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)?;
    table.to_tsv(output_dir.join("combined_abundance_coverage.tsv"))?;
    for (label, _) in table.label_counts() {
        let file = format!("bins_{}.tsv", label.name().to_ascii_lowercase());
        table.write_records(output_dir.join(file), table.with_label(label))?;
    }
    info!("Wrote results to {:?}", output_dir);
    print!("{}", table);
    Ok(())
}

/// Run an analysis from configuration
fn cmd_run(config_path: &Path, genomic_path: &Path, activity_path: &Path, output_dir: &Path) -> Result<()> {
    info!("Loading pipeline configuration from {:?}...", config_path);
    let config_str = fs::read_to_string(config_path)?;
    let config = PipelineConfig::from_yaml(&config_str)?;
    let pipeline = Pipeline::from_config(&config);

    info!("Running pipeline '{}'...", config.name);
    match pipeline.analysis() {
        Analysis::Gene { .. } => {
            let (genomic, activity) = load_pair(genomic_path, activity_path)?;
            let report = pipeline.run_gene(&genomic, &activity)?;
            write_gene_report(&report, output_dir, Format::Text)
        }
        Analysis::Feature { .. } => {
            let (genomic, activity) = load_pair(genomic_path, activity_path)?;
            let report = pipeline.run_features(&genomic, &activity)?;
            write_feature_report(&report, output_dir, Statistic::ActivityScore, 20)
        }
        Analysis::Bin => {
            let abundance = SourceTable::from_matrix(&CountMatrix::from_delimited(genomic_path)?);
            let coverage = SourceTable::from_long_tsv(activity_path, "genome", "sample", "coverage")?;
            let table = pipeline.run_bins(&abundance, &coverage)?;
            write_combined(&table, output_dir)
        }
    }
}

/// Profile sequencing depth
fn cmd_profile(counts_path: &Path, format: Format) -> Result<()> {
    let counts = CountMatrix::from_delimited(counts_path)?;
    let profile = profile_depth(&counts);

    match format {
        Format::Json => {
            let value = serde_json::json!({
                "dimensions": {
                    "n_features": counts.n_features(),
                    "n_samples": counts.n_samples()
                },
                "depth": profile
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Format::Text => {
            println!("Features: {}  Samples: {}", counts.n_features(), counts.n_samples());
            print!("{}", profile);
            if profile.is_highly_variable() {
                println!("  Note: depth varies strongly between samples (CV > 0.5)");
            }
        }
    }
    Ok(())
}

fn cmd_example(output_path: &Path) -> Result<()> {
    let pipeline = Pipeline::gene().name("example-gene-activity").pairing(PairingSpec::Substitution {
        from: "MG".to_string(),
        to: "MTX".to_string(),
    });

    let config = pipeline.to_config(Some(
        "Gene-level activity: CPM normalization, log2((MTX + 1) / (MG + 1)) per sample pair",
    ));
    let yaml = config.to_yaml()?;

    fs::write(output_path, &yaml)?;
    info!("Wrote example pipeline to {:?}", output_path);
    println!("{}", yaml);

    Ok(())
}
