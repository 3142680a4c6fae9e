use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use docreports::config::{Config, CONFIG_FILE};
use docreports::report::{
    self, code_coverage, dependency, doc_coverage, html, terminal, unittest, BuildOptions,
    LegendPosition, LegendStyle, Section,
};
use docreports::ThresholdResult;

const LOG_ENV: &str = "DOCREPORTS_LOG";
const DEFAULT_OUTPUT_DIR: &str = "reports";

#[derive(Parser)]
#[command(name = "docreports")]
#[command(about = "Render coverage, unit test and dependency reports as documentation tables")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (default: docreports.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format of single reports
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Aligned, colored terminal text
    Text,
    /// HTML fragment on stdout
    Html,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and try to read every report
    Check,

    /// Code coverage table of a package
    CodeCoverage {
        /// Package identifier from [codecov.packages]
        id: String,

        /// Where to show the legend
        #[arg(long, value_enum, default_value_t = LegendPosition::Bottom)]
        legend: LegendPosition,
    },

    /// Documentation coverage table of a package
    DocCoverage {
        /// Package identifier from [doccov.packages]
        id: String,
    },

    /// Documentation coverage levels of a package
    DocCoverageLegend {
        id: String,

        #[arg(long, value_enum, default_value_t = LegendStyle::Horizontal)]
        style: LegendStyle,
    },

    /// Unit test summary of a JUnit report
    Unittest {
        /// Report identifier from [unittest.testsuites]
        id: String,

        /// Hide the assertions column
        #[arg(long)]
        no_assertions: bool,
    },

    /// Dependency table of a distribution
    Dependencies {
        /// Package identifier from [dependency.packages]
        id: String,
    },

    /// Render every configured report to HTML pages
    Build {
        /// Output directory
        #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
        output: PathBuf,

        #[arg(long, value_enum, default_value_t = LegendPosition::Bottom)]
        legend: LegendPosition,

        #[arg(long, value_enum, default_value_t = LegendStyle::Horizontal)]
        legend_style: LegendStyle,

        #[arg(long)]
        no_assertions: bool,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let config_path = fs::canonicalize(&config_path)
        .with_context(|| format!("Could not find config file: {}", config_path.display()))?;

    let config = Config::load(&config_path)
        .with_context(|| format!("Could not load {}", config_path.display()))?;

    let format = cli.format;
    match cli.command {
        Commands::Check => cmd_check(&config),
        Commands::CodeCoverage { id, legend } => cmd_code_coverage(&config, &id, legend, format),
        Commands::DocCoverage { id } => cmd_doc_coverage(&config, &id, format),
        Commands::DocCoverageLegend { id, style } => cmd_doc_coverage_legend(&config, &id, style, format),
        Commands::Unittest { id, no_assertions } => cmd_unittest(&config, &id, no_assertions, format),
        Commands::Dependencies { id } => cmd_dependencies(&config, &id, format),
        Commands::Build {
            output,
            legend,
            legend_style,
            no_assertions,
        } => cmd_build(
            &config,
            &output,
            BuildOptions {
                legend,
                legend_style,
                no_assertions,
            },
        ),
    }
}

fn emit(section: &Section, format: OutputFormat) {
    match format {
        OutputFormat::Text => terminal::print_section(section),
        OutputFormat::Html => print!("{}", html::render_section(section)),
    }
}

/// Print the `fail_below` result and exit with an error code when it fails
fn enforce_threshold(threshold: &ThresholdResult, label: &str, format: OutputFormat) {
    if format == OutputFormat::Text {
        threshold.print_summary(label);
    }

    if !threshold.passed {
        if format == OutputFormat::Html {
            eprintln!(
                "{} {} is below {}%",
                "✗".red(),
                label,
                threshold.fail_below
            );
        }
        std::process::exit(1);
    }
}

fn not_found(family: &str, id: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "{} '{}' not found. Use 'docreports check' to list configured reports.",
        family,
        id
    )
}

fn cmd_check(config: &Config) -> Result<()> {
    if config.is_empty() {
        println!("  {}", "No reports configured".dimmed());
        return Ok(());
    }

    println!("{}", "Reports:".bold());

    let reports = report::build_all(config, &BuildOptions::default());
    let mut failures = 0;

    for rendered in &reports {
        let name = format!("{} {}", rendered.kind.prefix(), rendered.id);
        if rendered.section.is_error() {
            failures += 1;
            println!("  {} {}", "✗".red(), name.cyan());
            for block in &rendered.section.blocks {
                if let report::Block::Error { message, .. } = block {
                    println!("    {}", message.red());
                }
            }
        } else {
            println!("  {} {}", "✓".green(), name.cyan());
        }

        if let Some(threshold) = &rendered.threshold {
            threshold.print_summary(&format!("{} coverage", rendered.id));
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} reports could not be built", failures, reports.len());
    }

    Ok(())
}

fn cmd_code_coverage(config: &Config, id: &str, legend: LegendPosition, format: OutputFormat) -> Result<()> {
    let package = config
        .code_coverage_package(id)
        .ok_or_else(|| not_found("Code coverage package", id))?;

    let (section, threshold) = code_coverage::section(package, legend)?;
    emit(&section, format);
    enforce_threshold(&threshold, &package.name, format);

    Ok(())
}

fn cmd_doc_coverage(config: &Config, id: &str, format: OutputFormat) -> Result<()> {
    let package = config
        .doc_coverage_package(id)
        .ok_or_else(|| not_found("Documentation coverage package", id))?;

    let (section, threshold) = doc_coverage::section(package)?;
    emit(&section, format);
    enforce_threshold(&threshold, &package.name, format);

    Ok(())
}

fn cmd_doc_coverage_legend(config: &Config, id: &str, style: LegendStyle, format: OutputFormat) -> Result<()> {
    let package = config
        .doc_coverage_package(id)
        .ok_or_else(|| not_found("Documentation coverage package", id))?;

    emit(&doc_coverage::legend_section(package, style), format);
    Ok(())
}

fn cmd_unittest(config: &Config, id: &str, no_assertions: bool, format: OutputFormat) -> Result<()> {
    let report = config
        .unittest_report(id)
        .ok_or_else(|| not_found("Unittest report", id))?;

    let section = unittest::section(report, no_assertions)
        .with_context(|| format!("Could not build unittest report '{}'", id))?;
    emit(&section, format);
    Ok(())
}

fn cmd_dependencies(config: &Config, id: &str, format: OutputFormat) -> Result<()> {
    let package = config
        .dependency_package(id)
        .ok_or_else(|| not_found("Dependency package", id))?;

    emit(&dependency::section(package)?, format);
    Ok(())
}

fn cmd_build(config: &Config, output: &Path, options: BuildOptions) -> Result<()> {
    let output = config.base_dir.join(output);
    fs::create_dir_all(&output)
        .with_context(|| format!("Could not create output directory: {}", output.display()))?;

    let reports = report::build_all(config, &options);
    let mut below_threshold = Vec::new();

    for rendered in &reports {
        let path = output.join(rendered.file_name());
        html::write_page(&rendered.section, &path)?;

        let marker = if rendered.section.is_error() {
            "✗".red()
        } else {
            "✓".green()
        };
        println!("  {} {}", marker, path.display().to_string().green());

        if let Some(threshold) = &rendered.threshold {
            if !threshold.passed {
                below_threshold.push(rendered.id.clone());
            }
        }
    }

    println!(
        "\n{} {} reports written to {}",
        "📊".cyan(),
        reports.len(),
        output.display()
    );

    if !below_threshold.is_empty() {
        eprintln!(
            "{} Coverage below fail_below: {}",
            "✗".red(),
            below_threshold.join(", ")
        );
        std::process::exit(1);
    }

    Ok(())
}
