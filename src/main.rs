//! crabrl CLI - DTS resolution and XBRL instance validation.

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use colored::*;
use crabrl::error::CalculationValidationError;
use crabrl::{create_dts, load_instance_with_dts, validate_calculations, ValidationConfig};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

#[derive(ClapParser)]
#[command(name = "crabrl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a DTS from a root taxonomy schema and report its shape.
    Taxonomy {
        /// Root schema file (.xsd)
        input: PathBuf,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Load and validate an XBRL instance document.
    Validate {
        /// Instance document (its `link:schemaRef` resolves the DTS)
        input: PathBuf,

        /// Reproduce float-rounded calculation arithmetic instead of exact
        /// decimal parsing.
        #[arg(long)]
        legacy_float_calculation: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct TaxonomyReport {
    schemas: usize,
    concepts: usize,
    presentation_roles: usize,
    hypercubes: usize,
    duration_ms: f64,
}

#[derive(Serialize)]
struct ValidationReport {
    facts_checked: usize,
    errors: Vec<String>,
    duration_ms: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Taxonomy { input, json } => {
            let start = Instant::now();
            let dts = create_dts(&input)
                .with_context(|| format!("failed to build DTS from {}", input.display()))?;
            let elapsed = start.elapsed();

            let report = TaxonomyReport {
                schemas: dts.schemas.len(),
                concepts: dts.concepts.len(),
                presentation_roles: dts.presentation_trees.roles().count(),
                hypercubes: dts.dimensions.hypercube_count(),
                duration_ms: elapsed.as_secs_f64() * 1000.0,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{} {}", "✓".green().bold(), input.display());
                println!("  Schemas:             {}", report.schemas);
                println!("  Concepts:            {}", report.concepts);
                println!("  Presentation roles:  {}", report.presentation_roles);
                println!("  Hypercubes:          {}", report.hypercubes);
                println!("  Time:                {:.2}ms", report.duration_ms);
            }
        }

        Commands::Validate {
            input,
            legacy_float_calculation,
            json,
        } => {
            let start = Instant::now();
            let (dts, instance) = load_instance_with_dts(&input)
                .with_context(|| format!("failed to load instance {}", input.display()))?;

            let config = ValidationConfig {
                legacy_float_calculation,
            };
            let errors = validate_calculations(&dts, &instance, &config);
            let elapsed = start.elapsed();

            let report = ValidationReport {
                facts_checked: instance.facts().count(),
                errors: errors.iter().map(describe_error).collect(),
                duration_ms: elapsed.as_secs_f64() * 1000.0,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.errors.is_empty() {
                println!(
                    "{} {} - {} facts checked, no calculation errors",
                    "✓".green().bold(),
                    input.display(),
                    report.facts_checked
                );
            } else {
                println!(
                    "{} {} - {} calculation error(s)",
                    "✗".red().bold(),
                    input.display(),
                    report.errors.len()
                );
                for e in &report.errors {
                    println!("  {} {}", "ERROR:".red(), e);
                }
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn describe_error(e: &CalculationValidationError) -> String {
    match e {
        CalculationValidationError::MissingValues { concept, .. } => {
            format!("missing summand value for concept #{}", concept.0)
        }
        CalculationValidationError::CalculationMismatch {
            expected,
            computed,
            extended_link_role,
            ..
        } => format!(
            "calculation mismatch in role '{extended_link_role}': expected {expected}, computed {computed}"
        ),
    }
}
