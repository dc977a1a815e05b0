//! sgoop command-line interface.
//!
//! Scores or optimizes a one-dimensional reaction coordinate over
//! collective-variable trajectories, driven by a `key = value` run file.
//!
//! # Usage
//!
//! 1. **Template creation** (`sgoop ci [output_file]`):
//!    writes a commented run file ready to edit
//!
//! 2. **Scoring / optimization** (`sgoop <run_file>`):
//!    evaluates the starting RC or basin-hops from it, prints a summary,
//!    and saves the structured result next to the run file
//!
//! # Examples
//!
//! ```bash
//! # Write a template run file
//! sgoop ci
//! sgoop ci myrun.in
//!
//! # Score or optimize the RC described in a run file
//! sgoop myrun.in
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::process;

use serde::Serialize;
use sgoop::config::RunMode;
use sgoop::evaluate::{unit_coefficients, EvalContext, Evaluation};
use sgoop::io;
use sgoop::optimizer::{self, LogObserver, OptimizeResult};
use sgoop::parser::{self, RunSpec};
use sgoop::trajectory::ColumnSource;

fn main() {
    // Console logger for all commands
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .target(env_logger::Target::Stdout)
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage(&args[0]);
        process::exit(1);
    }
    if args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(0);
    }

    let command = &args[1];
    match command.as_str() {
        "ci" => {
            let output = args.get(2).map(String::as_str).unwrap_or("sgoop.in");
            if output == "--help" || output == "-h" {
                print_usage(&args[0]);
                process::exit(0);
            }
            match parser::write_template(Path::new(output)) {
                Ok(()) => {
                    println!("Template run file created: {output}");
                    println!("Edit the data table paths and CV columns, then run:");
                    println!("  {} {output}", args[0]);
                }
                Err(e) => {
                    eprintln!("Error creating template: {e}");
                    process::exit(1);
                }
            }
        }
        _ => {
            if command.starts_with('-') {
                eprintln!("Error: unknown option: {command}");
                print_usage(&args[0]);
                process::exit(1);
            }
            if let Err(e) = run(Path::new(command)) {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}

/// Prints usage information to stderr.
fn print_usage(program_name: &str) {
    eprintln!("sgoop - spectral gap optimization of order parameters");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {program_name} ci [output_file]");
    eprintln!("                    Create a template run file (default: sgoop.in)");
    eprintln!();
    eprintln!("  {program_name} <run_file>");
    eprintln!("                    Score or optimize the RC described in the run file");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {program_name} ci");
    eprintln!("  {program_name} ci myrun.in");
    eprintln!("  {program_name} myrun.in");
}

/// Runs the mode described by a run file.
fn run(input_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("**** sgoop: spectral gap optimization of order parameters ****");
    println!("                      Version {}\n", env!("CARGO_PKG_VERSION"));

    let spec = parser::parse_input(input_path)?;
    print_configuration(&spec);

    let colvar = io::read_colvar(&spec.colvar)?;
    println!(
        "Loaded {} frames of {} columns from {}",
        colvar.trajectory.len(),
        colvar.trajectory.ncols(),
        spec.colvar.display()
    );

    let context = match &spec.maxcal {
        Some(path) => {
            let maxcal = io::read_colvar(path)?;
            println!(
                "Loaded {} dynamics frames from {}",
                maxcal.trajectory.len(),
                path.display()
            );
            EvalContext::with_dynamics(&colvar.trajectory, &maxcal.trajectory, &spec.config)?
        }
        None => EvalContext::new(&colvar.trajectory, &spec.config)?,
    };

    let result_path = result_path(input_path);
    match spec.mode {
        RunMode::Evaluate => {
            let rc = unit_coefficients(&spec.rc0);
            let score = context.evaluate(&rc)?;
            print_evaluation(&rc, &score);
            let report = EvaluationReport {
                rc: &rc,
                spectral_gap: score.spectral_gap,
                eigenvalues: &score.eigenvalues,
            };
            save_json(&report, &result_path)?;
        }
        RunMode::Optimize => {
            let mut observer = LogObserver;
            let result = optimizer::optimize_rc(&context, &spec.rc0, &spec.hopping, &mut observer)?;
            print_optimization(&spec.rc0, &result);
            result.save(&result_path)?;
        }
    }
    println!("\nResults saved to {}", result_path.display());
    Ok(())
}

/// Derives the JSON result path from the run file name.
fn result_path(input_path: &Path) -> PathBuf {
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("sgoop");
    input_path.with_file_name(format!("{stem}_result.json"))
}

/// Prints the parsed run configuration.
fn print_configuration(spec: &RunSpec) {
    println!("Run configuration");
    println!("-----------------------------------------------");
    println!("  mode           {:?}", spec.mode);
    println!("  colvar         {}", spec.colvar.display());
    if let Some(path) = &spec.maxcal {
        println!("  maxcal         {}", path.display());
    }
    println!("  cv_cols        {:?}", spec.config.cv_cols);
    if let Some(col) = spec.config.v_minus_c_col {
        println!("  v_minus_c_col  {col}");
        println!("  kt             {}", spec.config.kt);
    }
    if let Some(rate) = spec.config.diffusivity {
        println!("  diffusivity    {rate}");
    }
    println!("  rc_bins        {}", spec.config.rc_bins);
    println!("  wells          {}", spec.config.wells);
    println!("  d              {}", spec.config.d);
    if spec.config.kde {
        println!("  kde            on, bandwidth {}", spec.config.bandwidth);
    }
    if spec.mode == RunMode::Optimize {
        println!("  niter          {}", spec.hopping.niter);
        println!("  annealing_temp {}", spec.hopping.annealing_temp);
        println!("  step_size      {}", spec.hopping.step_size);
        if let Some(seed) = spec.hopping.seed {
            println!("  seed           {seed}");
        }
    }
    println!("-----------------------------------------------");
    println!();
}

/// Prints the score of a fixed RC.
fn print_evaluation(rc: &[f64], score: &Evaluation) {
    println!();
    println!("Reaction coordinate   {}", format_rc(rc));
    println!("Spectral gap          {:.8}", score.spectral_gap);
    print_eigenvalues(&score.eigenvalues);
}

/// Prints the outcome of a basin-hopping search.
fn print_optimization(initial: &[f64], result: &OptimizeResult) {
    let accepted = result.trace.iter().filter(|e| e.accepted).count();
    println!();
    println!("Basin hopping summary");
    println!("-----------------------------------------------");
    println!("  iterations      {}", result.trace.len());
    println!("  accepted moves  {accepted}");
    println!("  starting rc     {}", format_rc(&unit_coefficients(initial)));
    println!("  best rc         {}", format_rc(&result.coefficients));
    println!("  spectral gap    {:.8}", result.spectral_gap);
    println!("-----------------------------------------------");
    print_eigenvalues(&result.eigenvalues);
}

fn print_eigenvalues(eigenvalues: &[f64]) {
    let shown = eigenvalues.len().min(8);
    println!(
        "Eigenvalues (ascending, {shown} of {})",
        eigenvalues.len()
    );
    for (i, ev) in eigenvalues.iter().take(shown).enumerate() {
        println!("  {i:>3}  {ev:>14.8}");
    }
}

fn format_rc(coeffs: &[f64]) -> String {
    let parts: Vec<String> = coeffs.iter().map(|c| format!("{c:.4}")).collect();
    format!("[{}]", parts.join(", "))
}

/// JSON payload saved after an evaluate run.
#[derive(Serialize)]
struct EvaluationReport<'a> {
    rc: &'a [f64],
    spectral_gap: f64,
    eigenvalues: &'a [f64],
}

fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}
