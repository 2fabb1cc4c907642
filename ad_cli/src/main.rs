//! CLI demo for the scalar autodiff engine.
//!
//! Builds a few expressions, backpropagates through them and cross-checks the
//! derivatives against central differences.

use std::process::ExitCode;

use ad_scalar::{derivative_check, AutodiffError, GradCheckConfig, Graph, Scalar, DEFAULT_EPSILON};
use clap::Parser;
use log::{debug, error, info};

#[derive(Parser)]
#[command(name = "ad-scalar")]
#[command(about = "Reverse-mode autodiff over scalars, checked against finite differences")]
#[command(version)]
struct Cli {
    /// Value of x in the checked expression
    #[arg(long, default_value_t = 1.5, allow_negative_numbers = true)]
    x: f64,

    /// Value of y in the checked expression
    #[arg(long, default_value_t = 2.5, allow_negative_numbers = true)]
    y: f64,

    /// Step size for central differences
    #[arg(long, default_value_t = DEFAULT_EPSILON)]
    epsilon: f64,

    /// Absolute and relative tolerance of the check
    #[arg(long, default_value_t = 1e-2)]
    tolerance: f64,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// z = (x*y + sigmoid(x)) / (y + 2)
fn checked_expression(_graph: &Graph, v: &[Scalar]) -> Scalar {
    let (x, y) = (&v[0], &v[1]);
    let numerator = x * y + x.sigmoid();
    let denominator = y + 2.0;
    numerator / denominator
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    // RUST_LOG still wins when set
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run_check(cli: &Cli) -> Result<(), AutodiffError> {
    let config = GradCheckConfig::default()
        .with_epsilon(cli.epsilon)
        .with_atol(cli.tolerance)
        .with_rtol(cli.tolerance);
    debug!("gradient check config: {:?}", config);

    println!("Expression: z = (x*y + sigmoid(x)) / (y + 2)");
    println!("At point:   x = {}, y = {}", cli.x, cli.y);

    let report = derivative_check(checked_expression, &[cli.x, cli.y], &config)?;

    println!("Value:      z = {:.10}\n", report.value);
    println!("Backpropagated derivatives:");
    println!("  dz/dx = {:.10}", report.analytic[0]);
    println!("  dz/dy = {:.10}\n", report.analytic[1]);
    println!("Central differences (eps={:e}):", config.epsilon);
    println!("  dz/dx = {:.10}", report.numeric[0]);
    println!("  dz/dy = {:.10}\n", report.numeric[1]);
    println!("Max absolute error: {:.2e}", report.max_abs_error);
    Ok(())
}

fn additional_examples() -> Result<(), AutodiffError> {
    println!("\n=== Additional Examples ===\n");

    println!("1. Recorded history: z = (2 + 3) * 4");
    let graph = Graph::new();
    let a = graph.var(2.0);
    let b = graph.var(3.0);
    let c = graph.var(4.0);
    let sum = &a + &b;
    let z = &sum * &c;
    z.backward()?;
    println!("   z = {} (expected: 20)", z.value());
    println!(
        "   dz/da = {:?}, dz/db = {:?} (expected: 4), dz/dc = {:?} (expected: 5)",
        a.derivative(),
        b.derivative(),
        c.derivative()
    );
    println!("   intermediate sum keeps no derivative: {:?}\n", sum.derivative());

    println!("2. Diamond graph: z = (x + y) * (x - y) = x^2 - y^2");
    let graph = Graph::new();
    let x = graph.var(3.0);
    let y = graph.var(2.0);
    let z = (&x + &y) * (&x - &y);
    z.backward()?;
    println!("   At x = 3.0, y = 2.0:");
    println!("   z = {:.10} (expected: 5)", z.value());
    println!("   dz/dx = {:?} (expected: 2x = 6)", x.derivative());
    println!("   dz/dy = {:?} (expected: -2y = -4)\n", y.derivative());

    println!("3. Fan-out: z = x + x");
    let graph = Graph::new();
    let x = graph.var(1.5);
    let z = &x + &x;
    z.backward()?;
    println!("   dz/dx = {:?} (expected: 2)\n", x.derivative());

    println!("4. Mixed: z = exp(x) * log(y) + relu(x - y)");
    let f = |_: &Graph, v: &[Scalar]| v[0].exp() * v[1].log() + (&v[0] - &v[1]).relu();
    let report = derivative_check(f, &[0.5, 2.0], &GradCheckConfig::default())?;
    println!("   At x = 0.5, y = 2.0:");
    println!("   z = {:.10}", report.value);
    println!("   dz/dx = {:.10}, dz/dy = {:.10}", report.analytic[0], report.analytic[1]);
    println!("   FD check: dz/dx={:.10}, dz/dy={:.10}", report.numeric[0], report.numeric[1]);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    println!("=== Reverse-Mode Scalar Autodiff ===\n");

    if let Err(e) = run_check(&cli) {
        error!("{}", e);
        println!("FAIL: {}", e);
        return ExitCode::FAILURE;
    }
    println!("PASS: tolerance {:.2e}", cli.tolerance);

    if let Err(e) = additional_examples() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    info!("done");
    ExitCode::SUCCESS
}
