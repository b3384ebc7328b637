// Sweep approximate threshold recovery over pool sizes and thresholds.
//
// For every `(n, t)` pair a fresh secret is dealt, recovered once, and the
// per-stage timings and the deviation from the secret are reported.

use std::{env, error::Error, process::exit, time::Duration};

use approx_ss::params::{BaseParametersBuilder, SearchConfig};
use approx_ss::{ApproxRecovery, RunReport, SimulationMode};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rand::thread_rng;
use tracing_subscriber::EnvFilter;

fn print_notice_and_exit(error: Option<String>) -> ! {
    println!(
        "{} Approximate threshold recovery sweep",
        style("  overview:").magenta().bold()
    );
    println!(
        "{} approx_sweep [-h] [--help] [--degree=<value>] [--bound=<value>] [--parties=<n,...>] [--representative]",
        style("     usage:").magenta().bold()
    );
    println!(
        "{} {} must be a power of two, {} must be at least 1",
        style("constraints:").magenta().bold(),
        style("degree").blue(),
        style("bound").blue(),
    );
    if let Some(error) = error {
        println!("{} {}", style("     error:").red().bold(), error);
    }
    exit(0);
}

fn parse_value<T: std::str::FromStr>(arg: &str, name: &str) -> T {
    let parts: Vec<&str> = arg.rsplit('=').collect();
    match parts.first().map(|v| v.parse::<T>()) {
        Some(Ok(value)) if parts.len() == 2 => value,
        _ => print_notice_and_exit(Some(format!("Invalid `--{name}` argument"))),
    }
}

fn thresholds(n: usize) -> Vec<usize> {
    let mut ts = vec![1, n / 6 + 1, n / 3 + 1, n / 2 + 1, n];
    ts.sort_unstable();
    ts.dedup();
    ts
}

fn ms(d: Duration) -> String {
    format!("{:.1}ms", d.as_secs_f64() * 1000.0)
}

fn print_report(report: &RunReport) {
    let verdict = if report.success {
        style("ok").green().bold()
    } else {
        style("FAIL").red().bold()
    };
    println!(
        "\tn = {:>4}  t = {:>4}  {}  deviation {:>5} / {:<5} round1 {:>10} round2 {:>10} decrypt {:>9} total {:>10}",
        report.n,
        report.threshold,
        verdict,
        report.max_deviation,
        report.bound,
        ms(report.timings.round1),
        ms(report.timings.round2),
        ms(report.timings.decrypt),
        ms(report.timings.total()),
    );
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.contains(&"-h".to_string()) || args.contains(&"--help".to_string()) {
        print_notice_and_exit(None)
    }

    let mut degree = 4096;
    let mut bound: u64 = 16;
    let mut parties = vec![32, 64, 128];
    let mut representative = false;

    for arg in &args {
        if arg.starts_with("--degree") {
            degree = parse_value(arg, "degree");
        } else if arg.starts_with("--bound") {
            bound = parse_value(arg, "bound");
        } else if arg.starts_with("--parties") {
            let list: String = parse_value(arg, "parties");
            parties = list
                .split(',')
                .map(|p| p.trim().parse::<usize>())
                .collect::<Result<_, _>>()
                .unwrap_or_else(|_| {
                    print_notice_and_exit(Some("Invalid `--parties` argument".to_string()))
                });
        } else if arg == "--representative" {
            representative = true;
        } else {
            print_notice_and_exit(Some(format!("Unrecognized argument: {arg}")))
        }
    }
    if !degree.is_power_of_two() || bound == 0 || parties.contains(&0) {
        print_notice_and_exit(Some("Invalid parameters".to_string()))
    }

    let mode = if representative {
        SimulationMode::Representative
    } else {
        SimulationMode::PerParty
    };
    let base = BaseParametersBuilder::new().set_degree(degree).build_arc()?;

    println!("# Approximate threshold recovery");
    println!("\tdegree = {degree}");
    println!("\tbase modulus = {}", base.modulus());
    println!("\tsmudging bound = {bound}");
    println!("\tmode = {mode:?}");

    let cases: Vec<(usize, usize)> = parties
        .iter()
        .flat_map(|n| thresholds(*n).into_iter().map(move |t| (*n, t)))
        .collect();

    let pb = ProgressBar::new(cases.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );

    let mut rng = thread_rng();
    let mut reports = Vec::with_capacity(cases.len());
    for (n, t) in cases {
        pb.set_message(format!("n = {n}, t = {t}"));
        let mut recovery = ApproxRecovery::new(n, t, base.clone(), SearchConfig::default(), mode)?;
        reports.push(recovery.run_once_with_rng(bound, &mut rng)?);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let mut current = 0;
    for report in &reports {
        if report.n != current {
            current = report.n;
            println!("{} q1 = {:#x}", style(format!("n = {current}:")).bold(), report.q1);
        }
        print_report(report);
    }

    let failures = reports.iter().filter(|r| !r.success).count();
    if failures > 0 {
        println!("{} {failures} run(s) outside the noise bound", style("error:").red().bold());
        exit(1);
    }
    Ok(())
}
