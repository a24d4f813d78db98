//! PIM Switch Simulator - Command Line Interface
//!
//! Usage:
//!   pim-sim simulate [OPTIONS]    Run one simulation, reporting every 100 ticks
//!   pim-sim sweep [OPTIONS]       Sweep load × PIM iterations in parallel

use clap::{Parser, Subcommand};
use colored::*;

use pim_switch_sim::prelude::*;

#[derive(Parser)]
#[command(name = "pim-sim")]
#[command(about = "Input-queued crossbar switch simulator using Parallel Iterative Matching")]
#[command(version)]
struct Cli {
    /// Output results in JSON format (for machine parsing)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single simulation
    Simulate {
        /// Load settings from a TOML file; explicit flags override it
        #[arg(long)]
        config: Option<String>,

        /// Number of ports on the switch
        #[arg(short = 'p', long)]
        num_ports: Option<usize>,

        /// Per-input, per-tick packet arrival probability
        #[arg(short = 'a', long)]
        arrival_prob: Option<f64>,

        /// Seed for the random number generator
        #[arg(short = 's', long)]
        seed: Option<u64>,

        /// Number of PIM iterations per tick
        #[arg(short = 'i', long)]
        pim_iters: Option<usize>,

        /// Number of ticks to simulate
        #[arg(short = 't', long)]
        simulation_ticks: Option<u64>,

        /// Ticks between average delay reports
        #[arg(long)]
        report_interval: Option<u64>,

        /// Write the effective configuration to a TOML file
        #[arg(long)]
        save_config: Option<String>,
    },

    /// Sweep arrival probability and PIM iterations
    Sweep {
        /// Number of ports on the switch
        #[arg(short = 'p', long, default_value = "16")]
        num_ports: usize,

        /// Seed for the random number generator
        #[arg(short = 's', long, default_value = "1")]
        seed: u64,

        /// Load step; loads run from step up to max_load
        #[arg(long, default_value = "0.1")]
        load_step: f64,

        /// Highest load to simulate
        #[arg(long, default_value = "1.0")]
        max_load: f64,

        /// Largest PIM iteration count; sweeps 1..=max_iters
        #[arg(long, default_value = "4")]
        max_iters: usize,

        /// Number of ticks per point
        #[arg(short = 't', long, default_value = "20000")]
        simulation_ticks: u64,
    },
}

struct SimulateArgs {
    config: Option<String>,
    num_ports: Option<usize>,
    arrival_prob: Option<f64>,
    seed: Option<u64>,
    pim_iters: Option<usize>,
    simulation_ticks: Option<u64>,
    report_interval: Option<u64>,
    save_config: Option<String>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let json_output = cli.json;

    let result = match cli.command {
        Commands::Simulate {
            config,
            num_ports,
            arrival_prob,
            seed,
            pim_iters,
            simulation_ticks,
            report_interval,
            save_config,
        } => run_simulation(
            SimulateArgs {
                config,
                num_ports,
                arrival_prob,
                seed,
                pim_iters,
                simulation_ticks,
                report_interval,
                save_config,
            },
            json_output,
        ),
        Commands::Sweep { num_ports, seed, load_step, max_load, max_iters, simulation_ticks } => {
            run_sweep(num_ports, seed, load_step, max_load, max_iters, simulation_ticks, json_output)
        }
    };

    if let Err(e) = result {
        if json_output {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        } else {
            eprintln!("{}: {}", "Error".red(), e);
        }
        std::process::exit(1);
    }
}

fn resolve_config(args: &SimulateArgs) -> Result<SwitchConfig, SimError> {
    let mut config = match &args.config {
        Some(path) => SwitchConfig::load(path)?,
        None => SwitchConfig::default(),
    };

    if let Some(n) = args.num_ports {
        config.num_ports = n;
    }
    if let Some(p) = args.arrival_prob {
        config.arrival_prob = p;
    }
    if let Some(s) = args.seed {
        config.seed = s;
    }
    if let Some(i) = args.pim_iters {
        config.pim_iters = i;
    }
    if let Some(t) = args.simulation_ticks {
        config.simulation_ticks = t;
    }
    if let Some(r) = args.report_interval {
        config.report_interval = r;
    }

    config.validate()?;
    Ok(config)
}

/// JSON output structure for simulation results
#[derive(serde::Serialize)]
struct SimulationOutput {
    reports: Vec<PeriodicReport>,
    summary: SimulationReport,
    wall_clock_seconds: f64,
}

fn run_simulation(args: SimulateArgs, json_output: bool) -> Result<(), SimError> {
    let config = resolve_config(&args)?;
    if let Some(path) = &args.save_config {
        config.save(path)?;
    }

    if !json_output {
        println!("{}", "╔══════════════════════════════════════════════════════════════╗".cyan());
        println!("{}", "║     PIM Crossbar Switch Simulator                            ║".cyan());
        println!("{}", "╚══════════════════════════════════════════════════════════════╝".cyan());
        println!();
        println!("Configuration:");
        println!("  • Ports: {}", config.num_ports);
        println!("  • Arrival probability: {}", config.arrival_prob);
        println!("  • Seed: {}", config.seed);
        println!("  • PIM iterations: {}", config.pim_iters);
        println!("  • Simulation ticks: {}", config.simulation_ticks);
        println!();
    }

    let mut sim = Simulation::new(config)?;
    let mut reports = Vec::new();

    let start = std::time::Instant::now();
    sim.run_with_reports(|report| {
        if json_output {
            reports.push(*report);
        } else {
            println!("{}", report);
            println!();
        }
    });
    let elapsed = start.elapsed();

    let summary = sim.report();
    if json_output {
        let output = SimulationOutput {
            reports,
            summary,
            wall_clock_seconds: elapsed.as_secs_f64(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", "Simulation complete!".green());
        println!();
        println!("{}", summary);
        println!("Wall-clock time: {:.3}s", elapsed.as_secs_f64());
    }
    Ok(())
}

fn run_sweep(
    num_ports: usize,
    seed: u64,
    load_step: f64,
    max_load: f64,
    max_iters: usize,
    simulation_ticks: u64,
    json_output: bool,
) -> Result<(), SimError> {
    let space = SweepSpace {
        arrival_probs: SweepSpace::load_range(load_step, max_load)?,
        pim_iters: (1..=max_iters).collect(),
    };
    let base = SwitchConfig::new(num_ports, 0.0, seed).with_ticks(simulation_ticks);
    let sweep = ParameterSweep::new(space, base);

    if !json_output {
        println!("{}", "╔══════════════════════════════════════════════════════════════╗".cyan());
        println!("{}", "║           Load × Iteration Sweep                             ║".cyan());
        println!("{}", "╚══════════════════════════════════════════════════════════════╝".cyan());
        println!();
        println!("{}", "Running simulations...".yellow());
    }

    let points = if json_output {
        sweep.run()?
    } else {
        let points = sweep.run_with_progress(|done, total| {
            print!("\rProgress: {}/{}", done, total);
            use std::io::Write;
            std::io::stdout().flush().ok();
        })?;
        println!("\r");
        points
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }

    println!("{}", "Average delay (ticks)".cyan());
    println!("{}", sweep.table(&points));

    println!("{}", "Stable load (backlog ≤ 10 packets/port)".cyan());
    for &iters in &sweep.space.pim_iters {
        match ParameterSweep::saturation_load(&points, iters, 10.0) {
            Some(load) => println!("  • iters={}: {:.2}", iters, load),
            None => println!("  • iters={}: {}", iters, "none".red()),
        }
    }
    println!();
    println!(
        "Single-round saturation throughput for N={}: {:.1}%",
        num_ports,
        pim_switch_sim::single_round_saturation_throughput(num_ports) * 100.0
    );
    println!(
        "Bound on expected rounds to converge: {:.2}",
        pim_switch_sim::expected_rounds_upper_bound(num_ports)
    );
    Ok(())
}
