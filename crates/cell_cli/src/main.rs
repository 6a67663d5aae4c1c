mod trace;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cell_control::{CommandSource, ScriptedOperator};
use cell_core::{
    step, Counters, Event, EventEnvelope, GeneratorHandle, ThresholdController,
};
use cell_world::{
    advance_part, build_part, find_generator, find_resource, load_scenario, ConverterHandle,
    ResourceHandle,
};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::trace::{TraceRow, TraceWriter};

type Controller = ThresholdController<ResourceHandle, ConverterHandle>;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "cell_cli", about = "Automatic fuel cell controller runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario for a fixed number of ticks.
    Run(RunArgs),
    /// Load and validate a scenario file without running it.
    Check {
        #[arg(long)]
        scenario: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Scenario JSON file.
    #[arg(long, default_value = "./content/fuel_cell_basic.json")]
    scenario: PathBuf,
    #[arg(long)]
    ticks: u64,
    /// Seed for load jitter. Random when omitted.
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 100)]
    print_every: u64,
    /// Write one CSV row per tick to this file.
    #[arg(long)]
    trace_csv: Option<PathBuf>,
    /// Write the controller configuration at the end of the run to this file.
    #[arg(long)]
    save_config: Option<PathBuf>,
    /// Simulate the host-wide advanced controls setting being off.
    #[arg(long)]
    no_advanced_controls: bool,
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RunTotals {
    starts: u64,
    stops: u64,
    faults: u64,
    brownout_ticks: u64,
    starved_ticks: u64,
    consumed: f64,
}

fn run(args: &RunArgs) -> Result<()> {
    let mut scenario = load_scenario(&args.scenario)?;
    if args.no_advanced_controls {
        scenario.controller.advanced_controls_enabled = false;
    }
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let part = build_part(&scenario);
    let mut controller = ThresholdController::initialize(
        find_resource(&part, &scenario.resource),
        find_generator(&part, &scenario.resource),
        scenario.controller,
    )
    .context("initializing controller")?;
    let mut operator = ScriptedOperator::new(scenario.script.clone());
    let mut trace_writer = args
        .trace_csv
        .as_deref()
        .map(TraceWriter::create)
        .transpose()?;

    tracing::info!(scenario = %scenario.name, seed, ticks = args.ticks, "starting run");
    println!(
        "Starting scenario '{}': ticks={} seed={seed} band={} mode={}",
        scenario.name,
        args.ticks,
        controller.band(),
        controller.mode(),
    );
    println!("{}", "-".repeat(80));

    let mut counters = Counters::default();
    let mut next_command_id = 0u64;
    let mut totals = RunTotals::default();

    for _ in 0..args.ticks {
        let tick = counters.tick;
        let commands = operator.generate_commands(tick, &mut next_command_id);
        let events = step(&mut controller, &mut counters, &commands);
        for event in &events {
            record_event(event, &mut totals);
        }

        let load = scenario.load.sample(&mut rng);
        let flow = advance_part(&mut part.borrow_mut(), &scenario.resource, load);
        totals.consumed += flow.consumed;
        if flow.starved_converters > 0 {
            totals.starved_ticks += 1;
            tracing::debug!(tick, starved = flow.starved_converters, "converter out of input");
        }
        if flow.shortfall > 0.0 {
            totals.brownout_ticks += 1;
            tracing::debug!(tick, shortfall = flow.shortfall, "load not fully served");
        }

        if let Some(writer) = trace_writer.as_mut() {
            writer.write_row(&TraceRow {
                tick,
                charge_percent: controller.charge_level(),
                running: is_running(&controller),
                action: action_label(&events),
                load,
                produced: flow.produced,
                consumed: flow.consumed,
                shortfall: flow.shortfall,
                starved_converters: flow.starved_converters,
            })?;
        }

        if args.print_every > 0 && counters.tick % args.print_every == 0 {
            print_status(counters.tick, &controller);
        }
    }

    println!("{}", "-".repeat(80));
    println!("Done. Final state at tick {}:", counters.tick);
    print_status(counters.tick, &controller);
    println!(
        "starts={} stops={} faults={} brownout_ticks={} starved_ticks={} consumed={:.1}",
        totals.starts,
        totals.stops,
        totals.faults,
        totals.brownout_ticks,
        totals.starved_ticks,
        totals.consumed
    );

    if let Some(mut writer) = trace_writer {
        writer.flush()?;
    }
    if let Some(path) = &args.save_config {
        save_config(path, &controller)?;
        println!("Controller config written to {}", path.display());
    }
    Ok(())
}

fn record_event(envelope: &EventEnvelope, totals: &mut RunTotals) {
    match &envelope.event {
        Event::GeneratorStarted { charge_percent } => {
            totals.starts += 1;
            println!(
                "*** GENERATOR STARTED at tick={:04} charge={charge_percent:.2}% ***",
                envelope.tick
            );
        }
        Event::GeneratorStopped { charge_percent } => {
            totals.stops += 1;
            println!(
                "*** GENERATOR STOPPED at tick={:04} charge={charge_percent:.2}% ***",
                envelope.tick
            );
        }
        Event::ModeChanged { mode } => {
            println!("*** MODE {mode} at tick={:04} ***", envelope.tick);
        }
        Event::ThresholdsChanged { band } => {
            println!("*** THRESHOLDS {band} at tick={:04} ***", envelope.tick);
        }
        Event::AdvancedControlsChanged { enabled } => {
            println!(
                "*** ADVANCED CONTROLS {} at tick={:04} ***",
                if *enabled { "ON" } else { "OFF" },
                envelope.tick
            );
        }
        Event::CommandIgnored { command, reason } => {
            tracing::info!(tick = envelope.tick, ?command, reason, "command ignored");
        }
        Event::ControllerDisabled { reason } => {
            println!("*** CONTROLLER DISABLED: {reason} ***");
        }
        Event::TickFaulted { message } => {
            totals.faults += 1;
            tracing::warn!(tick = envelope.tick, message, "tick faulted");
        }
    }
}

fn action_label(events: &[EventEnvelope]) -> &'static str {
    events
        .iter()
        .find_map(|e| match e.event {
            Event::GeneratorStarted { .. } => Some("start"),
            Event::GeneratorStopped { .. } => Some("stop"),
            _ => None,
        })
        .unwrap_or("")
}

fn is_running(controller: &Controller) -> bool {
    controller
        .generator()
        .is_some_and(GeneratorHandle::is_running)
}

fn print_status(tick: u64, controller: &Controller) {
    let generator = if controller.is_disabled() {
        "n/a"
    } else if is_running(controller) {
        "running"
    } else {
        "stopped"
    };
    println!(
        "[tick={tick:04}]  charge={charge:>7}  generator={generator:<7}  mode={mode}  band={band}",
        charge = controller.charge_display(),
        mode = controller.mode(),
        band = controller.band(),
    );
}

fn save_config(path: &Path, controller: &Controller) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, controller.config())
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn check(scenario_path: &Path) -> Result<()> {
    let scenario = load_scenario(scenario_path)?;
    let part = build_part(&scenario);
    let charge = find_resource(&part, &scenario.resource);
    let generator = find_generator(&part, &scenario.resource);
    println!(
        "Scenario '{}' is valid: resources={} modules={} script_entries={}",
        scenario.name,
        scenario.part.resources.len(),
        scenario.part.modules.len(),
        scenario.script.len(),
    );
    println!(
        "  charge source: {}",
        if charge.is_some() { "found" } else { "missing" }
    );
    match generator {
        Some(handle) => println!("  generator: {}", handle.module_name()),
        None => println!("  generator: missing (controller would start disabled)"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(&args)?,
        Commands::Check { scenario } => check(&scenario)?,
    }
    Ok(())
}
