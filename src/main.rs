use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;
use memtraffic::sim::config::{CpuKind, RunConfig};
use memtraffic::sim::log::init_logger;
use memtraffic::sim::top::Sim;

#[derive(Parser)]
#[command(version, about = "Drive a memory model with synthetic or trace-replay traffic")]
struct MemTrafficArgs {
    #[arg(help = "Path to config.toml")]
    config_path: PathBuf,
    #[arg(long, help = "Override traffic generator (random, stream, trace, dependency_trace)")]
    cpu: Option<CpuKind>,
    #[arg(long, help = "Override trace file path")]
    trace_file: Option<PathBuf>,
    #[arg(long, help = "Override stats output directory")]
    output_dir: Option<PathBuf>,
    #[arg(long, help = "Override number of cycles to simulate")]
    cycles: Option<u64>,
    #[arg(long, help = "Enable log at level (0:warn, 1:info, 2:debug)")]
    log: Option<u64>,
    #[arg(long, help = "Override driver clock ratio")]
    cpu_clock_ratio: Option<u64>,
    #[arg(long, help = "Override memory clock ratio")]
    mem_clock_ratio: Option<u64>,
    #[arg(long, help = "Override random seed")]
    seed: Option<u64>,
}

fn run(argv: MemTrafficArgs) -> anyhow::Result<()> {
    let mut config = RunConfig::from_path(&argv.config_path)?;

    // override toml configs with argv
    let sim = &mut config.sim;
    sim.cpu = argv.cpu.unwrap_or(sim.cpu);
    sim.trace_file = argv.trace_file.or(sim.trace_file.take());
    sim.output_dir = argv.output_dir.unwrap_or(sim.output_dir.clone());
    sim.cycles = argv.cycles.unwrap_or(sim.cycles);
    sim.log_level = argv.log.unwrap_or(sim.log_level);
    let traffic = &mut config.traffic;
    traffic.cpu_clock_ratio = argv.cpu_clock_ratio.unwrap_or(traffic.cpu_clock_ratio);
    traffic.mem_clock_ratio = argv.mem_clock_ratio.unwrap_or(traffic.mem_clock_ratio);
    traffic.seed = argv.seed.unwrap_or(traffic.seed);

    init_logger(config.sim.log_level);

    let mut sim = Sim::new(&config)?;
    let summary = sim.simulate()?;
    println!(
        "simulated {} cycles ({})",
        summary.cycles,
        if summary.finished { "finished" } else { "cycle limit" }
    );
    Ok(())
}

pub fn main() -> ExitCode {
    let argv = MemTrafficArgs::parse();
    match run(argv) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // logger may not be up yet if the config failed to load
            init_logger(0);
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
