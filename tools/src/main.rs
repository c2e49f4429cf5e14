//! sim-runner: headless simulation runner for netops-core.
//!
//! Usage:
//!   sim-runner --scenario startup --seed 42 --seconds 120
//!   sim-runner --scenario sandbox --config data/balance.json --ipc-mode

use anyhow::Result;
use netops_core::{
    command::PlayerCommand,
    config::SimConfig,
    engine::SimEngine,
    event::SimEvent,
    scenario::ScenarioId,
};
use std::env;
use std::io::{self, BufRead, Write};

/// Frames per simulated second when driving the engine headless.
const FPS: u32 = 64;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Advance { seconds: f64 },
    Command { command: PlayerCommand },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let seconds = parse_arg(&args, "--seconds", 120.0f64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let scenario: ScenarioId = str_arg(&args, "--scenario").unwrap_or("sandbox").parse()?;
    let config = match str_arg(&args, "--config") {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };

    if !ipc_mode {
        println!("netops sim-runner");
        println!("  scenario:  {scenario}");
        println!("  seed:      {seed}");
        println!("  seconds:   {seconds}");
        println!();
    }

    let mut engine = SimEngine::build(seed, config)?;
    engine.start_scenario(scenario);

    if ipc_mode {
        run_ipc_loop(&mut engine)?;
    } else {
        engine.apply(PlayerCommand::SetPaused { paused: false });
        let events = engine.run_seconds(seconds, FPS)?;
        print_summary(&engine, &events);
    }

    Ok(())
}

fn run_ipc_loop(engine: &mut SimEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => {}
            IpcCommand::Advance { seconds } => {
                engine.run_seconds(seconds, FPS)?;
            }
            IpcCommand::Command { command } => {
                for event in engine.apply(command) {
                    if let SimEvent::CommandRejected { command, reason } = event {
                        log::warn!("ipc: {command} rejected: {reason}");
                    }
                }
            }
        }
        writeln!(stdout, "{}", serde_json::to_string(&engine.snapshot())?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_summary(engine: &SimEngine, events: &[SimEvent]) {
    let snapshot = engine.snapshot();
    let economy = &snapshot.economy;
    let killed = events
        .iter()
        .filter(|e| matches!(e, SimEvent::NodeKilled { .. }))
        .count();

    println!("=== RUN SUMMARY ===");
    println!("  final tick:      {}", snapshot.tick);
    println!("  cash:            ${:.0}", economy.cash);
    println!("  reputation:      {:.1}", economy.reputation);
    println!("  requests served: {}", economy.requests_served);
    println!("  failures:        {}", economy.failures);
    println!("  research points: {:.1}", economy.research_points);
    println!("  nodes:           {}", snapshot.nodes.len());
    println!("  nodes killed:    {killed}");
    println!("  operating cost:  ${:.0}/s", snapshot.operating_cost);
    println!("  packets in air:  {}", snapshot.active_packets);

    println!();
    println!("=== SCENARIO ===");
    let status = if snapshot.scenario.lost {
        "LOST"
    } else if snapshot.scenario.complete {
        "COMPLETE"
    } else {
        "in progress"
    };
    println!("  status:  {status} at {}s", snapshot.scenario.elapsed_secs);
    if snapshot.scenario.goals.is_empty() {
        println!("  (No goals)");
    }
    for goal in &snapshot.scenario.goals {
        let mark = if goal.met { "x" } else { " " };
        println!("  [{mark}] {} ({:.0} / {:.0})", goal.label, goal.current, goal.target);
    }

    println!();
    println!("=== RECENT LOG ===");
    for entry in snapshot.log.iter().take(10) {
        println!("  {:>6.1}s {:?}: {}", entry.time, entry.severity, entry.message);
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
