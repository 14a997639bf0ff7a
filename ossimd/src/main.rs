//! # Operating System Simulator
//!
//! Main entry point for the simulator host.

use ossimd::{HostConfig, HostRuntime, OutputFormat};
use std::env;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("ossimd");

    let config = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        print_usage(program);
        process::exit(1);
    });

    let runtime = HostRuntime::new(&config).unwrap_or_else(|e| {
        eprintln!("Failed to start simulation: {}", e);
        process::exit(e.exit_code());
    });

    if let Err(e) = runtime.run() {
        eprintln!("Simulation failed: {}", e);
        process::exit(e.exit_code());
    }
}

fn parse_args(args: &[String]) -> Result<HostConfig, String> {
    let program = args.first().map(String::as_str).unwrap_or("ossimd");
    let mut positional = Vec::new();
    let mut format = OutputFormat::Text;
    let mut max_ticks = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "/?" | "-h" | "--help" => {
                print_usage(program);
                process::exit(0);
            }
            "--json" => {
                format = OutputFormat::Json;
            }
            "--max-ticks" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --max-ticks".to_string());
                }
                let limit: u64 = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid max-ticks value: {}", args[i]))?;
                max_ticks = Some(limit);
            }
            other if other.starts_with("--") => {
                return Err(format!("Unknown option: {}", other));
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let (params, jobs, debug) = match positional.as_slice() {
        [params, jobs] => (params, jobs, false),
        [params, jobs, flag] => {
            let debug = match flag.to_ascii_uppercase().as_str() {
                "Y" => true,
                "N" => false,
                _ => return Err(format!("Debug flag must be Y or N, got '{}'", flag)),
            };
            (params, jobs, debug)
        }
        [] | [_] => return Err("Parameter and job files are required".to_string()),
        _ => return Err("Too many arguments".to_string()),
    };

    let mut config = HostConfig::new(params, jobs);
    config.debug = debug;
    config.format = format;
    config.max_ticks = max_ticks;
    Ok(config)
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <PARAMS> <JOBS> [Y|N] [OPTIONS]", program);
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <PARAMS>                 Operating system parameter file (.json or binary)");
    eprintln!("  <JOBS>                   Job file (.json or binary)");
    eprintln!("  Y|N                      Print every event (default N)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --json                   Print events and tables as JSON lines");
    eprintln!("  --max-ticks <N>          Abort as a runaway after N ticks");
    eprintln!("  /?, -h, --help           Show this help message");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} OS_OSP.DAT OS_INP.DAT Y", program);
    eprintln!("  {} params.json jobs.json --json --max-ticks 500", program);
}
