//! SLAM console for the sonar rover.
//!
//! Feeds telemetry from a serial link (or a recorded log) through the
//! particle-filter SLAM pipeline, renders the occupancy map on an interval,
//! and forwards keyboard teleoperation to the robot.
//!
//! Usage:
//!   cargo run --bin slam_console -- --port /dev/rfcomm0 [OPTIONS]
//!   cargo run --bin slam_console -- --replay drive.log [OPTIONS]
//!
//! Options:
//!   --port <DEV>          Serial device to read telemetry from
//!   --replay <FILE>       Replay a recorded telemetry log instead
//!   --baud <N>            Serial baud rate (default: 9600)
//!   --capture <FILE>      Append received telemetry lines to a log
//!   --particles <N>       Particle count (default: 50)
//!   --seed <N>            RNG seed for a deterministic run
//!   --cell-size <CM>      Map cell size in centimeters (default: 5)
//!   --map-interval <SECS> Seconds between map renders (default: 5)
//!
//! Teleoperation: type z/s/q/d (forward/back/left/right), x or space to
//! stop, then Enter.

use std::env;
use std::process;
use std::time::Duration;

use log::warn;
use tokio::io::{AsyncBufReadExt, BufReader};

use sonar_slam::{
    DriveCommand, FilterConfig, GridConfig, LineParser, ReplayLink, SerialConfig, SerialLink,
    SlamConfig, SlamPipeline, TelemetryLink,
};

struct Args {
    port: Option<String>,
    replay: Option<String>,
    baud: u32,
    capture: Option<String>,
    particles: usize,
    seed: Option<u64>,
    cell_size: u32,
    map_interval: u64,
}

fn parse_args() -> Args {
    let mut args = Args {
        port: None,
        replay: None,
        baud: 9600,
        capture: None,
        particles: 50,
        seed: None,
        cell_size: 5,
        map_interval: 5,
    };

    let raw: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < raw.len() {
        match raw[i].as_str() {
            "--port" => {
                i += 1;
                args.port = Some(take_arg(&raw, i, "port"));
            }
            "--replay" => {
                i += 1;
                args.replay = Some(take_arg(&raw, i, "replay"));
            }
            "--baud" => {
                i += 1;
                args.baud = parse_num_arg(&raw, i, "baud");
            }
            "--capture" => {
                i += 1;
                args.capture = Some(take_arg(&raw, i, "capture"));
            }
            "--particles" => {
                i += 1;
                args.particles = parse_num_arg(&raw, i, "particles");
            }
            "--seed" => {
                i += 1;
                args.seed = Some(parse_num_arg(&raw, i, "seed"));
            }
            "--cell-size" => {
                i += 1;
                args.cell_size = parse_num_arg(&raw, i, "cell-size");
            }
            "--map-interval" => {
                i += 1;
                args.map_interval = parse_num_arg(&raw, i, "map-interval");
            }
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            other => {
                eprintln!("Unknown option: {other}");
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    if args.port.is_some() == args.replay.is_some() {
        eprintln!("Error: pass exactly one of --port or --replay");
        print_usage();
        process::exit(1);
    }
    if args.capture.is_some() && args.port.is_none() {
        eprintln!("Error: --capture only makes sense with --port");
        process::exit(1);
    }

    args
}

fn take_arg(raw: &[String], i: usize, name: &str) -> String {
    raw.get(i)
        .unwrap_or_else(|| {
            eprintln!("Error: --{name} requires a value");
            process::exit(1);
        })
        .clone()
}

fn parse_num_arg<T: std::str::FromStr>(raw: &[String], i: usize, name: &str) -> T {
    take_arg(raw, i, name).parse().unwrap_or_else(|_| {
        eprintln!("Error: invalid value for --{name}");
        process::exit(1);
    })
}

fn print_usage() {
    eprintln!(
        "Usage: slam_console (--port <DEV> | --replay <FILE>) [OPTIONS]\n\
         \n\
         Options:\n\
         \x20 --port <DEV>          Serial device to read telemetry from\n\
         \x20 --replay <FILE>       Replay a recorded telemetry log instead\n\
         \x20 --baud <N>            Serial baud rate (default: 9600)\n\
         \x20 --capture <FILE>      Append received telemetry lines to a log\n\
         \x20 --particles <N>       Particle count (default: 50)\n\
         \x20 --seed <N>            RNG seed for a deterministic run\n\
         \x20 --cell-size <CM>      Map cell size in centimeters (default: 5)\n\
         \x20 --map-interval <SECS> Seconds between map renders (default: 5)\n\
         \x20 -h, --help            Show this help"
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();
    let args = parse_args();

    let config = SlamConfig {
        grid: GridConfig {
            cell_size_cm: args.cell_size,
            ..GridConfig::default()
        },
        filter: FilterConfig {
            particle_count: args.particles,
            seed: args.seed,
            ..FilterConfig::default()
        },
        ..SlamConfig::default()
    };
    let mut pipeline = SlamPipeline::new(config).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });

    let mut link: Box<dyn TelemetryLink> = if let Some(port) = &args.port {
        let serial = SerialConfig {
            path: port.clone(),
            baud: args.baud,
            capture: args.capture.clone(),
        };
        Box::new(
            SerialLink::open(serial)
                .await
                .expect("Failed to open serial port"),
        )
    } else {
        let path = args.replay.as_deref().expect("replay path checked above");
        Box::new(ReplayLink::open(path).await.expect("Failed to open replay log"))
    };

    println!("=== sonar_slam console ===");
    println!(
        "Source: {}, particles: {}, cell size: {}cm",
        link.name(),
        args.particles,
        args.cell_size
    );
    println!("Teleop: z/s/q/d + Enter, x to stop. Ctrl+C to quit.\n");

    let mut parser = LineParser::new();
    let mut stdin_lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interval = tokio::time::interval(Duration::from_secs(args.map_interval.max(1)));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        // Command to forward, decided inside the select and sent after it so
        // the receive future is no longer borrowing the link.
        let mut outbound: Option<DriveCommand> = None;

        tokio::select! {
            _ = &mut ctrl_c => {
                println!("\nShutdown requested.");
                break;
            }
            line = link.recv_line() => {
                match line {
                    Ok(Some(line)) => match parser.parse_line(&line) {
                        Ok(Some(frame)) => pipeline.handle(&frame),
                        Ok(None) => {}
                        Err(e) => warn!("{e}"),
                    },
                    Ok(None) => {
                        println!("Telemetry stream ended.");
                        break;
                    }
                    Err(e) => {
                        eprintln!("Link error: {e}");
                        break;
                    }
                }
            }
            key = stdin_lines.next_line() => {
                let Ok(Some(key)) = key else { continue };
                match DriveCommand::from_key(key.trim()) {
                    Some(command) => outbound = Some(command),
                    None if key.trim().is_empty() => {}
                    None => println!("Unknown key {:?} (use z/s/q/d/x)", key.trim()),
                }
            }
            _ = interval.tick() => {
                print_status(&pipeline, &parser);
            }
        }

        if let Some(command) = outbound {
            println!("Sending to robot: {command:?}");
            if let Err(e) = link.send_command(command).await {
                eprintln!("Command failed: {e}");
            }
        }
    }

    print_status(&pipeline, &parser);
    println!("Done.");
}

fn print_status(pipeline: &SlamPipeline, parser: &LineParser) {
    let stats = pipeline.stats();
    let parse = parser.stats();
    println!("{}", pipeline.render_map());
    println!(
        "pose {} | {} sensor / {} motion frames, {} resamples | {} parse errors",
        pipeline.estimate(),
        stats.sensor_frames,
        stats.motion_frames,
        stats.resamples,
        parse.parse_errors
    );
}
