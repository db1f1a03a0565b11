//! slidewin - sliding-window frame transfer demo.
//!
//! Local: slidewin local [-n <participants>] [options]
//! UDP:   slidewin udp <rank> <addr0> <addr1> [addr...] [options]
//!
//! Options: --items <N> --frame <F> --strict --log-level <filter>
//!
//! In UDP mode every participant runs its own process with the same peer
//! table; rank 0 is the sender and prints the throughput report.

use slidewin::launch::{self, RankReport};
use slidewin::{SlidewinConfig, SlidewinError, UdpTransport};
use std::net::SocketAddr;
use std::process::ExitCode;

/// Participants when `-n` is not given (one sender, one receiver)
const DEFAULT_PARTICIPANTS: usize = 2;

#[derive(Debug, PartialEq)]
enum Mode {
    Local { participants: usize },
    Udp { rank: usize, peers: Vec<SocketAddr> },
}

#[derive(Debug, PartialEq)]
struct Cli {
    mode: Mode,
    config: SlidewinConfig,
    log_level: Option<String>,
}

fn usage() {
    eprintln!("slidewin - sliding-window frame transfer");
    eprintln!("========================================");
    eprintln!("Local: slidewin local [-n <participants>] [options]");
    eprintln!("UDP:   slidewin udp <rank> <addr0> <addr1> [addr...] [options]");
    eprintln!();
    eprintln!("Options: --items <N> (default 512)  --frame <F> (default 8)");
    eprintln!("         --strict (reject F not dividing N)  --log-level <filter>");
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: Option<&String>) -> Result<T, String> {
    let raw = value.ok_or_else(|| format!("{} needs a value", flag))?;
    raw.parse()
        .map_err(|_| format!("invalid value for {}: {}", flag, raw))
}

fn parse_args(args: &[String]) -> Result<Cli, String> {
    let mut config = SlidewinConfig::default();
    let mut log_level = None;
    let mut participants = DEFAULT_PARTICIPANTS;
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-n" => participants = parse_value("-n", iter.next())?,
            "--items" => config.items = parse_value("--items", iter.next())?,
            "--frame" => config.frame_len = parse_value("--frame", iter.next())?,
            "--strict" => config.strict = true,
            "--log-level" => log_level = Some(parse_value("--log-level", iter.next())?),
            flag if flag.starts_with('-') => return Err(format!("unknown option: {}", flag)),
            _ => positional.push(arg.as_str()),
        }
    }

    let mode = match positional.split_first() {
        Some((&"local", [])) => Mode::Local { participants },
        Some((&"udp", [rank, peers @ ..])) => {
            let rank = rank
                .parse()
                .map_err(|_| format!("invalid rank: {}", rank))?;
            let peers = peers
                .iter()
                .map(|p| p.parse().map_err(|_| format!("invalid peer address: {}", p)))
                .collect::<Result<Vec<SocketAddr>, String>>()?;
            Mode::Udp { rank, peers }
        }
        Some((mode, _)) => return Err(format!("unknown mode or extra arguments: {}", mode)),
        None => return Err("missing mode".to_string()),
    };

    Ok(Cli {
        mode,
        config,
        log_level,
    })
}

#[cfg(feature = "tracing")]
fn init_tracing(level: Option<&str>) {
    use tracing_subscriber::EnvFilter;

    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(not(feature = "tracing"))]
fn init_tracing(_level: Option<&str>) {}

fn print_rank(report: &RankReport) {
    if let Some(throughput) = &report.throughput {
        println!("{}", throughput);
    }
}

fn run(cli: Cli) -> Result<(), SlidewinError> {
    match cli.mode {
        Mode::Local { participants } => {
            let report = launch::run_local(&cli.config, participants)?;
            report.ranks.iter().for_each(print_rank);
        }
        Mode::Udp { rank, peers } => {
            let mut transport = UdpTransport::bind(rank, peers)?;
            let report = launch::run_rank(&cli.config, &mut transport)?;
            print_rank(&report);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(msg) => {
            eprintln!("error: {}", msg);
            eprintln!();
            usage();
            return ExitCode::FAILURE;
        }
    };

    init_tracing(cli.log_level.as_deref());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn local_defaults() {
        let cli = parse_args(&args("local")).unwrap();
        assert_eq!(cli.mode, Mode::Local { participants: 2 });
        assert_eq!(cli.config, SlidewinConfig::default());
        assert_eq!(cli.log_level, None);
    }

    #[test]
    fn local_with_options() {
        let cli = parse_args(&args("local -n 3 --items 10 --frame 4 --strict --log-level debug")).unwrap();
        assert_eq!(cli.mode, Mode::Local { participants: 3 });
        assert_eq!((cli.config.items, cli.config.frame_len), (10, 4));
        assert!(cli.config.strict);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn udp_peer_table() {
        let cli = parse_args(&args("udp 1 127.0.0.1:7000 127.0.0.1:7001")).unwrap();
        match cli.mode {
            Mode::Udp { rank, peers } => {
                assert_eq!(rank, 1);
                assert_eq!(peers.len(), 2);
                assert_eq!(peers[1].port(), 7001);
            }
            other => panic!("unexpected mode {:?}", other),
        }
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args(&args("")).is_err());
        assert!(parse_args(&args("local --frame")).is_err());
        assert!(parse_args(&args("local --frame x")).is_err());
        assert!(parse_args(&args("local --bogus")).is_err());
        assert!(parse_args(&args("udp one 127.0.0.1:7000")).is_err());
        assert!(parse_args(&args("udp 0 not-an-addr")).is_err());
        assert!(parse_args(&args("local extra")).is_err());
    }
}
