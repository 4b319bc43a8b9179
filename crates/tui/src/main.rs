mod app;
mod renderer;
mod synthetic;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use frame_timeline_core::TimelineConfig;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: frame-timeline [--config <timeline.json>] [--threads <n>] [--log <file>]";

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    threads: Option<usize>,
    log: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        let mut value = || args.next().with_context(|| format!("{arg} needs a value\n{USAGE}"));
        match arg.as_str() {
            "--config" => parsed.config = Some(PathBuf::from(value()?)),
            "--log" => parsed.log = Some(PathBuf::from(value()?)),
            "--threads" => {
                let n: usize = value()?.parse().context("--threads expects a number")?;
                if n == 0 {
                    bail!("--threads must be at least 1");
                }
                parsed.threads = Some(n);
            }
            "-h" | "--help" => {
                eprintln!("{USAGE}");
                std::process::exit(0);
            }
            other => bail!("unexpected argument '{other}'\n{USAGE}"),
        }
    }
    Ok(parsed)
}

/// The terminal owns stdout, so logs only go to a file when asked for.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    init_logging(args.log.as_deref())?;

    let config = match &args.config {
        Some(path) => TimelineConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => TimelineConfig::default(),
    };
    config.validate()?;

    app::run(config, args.threads.unwrap_or(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_all_flags() {
        let args = parse(&["--threads", "4", "--config", "view.json", "--log", "t.log"]).unwrap();
        assert_eq!(args.threads, Some(4));
        assert_eq!(args.config, Some(PathBuf::from("view.json")));
        assert_eq!(args.log, Some(PathBuf::from("t.log")));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse(&["--threads"]).is_err());
        assert!(parse(&["--threads", "none"]).is_err());
        assert!(parse(&["--threads", "0"]).is_err());
        assert!(parse(&["profile.json"]).is_err());
    }
}
