//! Kiblat - terminal qibla compass

mod surface;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use kiblat_compass::{
    CompassConfig, CompassSession, Coordinates, EventOrientation, FixedPosition, Locale,
    distance_km, initial_bearing,
};
use smol::future::FutureExt;
use tracing_subscriber::EnvFilter;

use crate::surface::TextSurface;

const USAGE: &str =
    "usage: kiblat <latitude> <longitude> [--seconds N] [--config FILE] [--english]";

/// Command line arguments
#[derive(Debug)]
struct Args {
    latitude: f64,
    longitude: f64,
    seconds: u64,
    config: Option<PathBuf>,
    english: bool,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> anyhow::Result<Self> {
        let mut positional = Vec::new();
        let mut seconds = 3;
        let mut config = None;
        let mut english = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--seconds" => {
                    let value = args.next().context("--seconds needs a value")?;
                    seconds = value.parse().with_context(|| format!("bad --seconds {value}"))?;
                }
                "--config" => {
                    config = Some(PathBuf::from(args.next().context("--config needs a path")?));
                }
                "--english" => english = true,
                "-h" | "--help" => bail!(USAGE),
                _ => positional.push(arg),
            }
        }

        let [latitude, longitude] = positional.as_slice() else {
            bail!(USAGE);
        };
        Ok(Self {
            latitude: latitude
                .parse()
                .with_context(|| format!("bad latitude {latitude}"))?,
            longitude: longitude
                .parse()
                .with_context(|| format!("bad longitude {longitude}"))?,
            seconds,
            config,
            english,
        })
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<CompassConfig> {
    let Some(path) = path else {
        return Ok(CompassConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(CompassConfig::from_json_str(&json)?)
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse(std::env::args().skip(1))?;
    let mut config = load_config(args.config.as_ref())?;
    if args.english {
        config.locale = Locale::English;
    }
    // A terminal host has no orientation sensor.
    config.demo_fallback = true;

    let observer = Coordinates::validated(args.latitude, args.longitude)?;
    let locale = config.locale;
    println!("{}", locale.location_line(observer));
    println!("{}", locale.bearing_line(initial_bearing(observer, config.target)));
    println!("{}", locale.distance_line(distance_km(observer, config.target)));

    let positions = FixedPosition::new(observer);
    let sensor = EventOrientation::unsupported();
    let mut session = CompassSession::new(config)?;
    let mut surface = TextSurface::new(locale);

    tracing::info!("Running compass for {}s", args.seconds);
    smol::block_on(async {
        let deadline = async {
            smol::Timer::after(Duration::from_secs(args.seconds)).await;
        };
        session.run(&positions, &sensor, &mut surface).or(deadline).await;
    });
    session.teardown();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<Args> {
        Args::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_positional() {
        let args = parse(&["-6.2", "106.8"]).unwrap();
        assert_eq!(args.latitude, -6.2);
        assert_eq!(args.longitude, 106.8);
        assert_eq!(args.seconds, 3);
        assert!(!args.english);
    }

    #[test]
    fn test_parse_flags() {
        let args = parse(&["--english", "1", "2", "--seconds", "10", "--config", "c.json"]).unwrap();
        assert!(args.english);
        assert_eq!(args.seconds, 10);
        assert_eq!(args.config, Some(PathBuf::from("c.json")));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(&["1"]).is_err());
        assert!(parse(&["north", "2"]).is_err());
        assert!(parse(&["1", "2", "--seconds"]).is_err());
    }
}
