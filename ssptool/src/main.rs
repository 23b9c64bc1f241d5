mod options;
mod prompt;

use anyhow::{anyhow, Error as AnyError};
use atlas::{AtlasConfig, AtlasRegistry, Source, SourceKind};
use clap::Parser;
use log::warn;
use options::{Cli, Command as CliCmd, Output};
use prompt::{retrieval_point, ArgsPrompt, Prompt};
use ssp::{Profile, ProfileList, TracedProfile};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};
use textplots::{Chart, Plot, Shape};

fn main() -> Result<(), AnyError> {
    let Cli {
        config,
        data_dir,
        cmd,
    } = Cli::parse();

    env_logger::init();

    let mut config = match config {
        Some(path) => AtlasConfig::from_file(path)?,
        None => AtlasConfig::default(),
    };
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }

    match cmd {
        CliCmd::Status => print_status(&AtlasRegistry::new(&config))?,
        CliCmd::Query {
            source,
            position,
            time,
        } => {
            let prompt = ArgsPrompt {
                location: position.map(|p| (p.0, p.1)),
                date: time,
                ..ArgsPrompt::default()
            };
            query(&AtlasRegistry::new(&config), source, &prompt)?;
        }
        CliCmd::Annotate { profiles } => annotate(&AtlasRegistry::new(&config), &profiles)?,
        CliCmd::Trace {
            profile,
            draft,
            tss,
            avg_depth,
            half_swath,
            angle_step,
            output,
        } => {
            let prompt = ArgsPrompt {
                tss,
                draft,
                ..ArgsPrompt::default()
            };
            let profile: Profile = read_json(&profile)?;
            let traced = trace(&profile, &prompt, avg_depth, half_swath, angle_step)?;
            match output {
                Output::Csv => print_csv(&traced)?,
                Output::Json => print_json(&traced)?,
                Output::Plot => plot_ascii(&traced),
            }
        }
    };
    Ok(())
}

fn print_status(registry: &AtlasRegistry) -> Result<(), AnyError> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "Source,Kind,Present,Enabled,Folder")?;
    for dataset in registry.datasets() {
        let kind = match dataset.source().kind() {
            SourceKind::Climatology => "climatology",
            SourceKind::Forecast => "forecast",
        };
        writeln!(
            stdout,
            "{},{kind},{},{},{}",
            dataset.name(),
            dataset.is_present(),
            registry.is_enabled(dataset.source()),
            dataset.folder().display()
        )?;
    }
    Ok(())
}

fn query(registry: &AtlasRegistry, source: Source, prompt: &dyn Prompt) -> Result<(), AnyError> {
    let (lat, lon, timestamp) = retrieval_point(prompt)?;
    let profile = registry.query(source, lat, lon, timestamp)?;
    let json = serde_json::to_string_pretty(&profile)?;
    println!("{json}");
    Ok(())
}

fn annotate(registry: &AtlasRegistry, path: &Path) -> Result<(), AnyError> {
    let profiles: Vec<Profile> = read_json(path)?;
    let mut list: ProfileList = profiles.into_iter().collect();
    for failure in registry.annotate(list.as_mut_slice()) {
        warn!(
            "profile {}: no {} profile, {}",
            failure.index, failure.source, failure.err
        );
        eprintln!("profile {}: {}: {}", failure.index, failure.source, failure.err);
    }
    let json = serde_json::to_string_pretty(list.as_slice())?;
    println!("{json}");
    Ok(())
}

fn trace(
    profile: &Profile,
    prompt: &dyn Prompt,
    avg_depth: f64,
    half_swath: f64,
    angle_step: f64,
) -> Result<TracedProfile, AnyError> {
    let draft = prompt
        .ask_draft()
        .ok_or_else(|| anyhow!("transducer draft is required"))?;
    let tss = match prompt.ask_tss() {
        Some(tss) => tss,
        None => speed_at(profile, draft)
            .ok_or_else(|| anyhow!("profile does not cover the transducer depth {draft} m"))?,
    };
    Ok(TracedProfile::builder()
        .tss_depth(draft)
        .tss_value(tss)
        .avg_depth(avg_depth)
        .half_swath(half_swath)
        .angle_step(angle_step)
        .build(profile)?)
}

/// Linearly interpolated sound speed at `depth` over the profile's
/// valid samples.
fn speed_at(profile: &Profile, depth: f64) -> Option<f64> {
    let samples = profile.effective();
    let hi = samples.depth.partition_point(|&d| d < depth);
    match (hi.checked_sub(1), samples.depth.get(hi)) {
        (_, Some(&d)) if (d - depth).abs() < f64::EPSILON => Some(samples.speed[hi]),
        (Some(lo), Some(&d_hi)) => {
            let frac = (depth - samples.depth[lo]) / (d_hi - samples.depth[lo]);
            Some(samples.speed[lo] + frac * (samples.speed[hi] - samples.speed[lo]))
        }
        _ => None,
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AnyError> {
    let rdr = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(rdr)?)
}

/// # Example with gnuplot
///
/// ```sh
/// ssptool trace profile.json --draft=5 --avg-depth=100 csv | tr ',' ' ' > ~/.tmp/rays && gnuplot -p -e "plot '~/.tmp/rays' using 2:(-\$3) with linespoints"
/// ```
fn print_csv(traced: &TracedProfile) -> Result<(), AnyError> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "Angle,Range,Depth,Time,Complete")?;
    for ray in traced.iter() {
        writeln!(
            stdout,
            "{},{},{},{},{}",
            ray.angle, ray.range, ray.depth, ray.time, ray.complete
        )?;
    }
    Ok(())
}

fn print_json(traced: &TracedProfile) -> Result<(), AnyError> {
    let json = serde_json::to_string(traced.rays())?;
    println!("{json}");
    Ok(())
}

/// Plots where each ray ends up, range across, depth down.
#[allow(clippy::cast_possible_truncation)]
fn plot_ascii(traced: &TracedProfile) {
    let plot_data: Vec<(f32, f32)> = traced
        .iter()
        .map(|ray| (ray.range as f32, -ray.depth as f32))
        .collect();
    let (min, max) = plot_data
        .iter()
        .fold((0.0_f32, 0.0_f32), |(min, max), (x, _)| (min.min(*x), max.max(*x)));
    Chart::new(300, 150, min, max)
        .lineplot(&Shape::Points(&plot_data))
        .display();
}
