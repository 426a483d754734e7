// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Derive, validate and print the partition layout of a dual-world target.
//!
//! ```text
//! region-layout-gen --preset an519 --format header -o region_defs.h
//! region-layout-gen --config board.json --no-bootloader --format mpc
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::info;

use region_layout::{derive, output, ParameterSet, RegionMap};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Preset {
    /// MPS2 AN519 FPGA image
    An519,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Human readable region table
    Table,
    /// Linker script symbol assignments
    Linker,
    /// C header with #defines
    Header,
    /// The region map as JSON
    Json,
    /// (name, base, size) entries for protection controller setup
    Mpc,
    /// The effective parameter set as JSON, a starting point for --config
    Params,
}

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON parameter set to derive from
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Built-in parameter set, used when no --config is given
    #[arg(long, value_enum, default_value_t = Preset::An519)]
    preset: Preset,

    /// Build without BL2: no image header, no bootloader regions
    #[arg(long)]
    no_bootloader: bool,

    /// Link the image into the secondary slot
    #[arg(long)]
    link_to_secondary: bool,

    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log every derivation step
    #[arg(short, long)]
    verbose: bool,
}

fn load(args: &Args) -> anyhow::Result<ParameterSet> {
    let mut params = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            ParameterSet::from_json(&json)
                .with_context(|| format!("invalid parameter set in {}", path.display()))?
        }
        None => match args.preset {
            Preset::An519 => ParameterSet::an519(),
        },
    };

    if args.no_bootloader {
        params = params.with_bootloader(false);
    }
    if args.link_to_secondary {
        params = params.linked_to_secondary(true);
    }
    Ok(params)
}

fn render(format: Format, params: &ParameterSet, map: &RegionMap) -> anyhow::Result<String> {
    let text = match format {
        Format::Table => map.to_string(),
        Format::Linker => output::linker_script(&output::symbols(params, map)),
        Format::Header => output::c_header(&output::symbols(params, map), "__REGION_DEFS_H__"),
        Format::Json => output::json(map)? + "\n",
        Format::Mpc => serde_json::to_string_pretty(&map.mpc_config())? + "\n",
        Format::Params => params.to_json()? + "\n",
    };
    Ok(text)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        true => log::LevelFilter::Debug,
        false => log::LevelFilter::Info,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .init();

    let params = load(&args)?;
    let map = derive(&params).context("layout derivation failed")?;
    let text = render(args.format, &params, &map)?;

    match &args.output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
            info!("wrote {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}
