// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Helpers for firmware build scripts that link against a derived layout.
//!
//! A board's `build.rs` derives its map, writes the fragment into `OUT_DIR`
//! and ends its own linker script with:
//!
//! ```text
//! INCLUDE region_defs.ld
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::output;
use crate::params::ParameterSet;
use crate::region::RegionMap;

/// File name of the generated linker fragment.
pub const LINKER_FRAGMENT: &str = "region_defs.ld";

/// Write the linker fragment for `map` into `out_dir` and add `out_dir` to
/// the linker search path.
pub fn write_linker_fragment(
    params: &ParameterSet,
    map: &RegionMap,
    out_dir: &Path,
) -> io::Result<PathBuf> {
    let path = out_dir.join(LINKER_FRAGMENT);
    let symbols = output::symbols(params, map);
    fs::write(&path, output::linker_script(&symbols))?;
    debug!("wrote {} symbols to {}", symbols.len(), path.display());

    // The fragment is rewritten on every run, so it is not tracked.
    println!("{}", link_search_directive(out_dir));
    Ok(path)
}

/// Rebuild when the parameter file a layout was derived from changes.
pub fn track_parameters<P: AsRef<Path>>(path: P) {
    println!("{}", rerun_directive(path.as_ref()));
}

fn link_search_directive(dir: &Path) -> String {
    format!("cargo:rustc-link-arg=-L{}", dir.display())
}

fn rerun_directive(path: &Path) -> String {
    format!("cargo:rerun-if-changed={}", path.display())
}
