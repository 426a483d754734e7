// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Renderers for a derived region map.
//!
//! The contract with downstream tooling is the set of named values returned
//! by [`symbols`]; the linker fragment and the C header are two spellings of
//! the same list.

use core::fmt::Write;

use serde::Serialize;

use crate::params::ParameterSet;
use crate::region::RegionMap;

/// A named numeric constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub name: String,
    pub value: u64,
}

impl Symbol {
    fn new(name: impl Into<String>, value: u64) -> Symbol {
        Symbol {
            name: name.into(),
            value,
        }
    }
}

/// Every constant a linker script or firmware build needs, in a stable
/// order: runtime sizing, derivation facts, then `_START`/`_SIZE`/`_LIMIT`
/// for each region. Empty regions get no `_LIMIT`.
pub fn symbols(params: &ParameterSet, map: &RegionMap) -> Vec<Symbol> {
    let sizing = &params.sizing;
    let facts = map.facts();

    let mut symbols = vec![
        Symbol::new("BL2_HEAP_SIZE", sizing.bl2_heap_size),
        Symbol::new("BL2_MSP_STACK_SIZE", sizing.bl2_msp_stack_size),
        Symbol::new("S_HEAP_SIZE", sizing.s_heap_size),
        Symbol::new("S_MSP_STACK_SIZE_INIT", sizing.s_msp_stack_size_init),
        Symbol::new("S_MSP_STACK_SIZE", sizing.s_msp_stack_size),
        Symbol::new("S_PSP_STACK_SIZE", sizing.s_psp_stack_size),
        Symbol::new("NS_HEAP_SIZE", sizing.ns_heap_size),
        Symbol::new("NS_MSP_STACK_SIZE", sizing.ns_msp_stack_size),
        Symbol::new("NS_PSP_STACK_SIZE", sizing.ns_psp_stack_size),
        Symbol::new(
            "PSA_INITIAL_ATTEST_TOKEN_MAX_SIZE",
            sizing.attest_token_max_size,
        ),
        Symbol::new("S_IMAGE_PRIMARY_PARTITION_OFFSET", facts.s_partition_offset),
        Symbol::new(
            "S_IMAGE_SECONDARY_PARTITION_OFFSET",
            facts.s_secondary_partition_offset,
        ),
        Symbol::new("NS_IMAGE_PRIMARY_PARTITION_OFFSET", facts.ns_partition_offset),
        Symbol::new("BL2_HEADER_SIZE", facts.header_size),
        Symbol::new("BL2_TRAILER_SIZE", facts.trailer_size),
        Symbol::new("IMAGE_S_CODE_SIZE", facts.image_s_code_size),
        Symbol::new("IMAGE_NS_CODE_SIZE", facts.image_ns_code_size),
        Symbol::new("S_IMAGE_PRIMARY_AREA_OFFSET", facts.s_area_offset),
        Symbol::new("NS_IMAGE_PRIMARY_AREA_OFFSET", facts.ns_area_offset),
    ];

    for region in map.iter() {
        let prefix = region.name().symbol();
        symbols.push(Symbol::new(format!("{prefix}_START"), region.start()));
        symbols.push(Symbol::new(format!("{prefix}_SIZE"), region.size()));
        if let Some(limit) = region.limit() {
            symbols.push(Symbol::new(format!("{prefix}_LIMIT"), limit));
        }
    }
    symbols
}

/// Symbol assignments for a fragment pulled in with `INCLUDE region_defs.ld`.
pub fn linker_script(symbols: &[Symbol]) -> String {
    let mut out = String::from("/* Generated by region_layout. Do not edit. */\n\n");
    for symbol in symbols {
        let _ = writeln!(out, "{} = {:#010x};", symbol.name, symbol.value);
    }
    out
}

/// `#define`s inside an include guard.
pub fn c_header(symbols: &[Symbol], guard: &str) -> String {
    let mut out = String::from("/* Generated by region_layout. Do not edit. */\n\n");
    let _ = writeln!(out, "#ifndef {guard}\n#define {guard}\n");
    for symbol in symbols {
        let _ = writeln!(out, "#define {:<40} ({:#010x})", symbol.name, symbol.value);
    }
    let _ = writeln!(out, "\n#endif /* {guard} */");
    out
}

/// The map as pretty-printed JSON.
pub fn json(map: &RegionMap) -> serde_json::Result<String> {
    serde_json::to_string_pretty(map)
}
