// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Error types for layout derivation and validation.
//!
//! Every variant names the region (or quantity) at fault together with the
//! numbers that violated the invariant, so the rendered message is enough to
//! fix the configuration.

use crate::region::RegionName;

/// Result type alias using the layout error.
pub type Result<T> = core::result::Result<T, LayoutError>;

/// Why a parameter set could not be turned into a valid region map.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// A derived size is zero or would be negative.
    #[error("{what} is invalid: {value} bytes")]
    InvalidSize { what: &'static str, value: i128 },

    /// Start or size is not a multiple of the granularity the region needs.
    #[error(
        "{region} is misaligned: start {start:#x}, size {size:#x}, \
         required granularity {granularity:#x}"
    )]
    MisalignedRegion {
        region: RegionName,
        start: u64,
        size: u64,
        granularity: u64,
    },

    /// Two regions backed by the same physical memory intersect.
    #[error(
        "{first} [{first_start:#x}..={first_limit:#x}] overlaps \
         {second} [{second_start:#x}..={second_limit:#x}]"
    )]
    OverlappingRegions {
        first: RegionName,
        first_start: u64,
        first_limit: u64,
        second: RegionName,
        second_start: u64,
        second_limit: u64,
    },

    /// A region leaves the extent that must contain it.
    #[error(
        "{region} [{start:#x}..={limit:#x}] is outside {extent} \
         [{extent_start:#x}..={extent_limit:#x}]"
    )]
    ContainmentViolation {
        region: RegionName,
        start: u64,
        limit: u64,
        extent: &'static str,
        extent_start: u64,
        extent_limit: u64,
    },

    /// Two regions that must follow each other in physical address order do
    /// not. Offsets are relative to the alias base of each region.
    #[error(
        "{before} (ends at offset {before_end:#x}) must precede \
         {after} (starts at offset {after_start:#x})"
    )]
    OrderingViolation {
        before: RegionName,
        before_end: u64,
        after: RegionName,
        after_start: u64,
    },

    /// The policy flags describe a configuration that cannot be built.
    #[error("inconsistent policy: {0}")]
    InconsistentPolicy(&'static str),

    /// An alias base plus an offset does not fit in the address space.
    #[error("{what}: base {base:#x} + offset {offset:#x} overflows")]
    AddressOverflow {
        what: &'static str,
        base: u64,
        offset: u64,
    },
}
