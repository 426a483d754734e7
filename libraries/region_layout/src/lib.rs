// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Partition layout planner for dual-world (secure / non-secure) targets.
//!
//! The target boots through an immutable first-stage loader and BL2, a
//! mutable second-stage bootloader with A/B image slots. From a small set of
//! hardware constants and build policy flags this crate derives the address
//! map every other component depends on: secure and non-secure code and data,
//! the secure gateway veneer region, the bootloader's own regions, and the
//! partition descriptors used to program the memory protection controller and
//! to stage firmware updates.
//!
//! ```
//! use region_layout::{derive, ParameterSet, RegionName};
//!
//! let params = ParameterSet::an519();
//! let map = derive(&params).unwrap();
//! let veneer = map.get(RegionName::Veneer).unwrap();
//! assert_eq!(veneer.start(), 0x100E_FC80);
//! ```
//!
//! [`derive`] either returns a map that passed every check in [`check`], or
//! the first violated invariant. It has no side effects other than `log`
//! records, so independent configurations may be derived concurrently.

pub mod check;
pub mod error;
pub mod linker;
pub mod output;
pub mod params;
pub mod planner;
pub mod region;

pub use error::{LayoutError, Result};
pub use params::ParameterSet;
pub use planner::derive;
pub use region::{Region, RegionKind, RegionMap, RegionName};
