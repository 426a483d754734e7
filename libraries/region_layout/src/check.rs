// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Invariant checker for a derived region map.
//!
//! The checks only look at the finished map, the parameter set and the
//! recorded [`LayoutFacts`](crate::region::LayoutFacts); they do not reuse the
//! planner's arithmetic. Checks run in a fixed order and the first violation
//! is returned:
//!
//! 1. every region other than the veneer gate has a non-zero size,
//! 2. start and size are multiples of the granularity the region kind needs,
//! 3. every region lies inside its backing memory and its image window,
//! 4. no two regions share physical bytes unless they are allowed to,
//! 5. regions that must follow each other do.
//!
//! Overlap is tested on physical offsets, so two regions seen through
//! different aliases of the same flash still collide.

use log::{trace, warn};

use crate::error::{LayoutError, Result};
use crate::params::ParameterSet;
use crate::region::{Memory, Region, RegionKind, RegionMap, RegionName};

/// Validate `map` against the invariants of `params`.
pub fn validate(params: &ParameterSet, map: &RegionMap) -> Result<()> {
    if params.mpc_granularity == 0 {
        warn!("MPC granularity is zero, protection controller alignment not checked");
    }

    for region in map.iter() {
        trace!("checking {}", region);
        check_size(region)?;
        check_alignment(params, region)?;
        check_containment(params, map, region)?;
    }
    check_overlap(params, map)?;
    check_ordering(params, map)
}

fn check_size(region: &Region) -> Result<()> {
    if region.size() == 0 && region.kind() != RegionKind::VeneerGate {
        return Err(LayoutError::InvalidSize {
            what: region.name().symbol(),
            value: 0,
        });
    }
    Ok(())
}

/// Granularity a region kind must honour, zero when unconstrained.
fn granularity(params: &ParameterSet, kind: RegionKind) -> u64 {
    if kind.is_mpc_target() {
        params.mpc_granularity
    } else if kind.is_sau_target() {
        params.sau_granularity
    } else if params.policy.preboot_mpc {
        params.mpc_granularity
    } else {
        0
    }
}

fn check_alignment(params: &ParameterSet, region: &Region) -> Result<()> {
    let granularity = granularity(params, region.kind());
    if granularity == 0 || region.size() == 0 {
        return Ok(());
    }
    if region.start() % granularity != 0 || region.size() % granularity != 0 {
        return Err(LayoutError::MisalignedRegion {
            region: region.name(),
            start: region.start(),
            size: region.size(),
            granularity,
        });
    }
    Ok(())
}

/// An absolute address window `[start, end)`.
struct Extent {
    name: &'static str,
    start: u64,
    end: u64,
}

impl Extent {
    /// `[base + from, base + to)`. A window whose end falls before its start
    /// is empty and contains nothing.
    fn new(name: &'static str, base: u64, from: u64, to: Option<u64>) -> Result<Extent> {
        let start = base
            .checked_add(from)
            .ok_or(LayoutError::AddressOverflow {
                what: name,
                base,
                offset: from,
            })?;
        let end = match to {
            Some(to) if to > from => base
                .checked_add(to)
                .ok_or(LayoutError::AddressOverflow {
                    what: name,
                    base,
                    offset: to,
                })?,
            _ => start,
        };
        Ok(Extent { name, start, end })
    }

    fn check(&self, region: &Region) -> Result<()> {
        if region.start() < self.start || region.end() > self.end {
            return Err(LayoutError::ContainmentViolation {
                region: region.name(),
                start: region.start(),
                limit: region.limit().unwrap_or(region.start()),
                extent: self.name,
                extent_start: self.start,
                extent_limit: self.end.saturating_sub(1),
            });
        }
        Ok(())
    }
}

fn check_containment(params: &ParameterSet, map: &RegionMap, region: &Region) -> Result<()> {
    if region.size() == 0 {
        return Ok(());
    }

    let base = params.aliases.base(region.alias());
    let backing = match region.alias().memory() {
        Memory::Flash => Extent::new("flash", base, 0, Some(params.total_rom_size))?,
        Memory::Ram => Extent::new("RAM", base, 0, Some(params.total_ram_size))?,
    };
    backing.check(region)?;

    // Code and veneers sit between the image header and the trailer of
    // their partition, which also keeps them ahead of the trailer.
    let facts = map.facts();
    match region.name() {
        RegionName::SecureCode | RegionName::Veneer => Extent::new(
            "secure image area",
            base,
            facts.s_area_offset,
            facts
                .s_partition_offset
                .checked_add(params.flash_s_partition_size)
                .and_then(|end| end.checked_sub(facts.trailer_size)),
        )?
        .check(region),
        RegionName::NonSecureCode => Extent::new(
            "non-secure image area",
            base,
            facts.ns_area_offset,
            facts
                .ns_partition_offset
                .checked_add(params.flash_ns_partition_size)
                .and_then(|end| end.checked_sub(facts.trailer_size)),
        )?
        .check(region),
        RegionName::NonSecurePartition if params.policy.has_bootloader => {
            let areas = &params.flash_areas;
            let slot = match params.policy.link_to_secondary {
                false => areas.image_primary,
                true => areas.image_secondary,
            };
            Extent::new(
                "active image slot",
                base,
                slot.offset,
                slot.offset.checked_add(slot.size),
            )?
            .check(region)
        }
        _ => Ok(()),
    }
}

/// Offset of the first byte of `region` inside its physical memory.
fn physical_start(params: &ParameterSet, region: &Region) -> u64 {
    // Containment ran first, so the region starts at or above its alias base.
    region.start() - params.aliases.base(region.alias())
}

/// Whether two regions may legitimately share physical bytes.
fn overlap_permitted(a: &Region, b: &Region) -> bool {
    let memory = a.alias().memory();
    if memory != b.alias().memory() {
        return true;
    }
    // BL2 hands all of RAM over to the runtime.
    if memory == Memory::Ram && a.kind().phase() != b.kind().phase() {
        return true;
    }
    match (a.kind().is_descriptor(), b.kind().is_descriptor()) {
        (true, false) => encloses(a, b),
        (false, true) => encloses(b, a),
        _ => false,
    }
}

/// A partition descriptor may cover code of its own world.
fn encloses(descriptor: &Region, region: &Region) -> bool {
    descriptor.alias() == region.alias()
        && descriptor.start() <= region.start()
        && region.end() <= descriptor.end()
}

fn check_overlap(params: &ParameterSet, map: &RegionMap) -> Result<()> {
    let regions: Vec<&Region> = map.iter().filter(|region| region.size() > 0).collect();

    for (i, a) in regions.iter().enumerate() {
        for b in regions.iter().skip(i + 1) {
            if overlap_permitted(a, b) {
                continue;
            }
            let a_start = physical_start(params, a);
            let b_start = physical_start(params, b);
            if a_start < b_start + b.size() && b_start < a_start + a.size() {
                return Err(LayoutError::OverlappingRegions {
                    first: a.name(),
                    first_start: a.start(),
                    first_limit: a.limit().unwrap_or(a.start()),
                    second: b.name(),
                    second_start: b.start(),
                    second_limit: b.limit().unwrap_or(b.start()),
                });
            }
            trace!("{} and {} are disjoint", a.name(), b.name());
        }
    }
    Ok(())
}

fn check_ordering(params: &ParameterSet, map: &RegionMap) -> Result<()> {
    let precedes = |before: RegionName, after: RegionName| -> Result<()> {
        let (Some(first), Some(second)) = (map.get(before), map.get(after)) else {
            return Ok(());
        };
        let before_end = physical_start(params, first) + first.size();
        let after_start = physical_start(params, second);
        if before_end > after_start {
            return Err(LayoutError::OrderingViolation {
                before,
                before_end,
                after,
                after_start,
            });
        }
        Ok(())
    };

    precedes(RegionName::SecureCode, RegionName::Veneer)?;
    precedes(RegionName::SecureCode, RegionName::NonSecureCode)?;
    precedes(RegionName::SecureData, RegionName::NonSecureData)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::derive;

    fn an519_map() -> (ParameterSet, RegionMap) {
        let params = ParameterSet::an519();
        let map = derive(&params).unwrap();
        (params, map)
    }

    /// Rebuild `map` with `name` replaced by a region at `start` of `size`.
    fn replace(map: &RegionMap, name: RegionName, start: u64, size: u64) -> RegionMap {
        let regions = map
            .iter()
            .map(|region| match region.name() == name {
                true => Region::new(name, region.alias(), start, size).unwrap(),
                false => *region,
            })
            .collect();
        RegionMap::new(regions, *map.facts())
    }

    #[test]
    fn an519_is_valid() {
        let (params, map) = an519_map();
        assert_eq!(validate(&params, &map), Ok(()));
    }

    #[test]
    fn empty_data_region_is_rejected() {
        let (params, map) = an519_map();
        let map = replace(&map, RegionName::NonSecureData, 0x2810_0000, 0);
        assert_eq!(
            validate(&params, &map),
            Err(LayoutError::InvalidSize {
                what: "NS_DATA",
                value: 0
            })
        );
    }

    #[test]
    fn partition_must_be_mpc_aligned() {
        let mut params = ParameterSet::an519();
        params.flash_ns_partition_size = 0x7_0000;
        assert_eq!(
            derive(&params),
            Err(LayoutError::MisalignedRegion {
                region: RegionName::NonSecurePartition,
                start: 0x10_0000,
                size: 0x7_0000,
                granularity: 0x2_0000,
            })
        );
    }

    #[test]
    fn code_must_be_sau_aligned() {
        let mut params = ParameterSet::an519();
        params.veneer_region_size = 0x390;
        assert!(matches!(
            derive(&params),
            Err(LayoutError::MisalignedRegion {
                region: RegionName::SecureCode,
                granularity: 32,
                ..
            })
        ));
    }

    #[test]
    fn zero_granularity_disables_alignment() {
        let mut params = ParameterSet::an519();
        params.flash_ns_partition_size = 0x7_0000;
        params.mpc_granularity = 0;
        // The partition still has to fit the primary slot, which it does.
        assert!(derive(&params).is_ok());
    }

    #[test]
    fn bootloader_alignment_follows_preboot_policy() {
        let mut params = ParameterSet::an519();
        params.flash_areas.bl2.size = 0x7_0000;
        assert!(derive(&params).is_ok());

        params.policy.preboot_mpc = true;
        assert!(matches!(
            derive(&params),
            Err(LayoutError::MisalignedRegion {
                region: RegionName::BootloaderCode,
                ..
            })
        ));
    }

    #[test]
    fn secondary_slot_must_fit_flash() {
        let mut params = ParameterSet::an519();
        params.total_rom_size = 0x20_0000;
        assert_eq!(
            derive(&params),
            Err(LayoutError::ContainmentViolation {
                region: RegionName::SecondaryPartition,
                start: 0x18_0000,
                limit: 0x27_FFFF,
                extent: "flash",
                extent_start: 0,
                extent_limit: 0x1F_FFFF,
            })
        );
    }

    #[test]
    fn partitions_must_fit_active_slot() {
        let mut params = ParameterSet::an519();
        params.flash_areas.image_primary.size = 0xC_0000;
        assert!(matches!(
            derive(&params),
            Err(LayoutError::ContainmentViolation {
                region: RegionName::NonSecurePartition,
                extent: "active image slot",
                ..
            })
        ));
    }

    #[test]
    fn code_must_stay_out_of_trailer() {
        let (params, map) = an519_map();
        let veneer = *map.get(RegionName::Veneer).unwrap();
        // Grow the veneers into the trailer.
        let map = replace(&map, RegionName::Veneer, veneer.start(), veneer.size() + 0x80);
        assert!(matches!(
            validate(&params, &map),
            Err(LayoutError::ContainmentViolation {
                region: RegionName::Veneer,
                extent: "secure image area",
                ..
            })
        ));
    }

    #[test]
    fn secondary_slot_may_not_cover_active_code() {
        let mut params = ParameterSet::an519();
        params.flash_areas.image_secondary.offset = 0xC_0000;
        assert_eq!(
            derive(&params),
            Err(LayoutError::OverlappingRegions {
                first: RegionName::SecureCode,
                first_start: 0x1008_0400,
                first_limit: 0x100E_FC7F,
                second: RegionName::SecondaryPartition,
                second_start: 0x000C_0000,
                second_limit: 0x001B_FFFF,
            })
        );
    }

    #[test]
    fn bootloader_code_may_not_reach_image() {
        let mut params = ParameterSet::an519();
        params.flash_areas.bl2.size = 0x9_0000;
        assert!(matches!(
            derive(&params),
            Err(LayoutError::OverlappingRegions {
                first: RegionName::SecureCode,
                second: RegionName::BootloaderCode,
                ..
            })
        ));
    }

    #[test]
    fn bootloader_data_may_reuse_runtime_ram() {
        let (params, map) = an519_map();
        let bl2_data = map.get(RegionName::BootloaderData).unwrap();
        let s_data = map.get(RegionName::SecureData).unwrap();
        assert_eq!(bl2_data.start(), s_data.start());
        assert!(overlap_permitted(bl2_data, s_data));
        assert_eq!(validate(&params, &map), Ok(()));
    }

    #[test]
    fn descriptor_only_encloses_its_own_world() {
        let (_, map) = an519_map();
        let ns_partition = map.get(RegionName::NonSecurePartition).unwrap();
        let ns_code = map.get(RegionName::NonSecureCode).unwrap();
        let s_code = map.get(RegionName::SecureCode).unwrap();
        assert!(encloses(ns_partition, ns_code));
        assert!(!encloses(ns_partition, s_code));
        assert!(!overlap_permitted(
            map.get(RegionName::SecondaryPartition).unwrap(),
            ns_code
        ));
    }

    #[test]
    fn veneer_must_follow_code() {
        let (params, map) = an519_map();
        let s_code = *map.get(RegionName::SecureCode).unwrap();
        let veneer = *map.get(RegionName::Veneer).unwrap();
        let map = replace(&map, RegionName::Veneer, s_code.start(), veneer.size());
        let map = replace(
            &map,
            RegionName::SecureCode,
            s_code.start() + veneer.size(),
            s_code.size(),
        );
        assert_eq!(
            validate(&params, &map),
            Err(LayoutError::OrderingViolation {
                before: RegionName::SecureCode,
                before_end: 0xF_0000,
                after: RegionName::Veneer,
                after_start: 0x8_0400,
            })
        );
    }

    #[test]
    fn secure_data_comes_first() {
        let (params, map) = an519_map();
        let map = replace(&map, RegionName::SecureData, 0x3810_0000, 0x10_0000);
        let map = replace(&map, RegionName::NonSecureData, 0x2800_0000, 0x10_0000);
        assert_eq!(
            validate(&params, &map),
            Err(LayoutError::OrderingViolation {
                before: RegionName::SecureData,
                before_end: 0x20_0000,
                after: RegionName::NonSecureData,
                after_start: 0,
            })
        );
    }
}
