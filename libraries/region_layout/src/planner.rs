// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Layout planner: turns a [`ParameterSet`] into a validated [`RegionMap`].
//!
//! Boot partition structure when BL2 is used:
//!
//! ```text
//! slot + 0x0_0000   BL2 image header
//! slot + 0x0_0400   secure code
//!                   secure gateway veneers
//!                   BL2 trailer
//! slot + s_size     non-secure image (same header/trailer reservation)
//! ```
//!
//! Each step below is a small function depending only on the parameters and
//! earlier steps. The finished map is handed to [`check::validate`] before it
//! is returned; no partially derived map ever escapes.

use log::{debug, info, warn};

use crate::check;
use crate::error::{LayoutError, Result};
use crate::params::{BootPolicy, ParameterSet};
use crate::region::{Alias, LayoutFacts, Region, RegionMap, RegionName};

/// Physical offsets of the image slots after applying the link policy.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Partitions {
    /// Slot the secure image is linked into.
    pub s_primary: u64,
    /// The other slot, used for upgrade images.
    pub s_secondary: u64,
    /// Non-secure image, directly after the secure partition.
    pub ns_primary: u64,
}

/// Space BL2 reserves around each image.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub header: u64,
    pub trailer: u64,
}

fn check_policy(policy: &BootPolicy) -> Result<()> {
    if policy.link_to_secondary && !policy.has_bootloader {
        return Err(LayoutError::InconsistentPolicy(
            "linking to the secondary slot requires a bootloader to swap images",
        ));
    }
    Ok(())
}

/// Picks the active slot. Without BL2 there is no slot indirection and the
/// secure image sits at the start of flash.
pub fn resolve_partitions(params: &ParameterSet) -> Result<Partitions> {
    let areas = &params.flash_areas;
    let (active, inactive) = match params.policy.link_to_secondary {
        false => (areas.image_primary.offset, areas.image_secondary.offset),
        true => (areas.image_secondary.offset, areas.image_primary.offset),
    };
    let s_primary = match params.policy.has_bootloader {
        true => active,
        false => 0,
    };

    Ok(Partitions {
        s_primary,
        s_secondary: inactive,
        ns_primary: offset(
            "NS_IMAGE_PRIMARY_PARTITION_OFFSET",
            s_primary,
            params.flash_s_partition_size,
        )?,
    })
}

/// Without BL2 there is no header, but the trailer absorbs it so the code
/// size of an image does not depend on whether a bootloader is present.
pub fn envelope(policy: &BootPolicy) -> Result<Envelope> {
    let envelope = match policy.has_bootloader {
        true => Envelope {
            header: policy.bl2_header_size,
            trailer: policy.bl2_trailer_size,
        },
        false => Envelope {
            header: 0,
            trailer: offset(
                "BL2_TRAILER_SIZE",
                policy.bl2_header_size,
                policy.bl2_trailer_size,
            )?,
        },
    };
    Ok(envelope)
}

impl Envelope {
    fn total(&self) -> Result<u64> {
        offset("image header and trailer", self.header, self.trailer)
    }
}

/// `minuend - subtrahend`, which must stay strictly positive.
fn remaining(what: &'static str, minuend: u64, subtrahend: u64) -> Result<u64> {
    match minuend.checked_sub(subtrahend) {
        Some(value) if value > 0 => Ok(value),
        _ => Err(LayoutError::InvalidSize {
            what,
            value: i128::from(minuend) - i128::from(subtrahend),
        }),
    }
}

/// Space left for the binary once BL2's header and trailer are reserved.
pub fn image_code_size(what: &'static str, partition_size: u64, envelope: Envelope) -> Result<u64> {
    remaining(what, partition_size, envelope.total()?)
}

fn offset(what: &'static str, base: u64, offset: u64) -> Result<u64> {
    base.checked_add(offset)
        .ok_or(LayoutError::AddressOverflow { what, base, offset })
}

/// Each world gets exactly half of RAM.
pub fn half_ram(total_ram_size: u64) -> Result<u64> {
    if total_ram_size == 0 || total_ram_size % 2 != 0 {
        return Err(LayoutError::InvalidSize {
            what: "total RAM size (must split into two equal halves)",
            value: i128::from(total_ram_size),
        });
    }
    Ok(total_ram_size / 2)
}

/// Derive the full region map and validate it.
pub fn derive(params: &ParameterSet) -> Result<RegionMap> {
    check_policy(&params.policy)?;

    let partitions = resolve_partitions(params)?;
    let envelope = envelope(&params.policy)?;
    debug!(
        "partitions: secure {:#x}, non-secure {:#x}, secondary {:#x}; header {:#x}, trailer {:#x}",
        partitions.s_primary,
        partitions.ns_primary,
        partitions.s_secondary,
        envelope.header,
        envelope.trailer
    );

    let image_s_code_size =
        image_code_size("secure image code size", params.flash_s_partition_size, envelope)?;
    let image_ns_code_size = image_code_size(
        "non-secure image code size",
        params.flash_ns_partition_size,
        envelope,
    )?;

    let s_area_offset = offset(
        "S_IMAGE_PRIMARY_AREA_OFFSET",
        partitions.s_primary,
        envelope.header,
    )?;
    let ns_area_offset = offset(
        "NS_IMAGE_PRIMARY_AREA_OFFSET",
        partitions.ns_primary,
        envelope.header,
    )?;

    let aliases = &params.aliases;
    if params.veneer_region_size == 0 {
        warn!("no secure gateway veneer region reserved");
    }

    // Secure code, with the veneers carved off its tail.
    let s_code_start = offset("S_CODE_START", aliases.rom_secure, s_area_offset)?;
    let s_code_size = remaining(
        "secure code size after veneer reservation",
        image_s_code_size,
        params.veneer_region_size,
    )?;
    let s_code = Region::new(RegionName::SecureCode, Alias::SecureRom, s_code_start, s_code_size)?;
    let veneer = Region::new(
        RegionName::Veneer,
        Alias::SecureRom,
        s_code.end(),
        params.veneer_region_size,
    )?;
    debug!("secure code: {}", s_code);
    debug!("veneers:     {}", veneer);

    let ns_code = Region::new(
        RegionName::NonSecureCode,
        Alias::NonSecureRom,
        offset("NS_CODE_START", aliases.rom_nonsecure, ns_area_offset)?,
        image_ns_code_size,
    )?;
    debug!("non-secure code: {}", ns_code);

    let data_size = half_ram(params.total_ram_size)?;
    let s_data = Region::new(
        RegionName::SecureData,
        Alias::SecureRam,
        offset("S_DATA_START", aliases.ram_secure, 0)?,
        data_size,
    )?;
    let ns_data = Region::new(
        RegionName::NonSecureData,
        Alias::NonSecureRam,
        offset("NS_DATA_START", aliases.ram_nonsecure, data_size)?,
        data_size,
    )?;

    // Partition descriptors for the protection controller and upgrade
    // tooling, both seen through the non-secure alias.
    let ns_partition = Region::new(
        RegionName::NonSecurePartition,
        Alias::NonSecureRom,
        offset(
            "NS_PARTITION_START",
            aliases.rom_nonsecure,
            partitions.ns_primary,
        )?,
        params.flash_ns_partition_size,
    )?;
    let secondary_partition = Region::new(
        RegionName::SecondaryPartition,
        Alias::NonSecureRom,
        offset(
            "SECONDARY_PARTITION_START",
            aliases.rom_nonsecure,
            partitions.s_secondary,
        )?,
        params.flash_areas.image_secondary.size,
    )?;

    let mut regions = vec![
        s_code,
        veneer,
        s_data,
        ns_code,
        ns_data,
        ns_partition,
        secondary_partition,
    ];

    if params.policy.has_bootloader {
        let bl2 = &params.flash_areas.bl2;
        regions.push(Region::new(
            RegionName::BootloaderCode,
            Alias::SecureRom,
            offset("BL2_CODE_START", aliases.rom_secure, bl2.offset)?,
            bl2.size,
        )?);
        // BL2 is the only occupant of RAM before the world split.
        regions.push(Region::new(
            RegionName::BootloaderData,
            Alias::SecureRam,
            offset("BL2_DATA_START", aliases.ram_secure, 0)?,
            params.total_ram_size,
        )?);
    }

    let map = RegionMap::new(
        regions,
        LayoutFacts {
            header_size: envelope.header,
            trailer_size: envelope.trailer,
            s_partition_offset: partitions.s_primary,
            s_secondary_partition_offset: partitions.s_secondary,
            ns_partition_offset: partitions.ns_primary,
            s_area_offset,
            ns_area_offset,
            image_s_code_size,
            image_ns_code_size,
        },
    );

    check::validate(params, &map)?;
    info!(
        "derived {} regions (bootloader: {}, linked to {} slot)",
        map.len(),
        params.policy.has_bootloader,
        match params.policy.link_to_secondary {
            false => "primary",
            true => "secondary",
        }
    );
    Ok(map)
}
