// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Regions and the region map.
//!
//! A [`Region`] is one contiguous address range seen through one alias
//! window. The [`RegionMap`] is the ordered table of every region derived for
//! a target, together with the intermediate [`LayoutFacts`] the regions were
//! computed from.

use core::fmt::{self, Display};

use serde::Serialize;

use crate::error::{LayoutError, Result};

/// Which physical memory an alias window maps.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum Memory {
    Flash,
    Ram,
}

/// Security attribute of an alias window.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum SecurityState {
    Secure,
    NonSecure,
}

/// One of the four alias windows onto the same physical flash and RAM.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum Alias {
    SecureRom,
    NonSecureRom,
    SecureRam,
    NonSecureRam,
}

impl Alias {
    pub fn memory(self) -> Memory {
        match self {
            Alias::SecureRom | Alias::NonSecureRom => Memory::Flash,
            Alias::SecureRam | Alias::NonSecureRam => Memory::Ram,
        }
    }

    pub fn security(self) -> SecurityState {
        match self {
            Alias::SecureRom | Alias::SecureRam => SecurityState::Secure,
            Alias::NonSecureRom | Alias::NonSecureRam => SecurityState::NonSecure,
        }
    }
}

/// When a region is live.
///
/// The bootloader runs alone before the secure/non-secure split exists, so
/// its RAM may be reused by the runtime. Flash is persistent and is shared
/// across phases.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum Phase {
    Boot,
    Runtime,
}

/// What a region is used for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum RegionKind {
    CodeROM,
    DataRAM,
    VeneerGate,
    BootloaderCode,
    BootloaderData,
    FirmwarePrimaryPartition,
    FirmwareSecondaryPartition,
}

impl RegionKind {
    pub fn phase(self) -> Phase {
        match self {
            RegionKind::BootloaderCode | RegionKind::BootloaderData => Phase::Boot,
            _ => Phase::Runtime,
        }
    }

    /// Partition descriptors describe a whole flash window handed to a
    /// collaborator; they are not allocations and may enclose code regions.
    pub fn is_descriptor(self) -> bool {
        matches!(
            self,
            RegionKind::FirmwarePrimaryPartition | RegionKind::FirmwareSecondaryPartition
        )
    }

    /// Regions the memory protection controller is programmed with at
    /// runtime.
    pub fn is_mpc_target(self) -> bool {
        matches!(
            self,
            RegionKind::DataRAM
                | RegionKind::FirmwarePrimaryPartition
                | RegionKind::FirmwareSecondaryPartition
        )
    }

    /// Regions attributed at security attribution unit granularity.
    pub fn is_sau_target(self) -> bool {
        matches!(self, RegionKind::CodeROM | RegionKind::VeneerGate)
    }
}

/// The named boundaries of the layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum RegionName {
    #[serde(rename = "S_CODE")]
    SecureCode,
    #[serde(rename = "CMSE_VENEER_REGION")]
    Veneer,
    #[serde(rename = "S_DATA")]
    SecureData,
    #[serde(rename = "NS_CODE")]
    NonSecureCode,
    #[serde(rename = "NS_DATA")]
    NonSecureData,
    #[serde(rename = "NS_PARTITION")]
    NonSecurePartition,
    #[serde(rename = "SECONDARY_PARTITION")]
    SecondaryPartition,
    #[serde(rename = "BL2_CODE")]
    BootloaderCode,
    #[serde(rename = "BL2_DATA")]
    BootloaderData,
}

impl RegionName {
    /// Prefix of the `_START`/`_SIZE`/`_LIMIT` symbols for this region.
    pub const fn symbol(self) -> &'static str {
        match self {
            RegionName::SecureCode => "S_CODE",
            RegionName::Veneer => "CMSE_VENEER_REGION",
            RegionName::SecureData => "S_DATA",
            RegionName::NonSecureCode => "NS_CODE",
            RegionName::NonSecureData => "NS_DATA",
            RegionName::NonSecurePartition => "NS_PARTITION",
            RegionName::SecondaryPartition => "SECONDARY_PARTITION",
            RegionName::BootloaderCode => "BL2_CODE",
            RegionName::BootloaderData => "BL2_DATA",
        }
    }

    pub const fn kind(self) -> RegionKind {
        match self {
            RegionName::SecureCode | RegionName::NonSecureCode => RegionKind::CodeROM,
            RegionName::Veneer => RegionKind::VeneerGate,
            RegionName::SecureData | RegionName::NonSecureData => RegionKind::DataRAM,
            RegionName::NonSecurePartition => RegionKind::FirmwarePrimaryPartition,
            RegionName::SecondaryPartition => RegionKind::FirmwareSecondaryPartition,
            RegionName::BootloaderCode => RegionKind::BootloaderCode,
            RegionName::BootloaderData => RegionKind::BootloaderData,
        }
    }
}

impl Display for RegionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One contiguous address range.
///
/// `limit` is the last byte of the region, `start + size - 1`. A region of
/// size zero has no last byte and therefore no limit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct Region {
    name: RegionName,
    kind: RegionKind,
    alias: Alias,
    start: u64,
    size: u64,
    limit: Option<u64>,
}

impl Region {
    /// The first byte past the region must be addressable, so a region may
    /// not end at the very top of the address space.
    pub(crate) fn new(name: RegionName, alias: Alias, start: u64, size: u64) -> Result<Region> {
        let end = start
            .checked_add(size)
            .ok_or(LayoutError::AddressOverflow {
                what: name.symbol(),
                base: start,
                offset: size,
            })?;
        let limit = match size {
            0 => None,
            _ => Some(end - 1),
        };
        Ok(Region {
            name,
            kind: name.kind(),
            alias,
            start,
            size,
            limit,
        })
    }

    pub fn name(&self) -> RegionName {
        self.name
    }

    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    pub fn alias(&self) -> Alias {
        self.alias
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Last byte of the region, `None` for a zero-sized region.
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// First byte past the region. Never overflows, see [`Region::new`].
    pub fn end(&self) -> u64 {
        self.start + self.size
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit {
            Some(limit) => write!(
                f,
                "{:<20} {:#010x}..={:#010x} ({:#x} bytes)",
                self.name, self.start, limit, self.size
            ),
            None => write!(f, "{:<20} {:#010x} (empty)", self.name, self.start),
        }
    }
}

/// Intermediate values of the derivation, kept so they can be emitted and
/// cross-checked alongside the regions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutFacts {
    pub header_size: u64,
    pub trailer_size: u64,
    /// Physical offset of the slot the secure image is linked into.
    pub s_partition_offset: u64,
    /// Physical offset of the inactive A/B slot.
    pub s_secondary_partition_offset: u64,
    pub ns_partition_offset: u64,
    pub s_area_offset: u64,
    pub ns_area_offset: u64,
    pub image_s_code_size: u64,
    pub image_ns_code_size: u64,
}

/// An entry handed to the memory protection controller configuration step.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct MpcEntry {
    pub name: RegionName,
    pub base: u64,
    pub size: u64,
}

/// The ordered table of derived regions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionMap {
    regions: Vec<Region>,
    facts: LayoutFacts,
}

impl RegionMap {
    pub(crate) fn new(regions: Vec<Region>, facts: LayoutFacts) -> RegionMap {
        RegionMap { regions, facts }
    }

    pub fn get(&self, name: RegionName) -> Option<&Region> {
        self.regions.iter().find(|region| region.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn facts(&self) -> &LayoutFacts {
        &self.facts
    }

    /// `(base, size)` pairs for every region the protection controller is
    /// programmed with, in map order.
    pub fn mpc_config(&self) -> Vec<MpcEntry> {
        self.regions
            .iter()
            .filter(|region| region.kind.is_mpc_target())
            .map(|region| MpcEntry {
                name: region.name,
                base: region.start,
                size: region.size,
            })
            .collect()
    }
}

impl Display for RegionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for region in self.regions.iter() {
            writeln!(f, "{}", region)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_last_byte() {
        let region = Region::new(RegionName::SecureData, Alias::SecureRam, 0x3800_0000, 0x10_0000)
            .unwrap();
        assert_eq!(region.limit(), Some(0x380F_FFFF));
        assert_eq!(region.end(), 0x3810_0000);
    }

    #[test]
    fn empty_region_has_no_limit() {
        let region = Region::new(RegionName::Veneer, Alias::SecureRom, 0x100E_FC80, 0).unwrap();
        assert_eq!(region.limit(), None);
        assert_eq!(region.end(), region.start());
    }

    #[test]
    fn limit_overflow_is_reported() {
        let err = Region::new(RegionName::SecureCode, Alias::SecureRom, u64::MAX, 2).unwrap_err();
        assert!(matches!(err, LayoutError::AddressOverflow { what: "S_CODE", .. }));
    }

    #[test]
    fn region_ending_at_top_of_address_space_is_rejected() {
        // Last byte would be u64::MAX, so the end is 2^64.
        let start = 0u64.wrapping_sub(0x1000);
        assert_eq!(
            Region::new(RegionName::SecureCode, Alias::SecureRom, start, 0x1000),
            Err(LayoutError::AddressOverflow {
                what: "S_CODE",
                base: start,
                offset: 0x1000,
            })
        );
        let below = Region::new(RegionName::SecureCode, Alias::SecureRom, start, 0xFFF).unwrap();
        assert_eq!(below.limit(), Some(u64::MAX - 1));
        assert_eq!(below.end(), u64::MAX);
    }

    #[test]
    fn kinds_follow_names() {
        assert_eq!(RegionName::Veneer.kind(), RegionKind::VeneerGate);
        assert_eq!(RegionName::BootloaderData.kind().phase(), Phase::Boot);
        assert!(RegionName::SecondaryPartition.kind().is_descriptor());
        assert!(!RegionName::NonSecureCode.kind().is_mpc_target());
        assert_eq!(Alias::NonSecureRam.memory(), Memory::Ram);
        assert_eq!(Alias::SecureRom.security(), SecurityState::Secure);
    }
}
