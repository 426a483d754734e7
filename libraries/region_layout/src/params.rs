// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! The parameter set a layout is derived from.
//!
//! Hardware constants, the flash-area table supplied by the flash layout, and
//! the build policy flags. A parameter set is never mutated by derivation.
//!
//! Parameter sets are stored as JSON. Every numeric field accepts either a
//! JSON integer or a string such as `"0x10000000"` (underscores allowed).

use serde::{Deserialize, Serialize};

use crate::region::Alias;

/// Base addresses of the four alias windows.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AliasBases {
    #[serde(deserialize_with = "number::deserialize")]
    pub rom_secure: u64,
    #[serde(deserialize_with = "number::deserialize")]
    pub rom_nonsecure: u64,
    #[serde(deserialize_with = "number::deserialize")]
    pub ram_secure: u64,
    #[serde(deserialize_with = "number::deserialize")]
    pub ram_nonsecure: u64,
}

impl AliasBases {
    pub fn base(&self, alias: Alias) -> u64 {
        match alias {
            Alias::SecureRom => self.rom_secure,
            Alias::NonSecureRom => self.rom_nonsecure,
            Alias::SecureRam => self.ram_secure,
            Alias::NonSecureRam => self.ram_nonsecure,
        }
    }
}

/// One entry of the flash-area table, as physical offset and size.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlashArea {
    #[serde(deserialize_with = "number::deserialize")]
    pub offset: u64,
    #[serde(deserialize_with = "number::deserialize")]
    pub size: u64,
}

/// The flash areas the bootloader manages.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlashAreas {
    pub bl2: FlashArea,
    pub image_primary: FlashArea,
    pub image_secondary: FlashArea,
}

/// Build policy.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootPolicy {
    /// BL2 is present and images carry its header and trailer.
    pub has_bootloader: bool,
    /// Link the active image into the secondary slot instead of the primary.
    pub link_to_secondary: bool,
    /// The bootloader programs the protection controller before handing
    /// over, so its own regions must honour MPC granularity too.
    #[serde(default)]
    pub preboot_mpc: bool,
    /// Image header reserved by BL2 at the start of a slot.
    #[serde(deserialize_with = "number::deserialize")]
    pub bl2_header_size: u64,
    /// Image trailer reserved by BL2 at the end of a slot.
    #[serde(deserialize_with = "number::deserialize")]
    pub bl2_trailer_size: u64,
}

/// Heap and stack budgets per execution context. Carried through to the
/// generated symbols, not derived.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeSizing {
    #[serde(deserialize_with = "number::deserialize")]
    pub bl2_heap_size: u64,
    #[serde(deserialize_with = "number::deserialize")]
    pub bl2_msp_stack_size: u64,
    #[serde(deserialize_with = "number::deserialize")]
    pub s_heap_size: u64,
    #[serde(deserialize_with = "number::deserialize")]
    pub s_msp_stack_size_init: u64,
    #[serde(deserialize_with = "number::deserialize")]
    pub s_msp_stack_size: u64,
    #[serde(deserialize_with = "number::deserialize")]
    pub s_psp_stack_size: u64,
    #[serde(deserialize_with = "number::deserialize")]
    pub ns_heap_size: u64,
    #[serde(deserialize_with = "number::deserialize")]
    pub ns_msp_stack_size: u64,
    #[serde(deserialize_with = "number::deserialize")]
    pub ns_psp_stack_size: u64,
    /// Buffer large enough for an initial attestation token.
    #[serde(deserialize_with = "number::deserialize")]
    pub attest_token_max_size: u64,
}

/// Everything a derivation needs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterSet {
    pub aliases: AliasBases,
    #[serde(deserialize_with = "number::deserialize")]
    pub total_rom_size: u64,
    #[serde(deserialize_with = "number::deserialize")]
    pub total_ram_size: u64,
    #[serde(deserialize_with = "number::deserialize")]
    pub flash_s_partition_size: u64,
    #[serde(deserialize_with = "number::deserialize")]
    pub flash_ns_partition_size: u64,
    pub flash_areas: FlashAreas,
    pub policy: BootPolicy,
    /// Memory protection controller block size. Zero disables the check.
    #[serde(deserialize_with = "number::deserialize")]
    pub mpc_granularity: u64,
    /// Security attribution unit granularity. Zero disables the check.
    #[serde(deserialize_with = "number::deserialize")]
    pub sau_granularity: u64,
    /// Secure gateway veneers reserved after the secure code. May be zero.
    #[serde(deserialize_with = "number::deserialize")]
    pub veneer_region_size: u64,
    pub sizing: RuntimeSizing,
}

impl ParameterSet {
    /// The MPS2 AN519 FPGA image: BL2 present, image linked to the primary
    /// slot.
    pub fn an519() -> ParameterSet {
        ParameterSet {
            aliases: AliasBases {
                rom_secure: 0x1000_0000,
                rom_nonsecure: 0x0000_0000,
                ram_secure: 0x3800_0000,
                ram_nonsecure: 0x2800_0000,
            },
            total_rom_size: 0x0040_0000,
            total_ram_size: 0x0020_0000,
            flash_s_partition_size: 0x8_0000,
            flash_ns_partition_size: 0x8_0000,
            flash_areas: FlashAreas {
                bl2: FlashArea {
                    offset: 0x0,
                    size: 0x8_0000,
                },
                image_primary: FlashArea {
                    offset: 0x08_0000,
                    size: 0x10_0000,
                },
                image_secondary: FlashArea {
                    offset: 0x18_0000,
                    size: 0x10_0000,
                },
            },
            policy: BootPolicy {
                has_bootloader: true,
                link_to_secondary: false,
                preboot_mpc: false,
                bl2_header_size: 0x400,
                bl2_trailer_size: 0x1_0000,
            },
            // 128 KB on the AN519 FPGA image.
            mpc_granularity: 0x2_0000,
            sau_granularity: 32,
            veneer_region_size: 0x380,
            sizing: RuntimeSizing {
                bl2_heap_size: 0x1000,
                bl2_msp_stack_size: 0x1800,
                s_heap_size: 0x1000,
                s_msp_stack_size_init: 0x400,
                s_msp_stack_size: 0x800,
                s_psp_stack_size: 0x800,
                ns_heap_size: 0x1000,
                ns_msp_stack_size: 0x400,
                ns_psp_stack_size: 0xC00,
                attest_token_max_size: 0x200,
            },
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<ParameterSet> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn with_bootloader(mut self, has_bootloader: bool) -> ParameterSet {
        self.policy.has_bootloader = has_bootloader;
        self
    }

    pub fn linked_to_secondary(mut self, link_to_secondary: bool) -> ParameterSet {
        self.policy.link_to_secondary = link_to_secondary;
        self
    }
}

/// Accepts `1024`, `"1024"`, `"0x400"` and `"0x10_0000"`.
mod number {
    use core::fmt;

    use serde::de::{self, Deserializer, Unexpected, Visitor};

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        deserializer.deserialize_any(NumberVisitor)
    }

    struct NumberVisitor;

    impl Visitor<'_> for NumberVisitor {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an unsigned integer or a 0x-prefixed hex string")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<u64, E> {
            Ok(value)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<u64, E> {
            u64::try_from(value).map_err(|_| E::invalid_value(Unexpected::Signed(value), &self))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<u64, E> {
            let digits = value.trim().replace('_', "");
            let parsed = match digits
                .strip_prefix("0x")
                .or_else(|| digits.strip_prefix("0X"))
            {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => digits.parse(),
            };
            parsed.map_err(|_| E::invalid_value(Unexpected::Str(value), &self))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_accepts_hex_strings() {
        let mut json: serde_json::Value =
            serde_json::from_str(&ParameterSet::an519().to_json().unwrap()).unwrap();
        json["aliases"]["rom_secure"] = "0x1000_0000".into();
        json["total_ram_size"] = "2097152".into();
        json["policy"]["bl2_header_size"] = "0X400".into();

        let params = ParameterSet::from_json(&json.to_string()).unwrap();
        assert_eq!(params, ParameterSet::an519());
    }

    #[test]
    fn json_rejects_garbage() {
        let mut json: serde_json::Value =
            serde_json::from_str(&ParameterSet::an519().to_json().unwrap()).unwrap();
        json["mpc_granularity"] = "0xZZ".into();
        assert!(ParameterSet::from_json(&json.to_string()).is_err());

        json["mpc_granularity"] = (-1).into();
        assert!(ParameterSet::from_json(&json.to_string()).is_err());
    }

    #[test]
    fn json_rejects_unknown_fields() {
        let mut json: serde_json::Value =
            serde_json::from_str(&ParameterSet::an519().to_json().unwrap()).unwrap();
        json["policy"]["link_to_tertiary"] = true.into();
        assert!(ParameterSet::from_json(&json.to_string()).is_err());
    }

    #[test]
    fn preboot_mpc_defaults_off() {
        let mut json: serde_json::Value =
            serde_json::from_str(&ParameterSet::an519().to_json().unwrap()).unwrap();
        json["policy"]
            .as_object_mut()
            .unwrap()
            .remove("preboot_mpc");
        let params = ParameterSet::from_json(&json.to_string()).unwrap();
        assert!(!params.policy.preboot_mpc);
    }

    #[test]
    fn alias_bases_resolve() {
        let aliases = ParameterSet::an519().aliases;
        assert_eq!(aliases.base(Alias::SecureRom), 0x1000_0000);
        assert_eq!(aliases.base(Alias::NonSecureRam), 0x2800_0000);
    }
}
