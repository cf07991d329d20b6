// src/identity_level.rs
// Identity tiers reported by the profile registry and the slot quota attached to each one.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reputation tier of an account as reported by the profile registry.
///
/// The registry returns the tier as a `uint8`, so the enum keeps the same
/// encoding. Ordering follows the discriminant: `Unknown` is the lowest-trust
/// tier and `Professional` the highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum IdentityLevel {
    Unknown = 0,
    Anonymous = 1,
    Registered = 2,
    Identified = 3,
    Professional = 4,
}

impl IdentityLevel {
    pub const ALL: [IdentityLevel; 5] = [
        IdentityLevel::Unknown,
        IdentityLevel::Anonymous,
        IdentityLevel::Registered,
        IdentityLevel::Identified,
        IdentityLevel::Professional,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityLevel::Unknown => "unknown",
            IdentityLevel::Anonymous => "anonymous",
            IdentityLevel::Registered => "registered",
            IdentityLevel::Identified => "identified",
            IdentityLevel::Professional => "professional",
        }
    }
}

impl Default for IdentityLevel {
    fn default() -> Self {
        IdentityLevel::Unknown
    }
}

/// Values outside the known range collapse to `Unknown`.
impl From<u8> for IdentityLevel {
    fn from(raw: u8) -> Self {
        match raw {
            1 => IdentityLevel::Anonymous,
            2 => IdentityLevel::Registered,
            3 => IdentityLevel::Identified,
            4 => IdentityLevel::Professional,
            _ => IdentityLevel::Unknown,
        }
    }
}

impl fmt::Display for IdentityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Static mapping from identity tier to the number of pending transactions
/// the pool admits for an account at that tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountSlotsTable {
    slots: [u64; 5],
}

/// Quotas used by the transaction pool. Fixed at compile time.
pub static ACCOUNT_SLOTS_DEFAULTS: AccountSlotsTable = AccountSlotsTable::new([16, 32, 64, 128, 256]);

impl AccountSlotsTable {
    /// Build a table from quotas indexed by `IdentityLevel as u8`.
    pub const fn new(slots: [u64; 5]) -> Self {
        Self { slots }
    }

    /// Quota for `level`, falling back to the `Unknown` quota when the table
    /// has no entry for it.
    pub fn slots_for(&self, level: IdentityLevel) -> u64 {
        self.slots
            .get(level.as_u8() as usize)
            .copied()
            .unwrap_or(self.slots[IdentityLevel::Unknown as usize])
    }

    /// Quota handed to accounts the registry could not vouch for.
    pub fn minimum(&self) -> u64 {
        self.slots_for(IdentityLevel::Unknown)
    }
}
