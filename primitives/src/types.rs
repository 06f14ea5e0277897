//! Fixed-width identifiers and small ABI enums for the vmlink connector.
//!
//! `Bytes32` and `Address` are `#[repr(C)]` so they can be passed by pointer
//! or by value across the C boundary without conversion. Equality is byte-wise.

use core::fmt;

use serde::{Deserialize, Serialize};

/// The ABI version of the interface declared by this crate.
///
/// Baked into the loader and into every VM instance. The loader rejects
/// instances reporting a different value.
pub const ABI_VERSION: i32 = 0;

/// The prefix of every exported factory symbol (`vmlink_create_<name>`).
pub const SYMBOL_PREFIX: &str = "vmlink";

/// 32 bytes of opaque data: hashes, storage keys and values, 256-bit integers.
#[repr(C)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bytes32 {
    pub bytes: [u8; 32],
}

/// Big-endian 256-bit integer, same layout as [`Bytes32`].
pub type Uint256 = Bytes32;

/// 24-byte account address.
#[repr(C)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address {
    pub bytes: [u8; 24],
}

/// The all-zero 32-byte value.
pub const ZERO_BYTES32: Bytes32 = Bytes32 { bytes: [0u8; 32] };

/// The all-zero address.
pub const ZERO_ADDRESS: Address = Address { bytes: [0u8; 24] };

impl Bytes32 {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Returns true if every byte is zero (the empty storage value).
    pub fn is_zero(&self) -> bool {
        self.bytes.iter().all(|b| *b == 0)
    }

    /// Lowercase hex with a `0x` prefix.
    pub fn to_hex(&self) -> String {
        to_hex(&self.bytes)
    }
}

impl Address {
    pub const fn new(bytes: [u8; 24]) -> Self {
        Self { bytes }
    }

    pub fn is_zero(&self) -> bool {
        self.bytes.iter().all(|b| *b == 0)
    }

    pub fn to_hex(&self) -> String {
        to_hex(&self.bytes)
    }
}

impl From<[u8; 32]> for Bytes32 {
    fn from(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }
}

impl From<[u8; 24]> for Address {
    fn from(bytes: [u8; 24]) -> Self {
        Self { bytes }
    }
}

impl From<u64> for Bytes32 {
    /// Big-endian encoding in the low 8 bytes.
    fn from(v: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&v.to_be_bytes());
        Self { bytes }
    }
}

impl fmt::Debug for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bytes32({})", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn to_hex(bytes: &[u8]) -> String {
    use core::fmt::Write;
    let mut s = String::with_capacity(2 + bytes.len() * 2);
    s.push_str("0x");
    for byte in bytes {
        let _ = write!(s, "{:02x}", byte);
    }
    s
}

// ── Call kind, revision, capabilities ──

/// The kind of call-like request carried by a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum CallKind {
    Call = 0,
}

impl CallKind {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::Call),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Versioned variant of the execution semantics a backend may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i32)]
pub enum Revision {
    Frontier = 0,
}

impl Revision {
    /// The newest revision this ABI knows about.
    pub const MAX: Revision = Revision::Frontier;

    /// The latest revision with a finalized specification.
    pub const LATEST_STABLE: Revision = Revision::Frontier;

    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::Frontier),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frontier => write!(f, "Frontier"),
        }
    }
}

/// An optional feature advertised by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Capability {
    /// The backend executes bytecode (the regular case).
    Bytecode = 1 << 0,
    /// The backend executes precompiles and does not need a host interface.
    Precompiles = 1 << 1,
}

/// Bitset of [`Capability`] flags, as returned by `get_capabilities`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(u32);

impl CapabilitySet {
    pub const EMPTY: CapabilitySet = CapabilitySet(0);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, capability: Capability) -> bool {
        self.0 & capability as u32 != 0
    }

    pub fn insert(&mut self, capability: Capability) {
        self.0 |= capability as u32;
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.insert(capability);
        self
    }
}

impl From<Capability> for CapabilitySet {
    fn from(capability: Capability) -> Self {
        Self(capability as u32)
    }
}
