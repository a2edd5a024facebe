//! MAC Addresses and MAC Prefixes
//!
//! Hardware addresses of 6 (EUI-48), 8 (EUI-64) or 20 octets in colon,
//! hyphen or dot notation, and bit-length prefixes used to classify them.

use macaddr::{MacAddr6, MacAddr8};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Octets in an EUI-48 address.
pub const EUI48_LEN: usize = 6;
/// Octets in an EUI-64 address.
pub const EUI64_LEN: usize = 8;
/// Octets in a 20 byte (InfiniBand style) hardware address.
pub const WWN_LEN: usize = 20;
/// Longest prefix length in bits.
pub const MAX_PREFIX_BITS: u8 = (WWN_LEN * 8) as u8;

/// Malformed MAC or MAC prefix text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid MAC address {input:?}")]
    InvalidMac { input: String },
    #[error("{input:?} is no MAC prefix")]
    MissingPrefixLength { input: String },
    #[error("invalid prefix length {input:?}")]
    InvalidPrefixLength { input: String },
}

/// A parsed hardware address.
///
/// Octets past `len` are always zero, so the derived equality and hash
/// compare the significant octets only.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mac {
    octets: [u8; WWN_LEN],
    len: u8,
}

impl Mac {
    /// Parse a full address of 6, 8 or 20 octets.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        match parse_octets(s) {
            Some((octets, len)) if is_address_len(len) => Ok(Self {
                octets,
                len: len as u8,
            }),
            _ => Err(ParseError::InvalidMac {
                input: s.to_string(),
            }),
        }
    }

    /// Build an address from raw octets. Returns `None` for unsupported lengths.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if !is_address_len(bytes.len()) {
            return None;
        }
        let mut octets = [0u8; WWN_LEN];
        octets[..bytes.len()].copy_from_slice(bytes);
        Some(Self {
            octets,
            len: bytes.len() as u8,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.octets[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn is_address_len(len: usize) -> bool {
    matches!(len, EUI48_LEN | EUI64_LEN | WWN_LEN)
}

impl FromStr for Mac {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Mac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, octet) in self.as_bytes().iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{octet:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Mac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mac({self})")
    }
}

impl From<MacAddr6> for Mac {
    fn from(mac: MacAddr6) -> Self {
        let mut octets = [0u8; WWN_LEN];
        octets[..EUI48_LEN].copy_from_slice(mac.as_bytes());
        Self {
            octets,
            len: EUI48_LEN as u8,
        }
    }
}

impl From<MacAddr8> for Mac {
    fn from(mac: MacAddr8) -> Self {
        let mut octets = [0u8; WWN_LEN];
        octets[..EUI64_LEN].copy_from_slice(mac.as_bytes());
        Self {
            octets,
            len: EUI64_LEN as u8,
        }
    }
}

impl Serialize for Mac {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Mac {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Mac::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A MAC address plus the number of significant leading bits.
///
/// Bits past `bits` are zero in the stored address, so two prefixes
/// parsed from different text but covering the same range compare equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacPrefix {
    address: Mac,
    bits: u8,
}

impl MacPrefix {
    /// Parse `<mac>/<bits>`.
    ///
    /// The address part may be partial (`20`, `22:40:60`). The stored
    /// address is widened to the smallest of 6, 8 or 20 octets that holds
    /// `bits`.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let (addr, len_text) = s
            .rsplit_once('/')
            .ok_or_else(|| ParseError::MissingPrefixLength {
                input: s.to_string(),
            })?;

        let (mut octets, _) = parse_octets(addr).ok_or_else(|| ParseError::InvalidMac {
            input: addr.to_string(),
        })?;

        let bits = len_text
            .parse::<u8>()
            .ok()
            .filter(|bits| *bits <= MAX_PREFIX_BITS)
            .ok_or_else(|| ParseError::InvalidPrefixLength {
                input: len_text.to_string(),
            })?;

        for (i, octet) in octets.iter_mut().enumerate() {
            *octet &= octet_mask(bits, i);
        }

        let width = match bits as usize {
            b if b <= EUI48_LEN * 8 => EUI48_LEN,
            b if b <= EUI64_LEN * 8 => EUI64_LEN,
            _ => WWN_LEN,
        };

        Ok(Self {
            address: Mac {
                octets,
                len: width as u8,
            },
            bits,
        })
    }

    pub fn address(&self) -> &Mac {
        &self.address
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Whether the first `bits` bits of `mac` equal those of this prefix.
    pub fn contains(&self, mac: &Mac) -> bool {
        let bits = self.bits as usize;
        if bits > mac.len() * 8 {
            return false;
        }

        let full = bits / 8;
        for i in 0..full {
            if self.address.octets[i] != mac.octets[i] {
                return false;
            }
        }

        let rest = bits % 8;
        if rest == 0 {
            return true;
        }
        let mask = 0xFFu8 << (8 - rest);
        self.address.octets[full] & mask == mac.octets[full] & mask
    }
}

/// Mask for octet `index` of a prefix that is `bits` long.
fn octet_mask(bits: u8, index: usize) -> u8 {
    let start = index * 8;
    let bits = bits as usize;
    if bits >= start + 8 {
        0xFF
    } else if bits <= start {
        0x00
    } else {
        0xFFu8 << (8 - (bits - start))
    }
}

impl FromStr for MacPrefix {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MacPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.bits)
    }
}

impl fmt::Debug for MacPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacPrefix({self})")
    }
}

impl Serialize for MacPrefix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacPrefix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        MacPrefix::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Split address text into octets.
///
/// Colon and hyphen notation accept 1 to 20 two-digit groups with one
/// consistent separator. Dot notation takes four-digit groups and only
/// complete 6, 8 or 20 octet addresses.
fn parse_octets(s: &str) -> Option<([u8; WWN_LEN], usize)> {
    let b = s.as_bytes();
    let mut octets = [0u8; WWN_LEN];

    if b.len() < 2 {
        return None;
    }

    if b.len() == 2 || b[2] == b':' || b[2] == b'-' {
        if (b.len() + 1) % 3 != 0 {
            return None;
        }
        let n = (b.len() + 1) / 3;
        if n > WWN_LEN {
            return None;
        }
        let sep = if b.len() > 2 { b[2] } else { b':' };
        for (i, group) in b.chunks(3).enumerate() {
            octets[i] = hex_octet(group[0], group[1])?;
            if group.len() == 3 && group[2] != sep {
                return None;
            }
        }
        Some((octets, n))
    } else if b.len() > 4 && b[4] == b'.' {
        if (b.len() + 1) % 5 != 0 {
            return None;
        }
        let n = 2 * (b.len() + 1) / 5;
        if !is_address_len(n) {
            return None;
        }
        for (i, group) in b.chunks(5).enumerate() {
            octets[2 * i] = hex_octet(group[0], group[1])?;
            octets[2 * i + 1] = hex_octet(group[2], group[3])?;
            if group.len() == 5 && group[4] != b'.' {
                return None;
            }
        }
        Some((octets, n))
    } else {
        None
    }
}

fn hex_octet(high: u8, low: u8) -> Option<u8> {
    let digit = |c: u8| (c as char).to_digit(16).map(|d| d as u8);
    Some(digit(high)? << 4 | digit(low)?)
}
