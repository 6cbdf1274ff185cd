//! Internal chain addresses (`addr_std`)
use crate::error::CellError;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use crc::{Crc, CRC_16_XMODEM};
use std::fmt;
use std::str::FromStr;

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TEST_ONLY: u8 = 0x80;

/// Workchain plus 256-bit account id.
///
/// Equality ignores the bounceable and testnet flags of the user-friendly form.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub workchain: i8,
    pub hash: [u8; 32],
}

impl Address {
    /// Serialized width of `addr_std$10 anycast:0 workchain:int8 hash:bits256`
    pub const STD_BITS: usize = 2 + 1 + 8 + 256;

    pub fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self { workchain, hash }
    }

    /// Raw form: `workchain:hex`
    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }

    /// User-friendly base64url form
    pub fn to_friendly(&self, bounceable: bool, test_only: bool) -> String {
        let mut tag = if bounceable {
            TAG_BOUNCEABLE
        } else {
            TAG_NON_BOUNCEABLE
        };
        if test_only {
            tag |= TAG_TEST_ONLY;
        }
        let mut raw = Vec::with_capacity(36);
        raw.push(tag);
        raw.push(self.workchain as u8);
        raw.extend_from_slice(&self.hash);
        raw.extend_from_slice(&CRC16.checksum(&raw).to_be_bytes());
        URL_SAFE.encode(raw)
    }

    fn parse_raw(s: &str) -> Result<Self, CellError> {
        let (wc, hash) = s
            .split_once(':')
            .ok_or_else(|| CellError::InvalidAddress(s.to_string()))?;
        let workchain = wc
            .parse::<i8>()
            .map_err(|e| CellError::InvalidAddress(format!("workchain {wc}: {e}")))?;
        let bytes =
            hex::decode(hash).map_err(|e| CellError::InvalidAddress(format!("{s}: {e}")))?;
        let hash: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CellError::InvalidAddress(format!("{s}: account id must be 32 bytes")))?;
        Ok(Self::new(workchain, hash))
    }

    fn parse_friendly(s: &str) -> Result<Self, CellError> {
        if s.len() != 48 {
            return Err(CellError::InvalidAddress(format!("{s}: expected 48 characters")));
        }
        let normalized = s.replace('-', "+").replace('_', "/");
        let raw = STANDARD
            .decode(normalized)
            .map_err(|e| CellError::InvalidAddress(format!("{s}: {e}")))?;
        if raw.len() != 36 {
            return Err(CellError::InvalidAddress(format!("{s}: expected 36 bytes")));
        }
        let expected = u16::from_be_bytes([raw[34], raw[35]]);
        if CRC16.checksum(&raw[..34]) != expected {
            return Err(CellError::InvalidAddress(format!("{s}: checksum mismatch")));
        }
        let tag = raw[0] & !TAG_TEST_ONLY;
        if tag != TAG_BOUNCEABLE && tag != TAG_NON_BOUNCEABLE {
            return Err(CellError::InvalidAddress(format!("{s}: unknown tag {:#04x}", raw[0])));
        }
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&raw[2..34]);
        Ok(Self::new(raw[1] as i8, hash))
    }
}

impl FromStr for Address {
    type Err = CellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains(':') {
            Self::parse_raw(s)
        } else {
            Self::parse_friendly(s)
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_raw())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_form() {
        let addr: Address = "-1:3333333333333333333333333333333333333333333333333333333333333333"
            .parse()
            .unwrap();
        assert_eq!(addr.workchain, -1);
        assert_eq!(addr.hash, [0x33; 32]);
        assert_eq!(addr.to_string().parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_friendly_form_ignores_flags() {
        let addr = Address::new(0, [0xab; 32]);
        let bounceable = addr.to_friendly(true, false);
        let testnet = addr.to_friendly(false, true);
        assert_eq!(bounceable.len(), 48);
        assert_ne!(bounceable, testnet);
        assert_eq!(bounceable.parse::<Address>().unwrap(), addr);
        assert_eq!(testnet.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_friendly_checksum() {
        let mut s = Address::new(0, [1; 32]).to_friendly(true, false);
        s.replace_range(10..11, if &s[10..11] == "A" { "B" } else { "A" });
        assert!(s.parse::<Address>().is_err());
    }

    #[test]
    fn test_bad_raw() {
        assert!("0:abcd".parse::<Address>().is_err());
        assert!("300:".parse::<Address>().is_err());
        assert!("nonsense".parse::<Address>().is_err());
    }
}
