//! Hardware addresses.

use std::fmt;
use std::str::FromStr;

use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::errors::Error;

/// A bulb's 48-bit hardware address.
///
/// This is the stable identity of a bulb: the connector cache, push
/// subscriptions and profiles are all keyed by it.
///
/// Parsing accepts colon- or dash-separated octets as well as the bare
/// twelve-digit form bulbs report themselves. Display always uses the bare,
/// upper-case form.
///
/// # Example
///
/// ```
/// use wiz_profiles::MacAddress;
///
/// let a: MacAddress = "a8:bb:50:d2:e4:f1".parse().unwrap();
/// let b: MacAddress = "A8BB50D2E4F1".parse().unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "A8BB50D2E4F1");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        MacAddress(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Colon-separated lower-case notation, e.g. `a8:bb:50:d2:e4:f1`.
    pub fn to_colon_string(&self) -> String {
        self.0
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":")
    }
}

impl FromStr for MacAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidMac(s.to_string());

        let trimmed = s.trim();
        let digits: String = if trimmed.contains([':', '-']) {
            let groups: Vec<&str> = trimmed.split([':', '-']).collect();
            if groups.len() != 6 || groups.iter().any(|g| g.len() != 2) {
                return Err(invalid());
            }
            groups.concat()
        } else {
            trimmed.to_string()
        };

        if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            *octet = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(MacAddress(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({self})")
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(octets: [u8; 6]) -> Self {
        MacAddress(octets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_notations() {
        let expected = MacAddress::new([0xa8, 0xbb, 0x50, 0xd2, 0xe4, 0xf1]);
        for s in ["a8bb50d2e4f1", "A8:BB:50:D2:E4:F1", "a8-bb-50-d2-e4-f1", " a8bb50d2e4f1 "] {
            assert_eq!(s.parse::<MacAddress>().unwrap(), expected, "{s}");
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for s in ["", "a8bb50d2e4", "a8bb50d2e4f1ff", "zzbb50d2e4f1", "a8:bb:50:d2:e4", "a8b:b50:d2:e4:f1:00"] {
            assert_eq!(
                s.parse::<MacAddress>().unwrap_err(),
                Error::InvalidMac(s.to_string())
            );
        }
    }

    #[test]
    fn test_display_forms() {
        let mac = MacAddress::new([0x0a, 0x00, 0xff, 0x10, 0x01, 0xbe]);
        assert_eq!(mac.to_string(), "0A00FF1001BE");
        assert_eq!(mac.to_colon_string(), "0a:00:ff:10:01:be");
    }

    #[test]
    fn test_serde_as_string() {
        let mac: MacAddress = serde_json::from_str("\"a8:bb:50:d2:e4:f1\"").unwrap();
        assert_eq!(serde_json::to_string(&mac).unwrap(), "\"A8BB50D2E4F1\"");
        assert!(serde_json::from_str::<MacAddress>("\"nope\"").is_err());
    }
}
