//! Random identifiers for documents and runs.

use std::fmt;

use rand::RngExt;
use serde::{Serialize, Serializer};

/// Generate a random RFC4122 v4 GUID as raw 16 bytes
pub fn generate_guid_bytes() -> [u8; 16] {
    let mut bytes = [0u8; 16];
    let mut rng = rand::rng();
    rng.fill(&mut bytes);
    // RFC4122 v4
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    bytes
}

/// A random v4 GUID, displayed in the lowercase hyphenated form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid([u8; 16]);

impl Guid {
    #[inline]
    pub fn new_random() -> Self {
        Self(generate_guid_bytes())
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Identity of a loaded document.
pub type DocumentId = Guid;

/// Identity of one orchestration run.
pub type RunId = Guid;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_format() {
        let s = Guid::new_random().to_string();
        assert_eq!(s.len(), 36);
        assert_eq!(&s[8..9], "-");
        assert_eq!(&s[13..14], "-");
        assert_eq!(&s[14..15], "4");
        assert_eq!(&s[18..19], "-");
        assert_eq!(&s[23..24], "-");
        for (i, ch) in s.chars().enumerate() {
            if matches!(i, 8 | 13 | 18 | 23) {
                continue;
            }
            assert!(ch.is_ascii_hexdigit());
            assert!(!ch.is_ascii_uppercase());
        }
    }

    #[test]
    fn test_guids_differ() {
        assert_ne!(Guid::new_random(), Guid::new_random());
    }
}
