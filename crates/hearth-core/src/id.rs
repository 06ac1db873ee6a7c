// SPDX-License-Identifier: MIT

//! Typed identifiers.
//!
//! [`IdBuf`] is a small inline buffer (avoids a heap allocation for the common
//! case of a short prefixed id) and [`define_id!`] wraps it in a newtype per
//! domain concept so `AutomationId` and `ConfirmationId` can't be swapped by
//! accident at a call site.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

const INLINE_CAP: usize = 30;

/// Inline string buffer for ids, avoiding a heap allocation for short ids.
#[derive(Clone, Copy)]
pub struct IdBuf {
    len: u8,
    buf: [u8; INLINE_CAP],
}

impl IdBuf {
    pub fn new(s: &str) -> Self {
        let bytes = s.as_bytes();
        assert!(
            bytes.len() <= INLINE_CAP,
            "id {s:?} exceeds inline capacity of {INLINE_CAP} bytes"
        );
        let mut buf = [0u8; INLINE_CAP];
        buf[..bytes.len()].copy_from_slice(bytes);
        Self {
            len: bytes.len() as u8,
            buf,
        }
    }

    pub fn as_str(&self) -> &str {
        // Safety-free: constructed only from valid &str in `new`.
        std::str::from_utf8(&self.buf[..self.len as usize]).unwrap_or_default()
    }
}

impl PartialEq for IdBuf {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}
impl Eq for IdBuf {}

impl std::hash::Hash for IdBuf {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl Borrow<str> for IdBuf {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for IdBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for IdBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl Serialize for IdBuf {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for IdBuf {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(IdBuf::new(&s))
    }
}

/// Define a typed id newtype wrapping [`IdBuf`], stamped with a fixed prefix
/// (e.g. `aut_`) on generation so ids are visually distinguishable by kind.
#[macro_export]
macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name($crate::id::IdBuf);

        impl $name {
            /// Generate a new random id with this type's prefix.
            pub fn new() -> Self {
                let suffix = nanoid::nanoid!(
                    21,
                    &[
                        '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e',
                        'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't',
                        'u', 'v', 'w', 'x', 'y', 'z'
                    ]
                );
                Self($crate::id::IdBuf::new(&format!("{}{}", $prefix, suffix)))
            }

            /// Wrap an already-formatted id string (e.g. read back from storage).
            pub fn from_string(s: impl AsRef<str>) -> Self {
                Self($crate::id::IdBuf::new(s.as_ref()))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            /// The prefix this id type is stamped with.
            pub const fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "({:?})"), self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from_string(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::from_string(s)
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0.as_str() == other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.0.as_str()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                self.0.as_str()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    crate::define_id!(TestId, "tst_");

    #[test]
    fn new_ids_carry_prefix_and_are_unique() {
        let a = TestId::new();
        let b = TestId::new();
        assert!(a.as_str().starts_with("tst_"));
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn from_string_round_trips() {
        let id = TestId::from_string("tst_abc123");
        assert_eq!(id.as_str(), "tst_abc123");
        assert_eq!(id.to_string(), "tst_abc123");
    }
}
