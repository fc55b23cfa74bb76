use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Protocol value for a record written by a client that predates the method field.
pub const PROTO_METHOD_UNSPECIFIED: i32 = 0;

/// Protocol value for [`KeyDerivationMethod::Pbkdf2HmacSha1_1003`].
pub const PROTO_METHOD_PBKDF2_HMAC_SHA1_1003: i32 = 1;

/// How a passphrase is turned into Nigori keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyDerivationMethod {
    /// PBKDF2-HMAC-SHA1 keyed on username/hostname (1001..1004 iterations)
    #[default]
    #[serde(rename = "pbkdf2_hmac_sha1_1003")]
    Pbkdf2HmacSha1_1003,
    /// A method this client does not know, most likely added by a newer one
    #[serde(rename = "unknown")]
    Unknown,
}

impl KeyDerivationMethod {
    /// Map a protocol integer to a method.
    ///
    /// Old clients never wrote the field, so `UNSPECIFIED` means PBKDF2.
    pub fn from_proto(value: i32) -> Self {
        match value {
            PROTO_METHOD_UNSPECIFIED | PROTO_METHOD_PBKDF2_HMAC_SHA1_1003 => {
                Self::Pbkdf2HmacSha1_1003
            }
            _ => Self::Unknown,
        }
    }

    /// Protocol integer for this method. `Unknown` is a client-side
    /// abstraction and has no wire value.
    pub fn to_proto(self) -> Option<i32> {
        match self {
            Self::Pbkdf2HmacSha1_1003 => Some(PROTO_METHOD_PBKDF2_HMAC_SHA1_1003),
            Self::Unknown => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pbkdf2HmacSha1_1003 => "pbkdf2_hmac_sha1_1003",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for KeyDerivationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyDerivationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pbkdf2_hmac_sha1_1003" | "pbkdf2" => Ok(Self::Pbkdf2HmacSha1_1003),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unrecognized key derivation method: {other}")),
        }
    }
}

/// Type tag mixed into a permuted lookup name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum NigoriType {
    Password = 1,
}

impl NigoriType {
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_proto_unspecified_is_pbkdf2() {
        assert_eq!(
            KeyDerivationMethod::from_proto(PROTO_METHOD_UNSPECIFIED),
            KeyDerivationMethod::Pbkdf2HmacSha1_1003
        );
        assert_eq!(
            KeyDerivationMethod::from_proto(PROTO_METHOD_PBKDF2_HMAC_SHA1_1003),
            KeyDerivationMethod::Pbkdf2HmacSha1_1003
        );
    }

    #[test]
    fn test_from_proto_future_value_is_unknown() {
        assert_eq!(
            KeyDerivationMethod::from_proto(2),
            KeyDerivationMethod::Unknown
        );
        assert_eq!(
            KeyDerivationMethod::from_proto(-1),
            KeyDerivationMethod::Unknown
        );
    }

    #[test]
    fn test_to_proto() {
        assert_eq!(
            KeyDerivationMethod::Pbkdf2HmacSha1_1003.to_proto(),
            Some(PROTO_METHOD_PBKDF2_HMAC_SHA1_1003)
        );
        assert_eq!(KeyDerivationMethod::Unknown.to_proto(), None);
    }

    #[test]
    fn test_display_parse_roundtrip() {
        for method in [
            KeyDerivationMethod::Pbkdf2HmacSha1_1003,
            KeyDerivationMethod::Unknown,
        ] {
            let parsed: KeyDerivationMethod = method.to_string().parse().unwrap();
            assert_eq!(parsed, method);
        }
        assert!("argon2".parse::<KeyDerivationMethod>().is_err());
    }

    #[test]
    fn test_password_type_value() {
        assert_eq!(NigoriType::Password.as_u32(), 1);
    }
}
