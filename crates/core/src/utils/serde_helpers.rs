//! Serde helpers for the lowercase string enums used in config files

/// Implement lenient string (de)serialization for a fieldless enum.
///
/// Deserialization ignores case, serialization always emits the canonical
/// lowercase name. The macro also provides `as_str`, `Display` and `FromStr`.
///
/// Usage:
/// ```ignore
/// impl_lenient_enum!(
///     OutputMode,
///     Fs => "fs",
///     Virtual => "virtual"
/// );
/// ```
#[macro_export]
macro_rules! impl_lenient_enum {
    ($enum_type:ty, $($variant:ident => $str_val:expr),+ $(,)?) => {
        impl $enum_type {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $str_val, )+
                }
            }
        }

        impl std::fmt::Display for $enum_type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_type {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $( $str_val => Ok(Self::$variant), )+
                    _ => Err(format!(
                        "unknown variant '{}', expected one of: {}",
                        s,
                        [$($str_val),+].join(", ")
                    )),
                }
            }
        }

        impl serde::Serialize for $enum_type {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $enum_type {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}
