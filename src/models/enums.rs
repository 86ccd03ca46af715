use serde::{Deserialize, Serialize};

use crate::db::DatabaseError;

/// Macro to generate enum with as_str + case-insensitive FromStr.
///
/// Agent outputs are not reliable about casing ("moderate" vs "Moderate"),
/// so parsing lowercases before matching and storage uses the canonical form.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(if s.eq_ignore_ascii_case($s) {
                    return Ok(Self::$variant);
                })+
                Err(DatabaseError::InvalidEnum {
                    field: stringify!($name).into(),
                    value: s.into(),
                })
            }
        }
    };
}

str_enum!(Severity {
    Low => "Low",
    Moderate => "Moderate",
    High => "High",
});

str_enum!(MedicationSource {
    Prescription => "prescription",
    Conversation => "conversation_summary",
});

/// Canonicalize an agent-supplied severity/risk string for the typed
/// columns ("moderate" → "Moderate"). Unknown vocabulary passes through
/// unchanged so nothing the agent said is lost.
pub fn canonicalize_severity(raw: &str) -> String {
    use std::str::FromStr;
    Severity::from_str(raw)
        .map(|s| s.as_str().to_string())
        .unwrap_or_else(|_| raw.to_string())
}
