use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::db::DatabaseError;

/// Status enums stored as their upper-case wire names.
macro_rules! storage_enum {
    ($name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            /// `'A' | 'B'` listing, used in validation messages.
            pub fn expected() -> String {
                Self::ALL
                    .iter()
                    .map(|v| format!("'{}'", v.as_str()))
                    .collect::<Vec<_>>()
                    .join(" | ")
            }
        }

        impl FromStr for $name {
            type Err = DatabaseError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == raw)
                    .ok_or_else(|| DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: raw.into(),
                    })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

storage_enum!(RfpStatus {
    Draft => "DRAFT",
    Sent => "SENT",
    Closed => "CLOSED",
});

storage_enum!(ProposalStatus {
    Received => "RECEIVED",
    Parsed => "PARSED",
    Reviewed => "REVIEWED",
});

storage_enum!(EmailStatus {
    Pending => "PENDING",
    Sent => "SENT",
    Failed => "FAILED",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfp_status_round_trip() {
        for (variant, s) in [
            (RfpStatus::Draft, "DRAFT"),
            (RfpStatus::Sent, "SENT"),
            (RfpStatus::Closed, "CLOSED"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(RfpStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn proposal_status_serializes_uppercase() {
        let json = serde_json::to_string(&ProposalStatus::Parsed).unwrap();
        assert_eq!(json, "\"PARSED\"");
        let back: ProposalStatus = serde_json::from_str("\"REVIEWED\"").unwrap();
        assert_eq!(back, ProposalStatus::Reviewed);
    }

    #[test]
    fn expected_lists_every_variant() {
        assert_eq!(RfpStatus::expected(), "'DRAFT' | 'SENT' | 'CLOSED'");
        assert_eq!(ProposalStatus::ALL.len(), 3);
    }

    #[test]
    fn email_status_display_matches_storage() {
        assert_eq!(EmailStatus::Failed.to_string(), "FAILED");
        assert_eq!(EmailStatus::Pending.to_string(), "PENDING");
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(RfpStatus::from_str("draft").is_err());
        assert!(ProposalStatus::from_str("unknown").is_err());
        match EmailStatus::from_str("") {
            Err(DatabaseError::InvalidEnum { field, .. }) => assert_eq!(field, "EmailStatus"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
