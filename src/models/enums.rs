use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The string form is also the serde wire form.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }

            pub fn all() -> &'static [$name] {
                &[$(Self::$variant),+]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(
    /// Which AI backend serves an operation.
    ProviderId {
        Hosted => "genkit",
        SelfHosted => "ollama",
    }
);

impl Default for ProviderId {
    fn default() -> Self {
        Self::Hosted
    }
}

str_enum!(
    /// Diagnostic coding systems, passed through opaquely to the models.
    CodingSystem {
        Cie10 => "CIE-10",
        Cie11 => "CIE-11",
        CieO => "CIE-O",
    }
);

impl Default for CodingSystem {
    fn default() -> Self {
        Self::Cie10
    }
}

str_enum!(
    /// Model-reported confidence of a suggested diagnosis.
    Confidence {
        High => "Alta",
        Medium => "Media",
        Low => "Baja",
    }
);

str_enum!(
    /// The four LLM-backed operations. Names match the flow identifiers
    /// the browser client uses.
    Operation {
        ExtractText => "extractTextFromDocument",
        ExtractConcepts => "extractClinicalConcepts",
        SummarizeNotes => "summarizeClinicalNotes",
        SuggestDiagnoses => "suggestDiagnoses",
    }
);

str_enum!(
    /// History list filter on the review flag.
    ReviewStatus {
        All => "all",
        Reviewed => "reviewed",
        Pending => "pending",
    }
);

impl Default for ReviewStatus {
    fn default() -> Self {
        Self::All
    }
}
