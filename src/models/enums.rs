use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern
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
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(ReportCategory {
    Laboratory => "laboratory",
    Imaging => "imaging",
    Pathology => "pathology",
});

str_enum!(TestCategory {
    Hematology => "hematology",
    Chemistry => "chemistry",
    Urinalysis => "urinalysis",
    Coagulation => "coagulation",
});

/// Trend verdict between the newest report of an exam title and its
/// chronological predecessor. String forms are the Italian wire vocabulary
/// shared with the AI service.
str_enum!(TrendStatus {
    Worsened => "peggiorata",
    Improved => "migliorata",
    Unchanged => "invariata",
    NoPrior => "nessun confronto disponibile",
    Error => "errore",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn category_round_trips_through_str() {
        for cat in [
            ReportCategory::Laboratory,
            ReportCategory::Imaging,
            ReportCategory::Pathology,
        ] {
            assert_eq!(ReportCategory::from_str(cat.as_str()).unwrap(), cat);
        }
    }

    #[test]
    fn trend_status_accepts_ai_vocabulary() {
        assert_eq!(
            TrendStatus::from_str("peggiorata").unwrap(),
            TrendStatus::Worsened
        );
        assert_eq!(
            TrendStatus::from_str("migliorata").unwrap(),
            TrendStatus::Improved
        );
        assert_eq!(
            TrendStatus::from_str("invariata").unwrap(),
            TrendStatus::Unchanged
        );
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(TrendStatus::from_str("non determinato").is_err());
        assert!(ReportCategory::from_str("radiology?").is_err());
    }
}
