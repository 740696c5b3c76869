//! The four physical warehouses.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A physical warehouse location.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Warehouse {
    Prague,
    Brno,
    Pardubice,
    Ostrava,
}

impl Warehouse {
    pub const ALL: [Warehouse; 4] = [
        Warehouse::Prague,
        Warehouse::Brno,
        Warehouse::Pardubice,
        Warehouse::Ostrava,
    ];

    /// Central warehouse. Staff assigned here dispatch transfers and see every
    /// warehouse's transfers.
    pub const HUB: Warehouse = Warehouse::Pardubice;

    pub fn as_str(&self) -> &'static str {
        match self {
            Warehouse::Prague => "prague",
            Warehouse::Brno => "brno",
            Warehouse::Pardubice => "pardubice",
            Warehouse::Ostrava => "ostrava",
        }
    }

    pub fn is_hub(&self) -> bool {
        *self == Self::HUB
    }
}

impl core::fmt::Display for Warehouse {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Warehouse {
    type Err = DomainError;

    /// Accepts the canonical names plus the Czech spellings used on shop labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prague" | "praha" => Ok(Warehouse::Prague),
            "brno" => Ok(Warehouse::Brno),
            "pardubice" => Ok(Warehouse::Pardubice),
            "ostrava" => Ok(Warehouse::Ostrava),
            other => Err(DomainError::validation(format!("unknown warehouse '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_and_czech_names() {
        assert_eq!("Praha".parse::<Warehouse>().unwrap(), Warehouse::Prague);
        assert_eq!("prague".parse::<Warehouse>().unwrap(), Warehouse::Prague);
        assert_eq!(" OSTRAVA ".parse::<Warehouse>().unwrap(), Warehouse::Ostrava);
        assert!("Plzen".parse::<Warehouse>().is_err());
    }

    #[test]
    fn display_matches_parse_and_hub_is_pardubice() {
        for w in Warehouse::ALL {
            assert_eq!(w.to_string().parse::<Warehouse>().unwrap(), w);
        }
        assert!(Warehouse::Pardubice.is_hub());
        assert!(!Warehouse::Brno.is_hub());
    }
}
