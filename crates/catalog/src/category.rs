use core::str::FromStr;
use serde::{Deserialize, Serialize};

use stockhouse_core::{DomainError, DomainResult};

/// Product category. Decides which sizes a product is stocked in and which
/// descriptive attributes it carries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Dress,
    Shoe,
    Accessory,
    Other,
}

/// A stocked size. Categories without size variation use [`Size::UNIVERSAL`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(u16);

impl Size {
    /// Sentinel size for accessories and other unsized goods.
    pub const UNIVERSAL: Size = Size(0);

    pub fn value(&self) -> u16 {
        self.0
    }

    pub fn is_universal(&self) -> bool {
        *self == Self::UNIVERSAL
    }

    /// Label used on screens and documents: the number, or "-" for the universal size.
    pub fn label(&self) -> String {
        if self.is_universal() {
            "-".to_string()
        } else {
            self.0.to_string()
        }
    }

    /// Construct without validation. Only for values already checked against a
    /// category (e.g. rows loaded from storage).
    pub fn from_raw(value: u16) -> Self {
        Size(value)
    }
}

impl core::fmt::Display for Size {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.label())
    }
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Dress,
        Category::Shoe,
        Category::Accessory,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Dress => "dress",
            Category::Shoe => "shoe",
            Category::Accessory => "accessory",
            Category::Other => "other",
        }
    }

    /// Sizes stocked for this category, ascending.
    ///
    /// Dresses: even sizes 32–54. Shoes: 36–42. Everything else: universal.
    pub fn sizes(&self) -> Vec<Size> {
        match self {
            Category::Dress => (32..=54).step_by(2).map(Size).collect(),
            Category::Shoe => (36..=42).map(Size).collect(),
            Category::Accessory | Category::Other => vec![Size::UNIVERSAL],
        }
    }

    pub fn has_size_variation(&self) -> bool {
        matches!(self, Category::Dress | Category::Shoe)
    }

    pub fn supports_color(&self) -> bool {
        matches!(self, Category::Dress | Category::Accessory)
    }

    pub fn supports_back_solution(&self) -> bool {
        matches!(self, Category::Dress)
    }

    /// Validate a raw size against this category's size range.
    ///
    /// Unsized categories accept only the universal size.
    pub fn validate_size(&self, raw: i64) -> DomainResult<Size> {
        let candidate = u16::try_from(raw).ok().map(Size);
        match candidate {
            Some(size) if self.sizes().contains(&size) => Ok(size),
            _ => Err(DomainError::InvalidSize {
                category: self.as_str().to_string(),
                size: raw,
            }),
        }
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dress" => Ok(Category::Dress),
            "shoe" => Ok(Category::Shoe),
            "accessory" => Ok(Category::Accessory),
            "other" => Ok(Category::Other),
            other => Err(DomainError::validation(format!(
                "category must be one of: dress, shoe, accessory, other (got '{other}')"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dress_sizes_are_even_32_to_54() {
        let sizes: Vec<u16> = Category::Dress.sizes().iter().map(Size::value).collect();
        assert_eq!(sizes, vec![32, 34, 36, 38, 40, 42, 44, 46, 48, 50, 52, 54]);
    }

    #[test]
    fn shoe_sizes_are_36_to_42() {
        let sizes: Vec<u16> = Category::Shoe.sizes().iter().map(Size::value).collect();
        assert_eq!(sizes, vec![36, 37, 38, 39, 40, 41, 42]);
    }

    #[test]
    fn unsized_categories_only_accept_universal() {
        for cat in [Category::Accessory, Category::Other] {
            assert_eq!(cat.validate_size(0).unwrap(), Size::UNIVERSAL);
            assert!(cat.validate_size(38).is_err());
        }
    }

    #[test]
    fn odd_dress_size_is_rejected() {
        let err = Category::Dress.validate_size(37).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidSize {
                category: "dress".to_string(),
                size: 37
            }
        );
        assert!(Category::Shoe.validate_size(-1).is_err());
        assert!(Category::Shoe.validate_size(70_000).is_err());
    }

    #[test]
    fn universal_size_renders_as_dash() {
        assert_eq!(Size::UNIVERSAL.label(), "-");
        assert_eq!(Category::Shoe.validate_size(40).unwrap().label(), "40");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: a size is accepted iff it is listed in the category's range.
            #[test]
            fn validate_size_agrees_with_sizes(raw in -5i64..100) {
                for cat in Category::ALL {
                    let listed = cat.sizes().iter().any(|s| i64::from(s.value()) == raw);
                    prop_assert_eq!(cat.validate_size(raw).is_ok(), listed);
                }
            }
        }
    }
}
