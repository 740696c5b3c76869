use serde::{Deserialize, Serialize};

use stockhouse_core::{DomainError, DomainResult, ProductId};

use crate::category::{Category, Size};

/// A catalog product (one model in one color/back-solution variant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    category: Category,
    color: Option<String>,
    back_solution: Option<String>,
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub category: Category,
    pub color: Option<String>,
    pub back_solution: Option<String>,
}

/// Editable product fields. The category is fixed once created because stock
/// entries are keyed by its sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: String,
    pub color: Option<String>,
    pub back_solution: Option<String>,
}

impl Product {
    /// Validate input and build a product.
    ///
    /// Attributes the category does not carry are dropped; blank attributes
    /// become `None`.
    pub fn create(id: ProductId, input: NewProduct) -> DomainResult<Self> {
        let name = validate_name(&input.name)?;
        let category = input.category;
        Ok(Self {
            id,
            name,
            category,
            color: attribute(category.supports_color(), input.color),
            back_solution: attribute(category.supports_back_solution(), input.back_solution),
        })
    }

    /// Rebuild from storage without re-validating.
    pub fn restore(
        id: ProductId,
        name: String,
        category: Category,
        color: Option<String>,
        back_solution: Option<String>,
    ) -> Self {
        Self {
            id,
            name,
            category,
            color,
            back_solution,
        }
    }

    pub fn update(&mut self, input: ProductUpdate) -> DomainResult<()> {
        self.name = validate_name(&input.name)?;
        self.color = attribute(self.category.supports_color(), input.color);
        self.back_solution = attribute(self.category.supports_back_solution(), input.back_solution);
        Ok(())
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn back_solution(&self) -> Option<&str> {
        self.back_solution.as_deref()
    }

    pub fn sizes(&self) -> Vec<Size> {
        self.category.sizes()
    }

    pub fn validate_size(&self, raw: i64) -> DomainResult<Size> {
        self.category.validate_size(raw)
    }

    /// Name, color and back solution joined with "-" (absent parts skipped).
    pub fn variant_label(&self) -> String {
        let mut parts = vec![self.name.as_str()];
        if let Some(c) = self.color() {
            parts.push(c);
        }
        if let Some(b) = self.back_solution() {
            parts.push(b);
        }
        parts.join("-")
    }
}

fn validate_name(name: &str) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn attribute(supported: bool, value: Option<String>) -> Option<String> {
    if !supported {
        return None;
    }
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Catalog listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub category: Option<Category>,
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(cat) = self.category {
            if product.category() != cat {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => product
                .name()
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dress() -> NewProduct {
        NewProduct {
            name: "  Aurora ".to_string(),
            category: Category::Dress,
            color: Some("ivory".to_string()),
            back_solution: Some("corset".to_string()),
        }
    }

    #[test]
    fn create_trims_name_and_keeps_dress_attributes() {
        let p = Product::create(ProductId::new(), dress()).unwrap();
        assert_eq!(p.name(), "Aurora");
        assert_eq!(p.color(), Some("ivory"));
        assert_eq!(p.back_solution(), Some("corset"));
        assert_eq!(p.variant_label(), "Aurora-ivory-corset");
    }

    #[test]
    fn create_rejects_blank_name() {
        let mut input = dress();
        input.name = "   ".to_string();
        let err = Product::create(ProductId::new(), input).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn shoe_drops_color_and_back_solution() {
        let mut input = dress();
        input.category = Category::Shoe;
        let p = Product::create(ProductId::new(), input).unwrap();
        assert_eq!(p.color(), None);
        assert_eq!(p.back_solution(), None);
        assert_eq!(p.variant_label(), "Aurora");
    }

    #[test]
    fn accessory_keeps_color_only() {
        let mut input = dress();
        input.category = Category::Accessory;
        let p = Product::create(ProductId::new(), input).unwrap();
        assert_eq!(p.color(), Some("ivory"));
        assert_eq!(p.back_solution(), None);
        assert_eq!(p.sizes(), vec![Size::UNIVERSAL]);
    }

    #[test]
    fn update_keeps_category_and_blank_attributes_become_none() {
        let mut p = Product::create(ProductId::new(), dress()).unwrap();
        p.update(ProductUpdate {
            name: "Aurora II".to_string(),
            color: Some(" ".to_string()),
            back_solution: None,
        })
        .unwrap();
        assert_eq!(p.name(), "Aurora II");
        assert_eq!(p.category(), Category::Dress);
        assert_eq!(p.color(), None);
    }

    #[test]
    fn filter_matches_category_and_case_insensitive_search() {
        let p = Product::create(ProductId::new(), dress()).unwrap();
        let f = ProductFilter {
            category: Some(Category::Dress),
            search: Some("auro".to_string()),
        };
        assert!(f.matches(&p));

        let f = ProductFilter {
            category: Some(Category::Shoe),
            search: None,
        };
        assert!(!f.matches(&p));
        assert!(ProductFilter::default().matches(&p));
    }
}
