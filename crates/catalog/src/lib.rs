//! Catalog domain module: products, categories and their size ranges.
//!
//! Pure domain logic (no IO, no HTTP, no storage).

pub mod category;
pub mod product;

pub use category::{Category, Size};
pub use product::{NewProduct, Product, ProductFilter, ProductUpdate};
