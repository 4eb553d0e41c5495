//! Shopping list aggregation and the plain-text export.
//!
//! The storage layer flattens every shopping-cart recipe of a user into
//! [`IngredientLine`]s; [`ShoppingList::aggregate`] folds them into one
//! entry per `(name, measurement_unit)` pair in first-seen order.

mod aggregator;
mod export;

pub use aggregator::{IngredientLine, ShoppingItem, ShoppingList};
pub use export::{
    EXPORT_CONTENT_TYPE, EXPORT_DISPOSITION, EXPORT_FILENAME, footer, render_export,
};
