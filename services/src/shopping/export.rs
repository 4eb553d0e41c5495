use super::aggregator::{IngredientLine, ShoppingList};

/// File name offered to the browser for the downloaded list.
pub const EXPORT_FILENAME: &str = "BuyList.txt";

pub const EXPORT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

pub const EXPORT_DISPOSITION: &str = "attachment; filename=\"BuyList.txt\"";

/// Trailing line of every export, e.g. `Foodgram 2026`.
pub fn footer(year: i32) -> String {
    format!("Foodgram {year}")
}

/// Aggregates `rows` and renders them one per line, followed by `footer`.
///
/// An empty cart renders as the footer alone.
pub fn render_export<I>(rows: I, footer: &str) -> String
where
    I: IntoIterator<Item = IngredientLine>,
{
    let mut body = String::new();
    for line in ShoppingList::aggregate(rows).lines() {
        body.push_str(&line);
        body.push('\n');
    }
    body.push_str(footer);
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_names_the_export_file() {
        assert!(EXPORT_DISPOSITION.contains(EXPORT_FILENAME));
    }

    #[test]
    fn empty_cart_is_only_the_footer() {
        assert_eq!(render_export(Vec::new(), &footer(2026)), "Foodgram 2026");
    }

    #[test]
    fn lines_precede_the_footer() {
        let body = render_export(
            vec![
                IngredientLine::new("A", "g", 10),
                IngredientLine::new("B", "g", 5),
                IngredientLine::new("A", "g", 3),
            ],
            &footer(2025),
        );
        assert_eq!(body, "* A: 13 g\n* B: 5 g\nFoodgram 2025");
    }
}
