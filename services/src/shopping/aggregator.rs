use std::collections::HashMap;
use std::fmt;

/// One ingredient line of a recipe in the user's shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct IngredientLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl IngredientLine {
    pub fn new(name: impl Into<String>, measurement_unit: impl Into<String>, amount: i32) -> Self {
        Self {
            name: name.into(),
            measurement_unit: measurement_unit.into(),
            amount,
        }
    }
}

/// Summed quantity of one ingredient across the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub total: u64,
}

impl fmt::Display for ShoppingItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "* {}: {} {}", self.name, self.total, self.measurement_unit)
    }
}

/// Aggregated shopping list, ordered by first occurrence of each ingredient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingList {
    items: Vec<ShoppingItem>,
}

impl ShoppingList {
    /// Folds ingredient lines into one item per `(name, measurement_unit)`.
    ///
    /// The key is case- and unit-sensitive, so `Flour g` and `Flour kg`
    /// stay separate. Negative amounts never reach this point (the store
    /// enforces `amount >= 1`) and are clamped to zero.
    pub fn aggregate<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = IngredientLine>,
    {
        let mut index: HashMap<(String, String), usize> = HashMap::new();
        let mut items: Vec<ShoppingItem> = Vec::new();

        for row in rows {
            let amount = u64::try_from(row.amount).unwrap_or(0);
            let key = (row.name, row.measurement_unit);
            match index.get(&key) {
                Some(&position) => items[position].total += amount,
                None => {
                    index.insert(key.clone(), items.len());
                    let (name, measurement_unit) = key;
                    items.push(ShoppingItem {
                        name,
                        measurement_unit,
                        total: amount,
                    });
                }
            }
        }

        Self { items }
    }

    /// Consumes the list, yielding one formatted line per item.
    pub fn lines(self) -> impl Iterator<Item = String> {
        self.items.into_iter().map(|item| item.to_string())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ShoppingItem> {
        self.items.iter()
    }
}

impl IntoIterator for ShoppingList {
    type Item = ShoppingItem;
    type IntoIter = std::vec::IntoIter<ShoppingItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a ShoppingList {
    type Item = &'a ShoppingItem;
    type IntoIter = std::slice::Iter<'a, ShoppingItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, unit: &str, amount: i32) -> IngredientLine {
        IngredientLine::new(name, unit, amount)
    }

    #[test]
    fn sums_repeated_ingredients_in_first_seen_order() {
        let list = ShoppingList::aggregate(vec![
            line("A", "g", 10),
            line("B", "g", 5),
            line("A", "g", 3),
        ]);

        let lines: Vec<String> = list.lines().collect();
        assert_eq!(lines, vec!["* A: 13 g", "* B: 5 g"]);
    }

    #[test]
    fn single_row_is_formatted_as_is() {
        let lines: Vec<String> = ShoppingList::aggregate(vec![line("Flour", "g", 200)])
            .lines()
            .collect();
        assert_eq!(lines, vec!["* Flour: 200 g"]);
    }

    #[test]
    fn empty_input_yields_no_lines() {
        let list = ShoppingList::aggregate(Vec::new());
        assert!(list.is_empty());
        assert_eq!(list.lines().count(), 0);
    }

    #[test]
    fn unit_is_part_of_the_key() {
        let list = ShoppingList::aggregate(vec![
            line("Flour", "g", 200),
            line("Flour", "kg", 1),
            line("flour", "g", 50),
        ]);

        assert_eq!(list.len(), 3);
        let lines: Vec<String> = list.lines().collect();
        assert_eq!(lines, vec!["* Flour: 200 g", "* Flour: 1 kg", "* flour: 50 g"]);
    }

    #[test]
    fn line_count_matches_distinct_keys_and_totals_match_sums() {
        let rows = vec![
            line("Salt", "pinch", 1),
            line("Eggs", "pcs", 2),
            line("Milk", "ml", 250),
            line("Eggs", "pcs", 4),
            line("Salt", "pinch", 2),
            line("Milk", "ml", 100),
        ];
        let list = ShoppingList::aggregate(rows.clone());

        let mut distinct: Vec<(String, String)> = rows
            .iter()
            .map(|r| (r.name.clone(), r.measurement_unit.clone()))
            .collect();
        distinct.sort();
        distinct.dedup();
        assert_eq!(list.len(), distinct.len());

        for item in &list {
            let expected: u64 = rows
                .iter()
                .filter(|r| r.name == item.name && r.measurement_unit == item.measurement_unit)
                .map(|r| u64::try_from(r.amount).unwrap())
                .sum();
            assert_eq!(item.total, expected, "total for {}", item.name);
        }
    }

    #[test]
    fn totals_do_not_overflow_i32() {
        let list = ShoppingList::aggregate(vec![
            line("Water", "ml", i32::MAX),
            line("Water", "ml", i32::MAX),
        ]);
        let item = list.iter().next().unwrap();
        assert_eq!(item.total, 2 * u64::try_from(i32::MAX).unwrap());
    }

    #[test]
    fn aggregation_is_deterministic() {
        let rows = vec![line("A", "g", 1), line("B", "ml", 2), line("A", "g", 3)];
        let first: Vec<String> = ShoppingList::aggregate(rows.clone()).lines().collect();
        let second: Vec<String> = ShoppingList::aggregate(rows).lines().collect();
        assert_eq!(first, second);
    }
}
