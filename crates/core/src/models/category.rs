use serde::{Deserialize, Serialize};

use super::transaction::TransactionType;

/// Bucket used for expenses that carry no category.
pub const OTHER: &str = "Other";

/// Categories offered for expenses.
pub const EXPENSE_CATEGORIES: &[&str] = &["Food", "Transport", "Housing", "Leisure", "Health", OTHER];

/// Categories offered for income.
pub const INCOME_CATEGORIES: &[&str] = &["Salary", "Freelance", "Investment", "Gift", OTHER];

/// Chart palette, cycled by position in the category breakdown.
pub const CATEGORY_PALETTE: &[&str] = &[
    "#ef4444", // red
    "#f97316", // orange
    "#eab308", // yellow
    "#22c55e", // green
    "#3b82f6", // blue
    "#8b5cf6", // violet
    "#ec4899", // pink
];

/// The closed set of categories offered for a transaction type.
#[must_use]
pub fn categories_for(transaction_type: TransactionType) -> &'static [&'static str] {
    match transaction_type {
        TransactionType::Expense => EXPENSE_CATEGORIES,
        TransactionType::Income => INCOME_CATEGORIES,
    }
}

#[must_use]
pub fn is_known(transaction_type: TransactionType, name: &str) -> bool {
    categories_for(transaction_type).contains(&name)
}

/// Summed expenses of one category, ready for a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// Category label (`Other` for uncategorized expenses)
    pub name: String,

    /// Sum of amounts, rounded to 2 decimals
    pub value: f64,

    /// Index into [`CATEGORY_PALETTE`]
    pub color_index: usize,
}

impl CategoryTotal {
    #[must_use]
    pub fn color(&self) -> &'static str {
        CATEGORY_PALETTE[self.color_index % CATEGORY_PALETTE.len()]
    }
}
