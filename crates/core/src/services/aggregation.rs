//! Derived figures over a transaction list.
//!
//! Pure business logic: no I/O, no state, total over any input
//! (the empty list gives zero sums and an empty breakdown).

use crate::models::category::{CategoryTotal, CATEGORY_PALETTE, OTHER};
use crate::models::transaction::{Transaction, TransactionType, TypeFilter};

/// Income minus expenses.
#[must_use]
pub fn balance(transactions: &[Transaction]) -> f64 {
    total_income(transactions) - total_expenses(transactions)
}

#[must_use]
pub fn total_income(transactions: &[Transaction]) -> f64 {
    sum_of(transactions, TransactionType::Income)
}

#[must_use]
pub fn total_expenses(transactions: &[Transaction]) -> f64 {
    sum_of(transactions, TransactionType::Expense)
}

fn sum_of(transactions: &[Transaction], transaction_type: TransactionType) -> f64 {
    transactions
        .iter()
        .filter(|t| t.transaction_type == transaction_type)
        .map(|t| t.amount)
        .sum()
}

/// Expenses summed per category, largest first.
///
/// Uncategorized expenses go to the `Other` bucket. Sums are rounded to 2
/// decimals. Equal sums keep the order in which their category first appears.
/// `color_index` is the position in the result modulo the palette size, so a
/// category's color follows its rank, not its name.
#[must_use]
pub fn group_expenses_by_category(transactions: &[Transaction]) -> Vec<CategoryTotal> {
    // Buckets stay in first-seen order until the sort.
    let mut buckets: Vec<(&str, f64)> = Vec::new();
    for t in transactions.iter().filter(|t| t.is_expense()) {
        let name = t
            .category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(OTHER);
        match buckets.iter_mut().find(|(n, _)| *n == name) {
            Some((_, sum)) => *sum += t.amount,
            None => buckets.push((name, t.amount)),
        }
    }

    buckets.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    buckets
        .into_iter()
        .enumerate()
        .map(|(position, (name, sum))| CategoryTotal {
            name: name.to_string(),
            value: round_cents(sum),
            color_index: position % CATEGORY_PALETTE.len(),
        })
        .collect()
}

/// Order-preserving filter. `TypeFilter::All` returns every transaction.
#[must_use]
pub fn filter_by_type(transactions: &[Transaction], filter: TypeFilter) -> Vec<&Transaction> {
    transactions
        .iter()
        .filter(|t| filter.matches(t.transaction_type))
        .collect()
}

/// Transactions ordered by calendar date. The sort is stable: equal dates
/// keep their order from the input in both directions.
#[must_use]
pub fn sort_by_date(transactions: &[Transaction], ascending: bool) -> Vec<&Transaction> {
    let mut sorted: Vec<&Transaction> = transactions.iter().collect();
    if ascending {
        sorted.sort_by(|a, b| a.date.cmp(&b.date));
    } else {
        sorted.sort_by(|a, b| b.date.cmp(&a.date));
    }
    sorted
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
