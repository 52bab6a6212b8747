//! Chart data: spending per category and per calendar month.
//!
//! Month boundaries are UTC. A user's spending is their owed share of each
//! expense, not what they paid.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Months, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use expenseshare_core::{Money, UserId};

use crate::expense::Expense;

/// Category → amount, ordered by category name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryTotals(BTreeMap<String, Money>);

impl CategoryTotals {
    pub fn get(&self, category: &str) -> Money {
        self.0.get(category).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Money)> + '_ {
        self.0.iter().map(|(c, a)| (c.as_str(), *a))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> Money {
        self.0.values().sum()
    }

    fn add(&mut self, category: &str, amount: Money) {
        *self.0.entry(category.to_string()).or_default() += amount;
    }
}

/// The user's share of spending this month and last month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub current_month: Money,
    pub previous_month: Money,
}

impl MonthlySummary {
    /// Change from last month to this month.
    pub fn delta(&self) -> Money {
        self.current_month - self.previous_month
    }
}

/// Sum of `user`'s shares per category.
pub fn category_breakdown<'a>(
    user: UserId,
    expenses: impl IntoIterator<Item = &'a Expense>,
) -> CategoryTotals {
    let mut totals = CategoryTotals::default();
    for expense in expenses {
        if let Some(share) = expense.allocation().share_of(user) {
            if !share.is_zero() {
                totals.add(expense.category(), share);
            }
        }
    }
    totals
}

/// Sum of `user`'s shares created this calendar month (up to `now`) and in
/// the calendar month before it.
pub fn monthly_summary<'a>(
    user: UserId,
    expenses: impl IntoIterator<Item = &'a Expense>,
    now: DateTime<Utc>,
) -> MonthlySummary {
    let Some((current_start, previous_start)) = month_starts(now) else {
        return MonthlySummary::default();
    };

    let mut summary = MonthlySummary::default();
    for expense in expenses {
        let Some(share) = expense.allocation().share_of(user) else {
            continue;
        };
        let at = expense.created_at();
        if at >= current_start && at <= now {
            summary.current_month += share;
        } else if at >= previous_start && at < current_start {
            summary.previous_month += share;
        }
    }
    summary
}

/// Total spend per category for a group's expenses.
pub fn group_category_totals<'a>(expenses: impl IntoIterator<Item = &'a Expense>) -> CategoryTotals {
    let mut totals = CategoryTotals::default();
    for expense in expenses {
        totals.add(expense.category(), expense.amount());
    }
    totals
}

fn month_starts(now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let current = now.date_naive().with_day(1)?;
    let previous = current.checked_sub_months(Months::new(1))?;
    Some((
        current.and_time(NaiveTime::MIN).and_utc(),
        previous.and_time(NaiveTime::MIN).and_utc(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use expenseshare_core::{ExpenseId, GroupId};

    use crate::expense::SplitType;
    use crate::split::compute_equal_split;

    fn expense(
        members: &[UserId],
        units: i64,
        category: &str,
        at: DateTime<Utc>,
    ) -> Expense {
        Expense::new(
            ExpenseId::new(),
            GroupId::new(),
            "Item",
            Money::from_minor(units),
            members[0],
            SplitType::Equal,
            compute_equal_split(Money::from_minor(units), members).unwrap(),
            at,
        )
        .unwrap()
        .with_category(category)
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn breakdown_sums_own_shares_per_category() {
        let a = UserId::new();
        let b = UserId::new();
        let now = at(2024, 3, 15);
        let expenses = vec![
            expense(&[a, b], 100, "Food", now),
            expense(&[a, b], 40, "Food", now),
            expense(&[b, a], 30, "Travel", now),
            expense(&[b], 500, "Rent", now),
        ];

        let totals = category_breakdown(a, &expenses);
        assert_eq!(totals.get("Food"), Money::from_minor(70));
        assert_eq!(totals.get("Travel"), Money::from_minor(15));
        assert_eq!(totals.get("Rent"), Money::ZERO);
        assert_eq!(
            totals.iter().map(|(c, _)| c).collect::<Vec<_>>(),
            vec!["Food", "Travel"]
        );
    }

    #[test]
    fn monthly_summary_uses_calendar_months() {
        let a = UserId::new();
        let now = at(2024, 3, 15);
        let expenses = vec![
            expense(&[a], 100, "Food", at(2024, 3, 1)),
            expense(&[a], 20, "Food", at(2024, 2, 29)),
            expense(&[a], 7, "Food", at(2024, 1, 31)),
            expense(&[a], 9, "Food", at(2024, 3, 20)),
        ];

        let summary = monthly_summary(a, &expenses, now);
        assert_eq!(summary.current_month, Money::from_minor(100));
        assert_eq!(summary.previous_month, Money::from_minor(20));
        assert_eq!(summary.delta(), Money::from_minor(80));
    }

    #[test]
    fn january_compares_against_december() {
        let a = UserId::new();
        let expenses = vec![expense(&[a], 42, "Gifts", at(2023, 12, 24))];
        let summary = monthly_summary(a, &expenses, at(2024, 1, 2));
        assert_eq!(summary.previous_month, Money::from_minor(42));
        assert_eq!(summary.current_month, Money::ZERO);
    }

    #[test]
    fn group_totals_use_full_amounts() {
        let a = UserId::new();
        let b = UserId::new();
        let now = at(2024, 3, 15);
        let expenses = vec![
            expense(&[a, b], 100, "Food", now),
            expense(&[b, a], 30, "", now),
        ];
        let totals = group_category_totals(&expenses);
        assert_eq!(totals.get("Food"), Money::from_minor(100));
        assert_eq!(totals.get("General"), Money::from_minor(30));
        assert_eq!(totals.total(), Money::from_minor(130));
    }
}
