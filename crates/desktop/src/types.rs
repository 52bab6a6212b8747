//! Request and view types exchanged with the GUI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use expenseshare_core::{Currency, DomainResult, GroupId, Money, UserId};
use expenseshare_ledger::{
    Allocation, Expense, Group, ReceiptRef, ShareSpec, SplitType, compute_custom_split, compute_equal_split,
};

/// How the GUI asked for an expense to be divided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitRequest {
    /// Even split among these members; empty means every group member.
    Equal(Vec<UserId>),
    /// Exact owed amounts that must add up to the total.
    Exact(Vec<(UserId, Money)>),
    /// Basis points per member (2500 = 25%) adding up to 10000.
    Percent(Vec<(UserId, i64)>),
    /// Relative weights (shares, nights, people...).
    Weights(Vec<(UserId, i64)>),
}

impl SplitRequest {
    pub fn split_type(&self) -> SplitType {
        match self {
            SplitRequest::Equal(_) => SplitType::Equal,
            _ => SplitType::Custom,
        }
    }

    pub fn allocate(&self, total: Money, group: &Group) -> DomainResult<Allocation> {
        match self {
            SplitRequest::Equal(members) if members.is_empty() => {
                let everyone: Vec<UserId> = group.member_ids().collect();
                compute_equal_split(total, &everyone)
            }
            SplitRequest::Equal(members) => compute_equal_split(total, members),
            SplitRequest::Exact(amounts) => compute_custom_split(total, &ShareSpec::Amounts(amounts.clone())),
            SplitRequest::Percent(bps) => compute_custom_split(total, &ShareSpec::Percentages(bps.clone())),
            SplitRequest::Weights(weights) => compute_custom_split(total, &ShareSpec::Weights(weights.clone())),
        }
    }
}

/// Form data for adding or editing an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExpense {
    pub group_id: GroupId,
    pub description: String,
    pub amount: Money,
    /// Blank or missing means the default category.
    pub category: Option<String>,
    /// Defaults to the signed-in user.
    pub payer: Option<UserId>,
    pub split: SplitRequest,
    pub receipt: Option<ReceiptRef>,
    /// Defaults to now when adding, and to the original time when editing.
    pub created_at: Option<DateTime<Utc>>,
}

impl NewExpense {
    /// Equal split among all group members, paid by the signed-in user.
    pub fn equal(group_id: GroupId, description: impl Into<String>, amount: Money) -> Self {
        Self {
            group_id,
            description: description.into(),
            amount,
            category: None,
            payer: None,
            split: SplitRequest::Equal(vec![]),
            receipt: None,
            created_at: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn paid_by(mut self, payer: UserId) -> Self {
        self.payer = Some(payer);
        self
    }

    pub fn split(mut self, split: SplitRequest) -> Self {
        self.split = split;
        self
    }

    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// An expense with the names the history list and CSV export show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseEntry {
    pub expense: Expense,
    pub group_name: String,
    pub payer_name: String,
}

/// Figures for the dashboard cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub currency: Currency,
    /// The user's share of expenses created this calendar month.
    pub this_month: Money,
    pub last_month: Money,
    /// Total others owe the user across all groups.
    pub owed_to_you: Money,
    /// Total the user owes others across all groups.
    pub you_owe: Money,
}
