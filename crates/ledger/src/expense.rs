use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use expenseshare_core::{DomainError, DomainResult, ExpenseId, GroupId, Money, UserId, ValueObject};

/// Category used when the caller leaves it blank.
pub const DEFAULT_CATEGORY: &str = "General";

/// How an expense was divided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
    Equal,
    Custom,
}

impl SplitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitType::Equal => "equal",
            SplitType::Custom => "custom",
        }
    }
}

/// One member's owed part of an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub member: UserId,
    pub amount: Money,
}

/// Ordered member → share mapping of an expense.
///
/// # Invariants
/// - at least one share
/// - each member appears once
/// - no share is negative
/// - the shares add up without overflowing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Share>", into = "Vec<Share>")]
pub struct Allocation {
    shares: Vec<Share>,
}

impl Allocation {
    pub fn new(shares: Vec<Share>) -> DomainResult<Self> {
        if shares.is_empty() {
            return Err(DomainError::invalid_input("allocation needs at least one member"));
        }
        for (idx, share) in shares.iter().enumerate() {
            if share.amount.is_negative() {
                return Err(DomainError::invalid_input(format!(
                    "share for {} is negative",
                    share.member
                )));
            }
            if shares[..idx].iter().any(|s| s.member == share.member) {
                return Err(DomainError::invalid_input(format!(
                    "member {} appears twice in the allocation",
                    share.member
                )));
            }
        }
        if Money::checked_sum(shares.iter().map(|s| s.amount)).is_none() {
            return Err(DomainError::invalid_input("amount out of range"));
        }
        Ok(Self { shares })
    }

    pub fn shares(&self) -> &[Share] {
        &self.shares
    }

    /// Cannot overflow: [`Allocation::new`] rejects shares that would.
    pub fn total(&self) -> Money {
        self.shares.iter().map(|s| s.amount).sum()
    }

    /// Share owed by `member`, if they take part in the expense.
    pub fn share_of(&self, member: UserId) -> Option<Money> {
        self.shares
            .iter()
            .find(|s| s.member == member)
            .map(|s| s.amount)
    }

    pub fn members(&self) -> impl Iterator<Item = UserId> + '_ {
        self.shares.iter().map(|s| s.member)
    }
}

impl ValueObject for Allocation {}

impl TryFrom<Vec<Share>> for Allocation {
    type Error = DomainError;

    fn try_from(value: Vec<Share>) -> Result<Self, Self::Error> {
        Allocation::new(value)
    }
}

impl From<Allocation> for Vec<Share> {
    fn from(value: Allocation) -> Self {
        value.shares
    }
}

/// Opaque handle to a receipt file; storage is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptRef(String);

impl ReceiptRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A recorded cost paid by one member and split among several.
///
/// Deserialization goes through [`Expense::new`], so a stored expense whose
/// allocation does not add up is rejected on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ExpenseRecord")]
pub struct Expense {
    id: ExpenseId,
    group_id: GroupId,
    description: String,
    amount: Money,
    category: String,
    payer: UserId,
    split_type: SplitType,
    allocation: Allocation,
    receipt: Option<ReceiptRef>,
    created_at: DateTime<Utc>,
}

impl Expense {
    /// Build an expense, checking that the allocation adds up to `amount`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ExpenseId,
        group_id: GroupId,
        description: impl Into<String>,
        amount: Money,
        payer: UserId,
        split_type: SplitType,
        allocation: Allocation,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let description = description.into().trim().to_string();
        if description.is_empty() {
            return Err(DomainError::invalid_input("description cannot be empty"));
        }
        if amount.is_negative() {
            return Err(DomainError::invalid_input("expense amount cannot be negative"));
        }
        let allocated = allocation.total();
        if allocated != amount {
            return Err(DomainError::split_mismatch(amount, allocated));
        }

        Ok(Self {
            id,
            group_id,
            description,
            amount,
            category: DEFAULT_CATEGORY.to_string(),
            payer,
            split_type,
            allocation,
            receipt: None,
            created_at,
        })
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        let category = category.into().trim().to_string();
        self.category = if category.is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            category
        };
        self
    }

    pub fn with_receipt(mut self, receipt: Option<ReceiptRef>) -> Self {
        self.receipt = receipt;
        self
    }

    pub fn id(&self) -> ExpenseId {
        self.id
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn payer(&self) -> UserId {
        self.payer
    }

    pub fn split_type(&self) -> SplitType {
        self.split_type
    }

    pub fn allocation(&self) -> &Allocation {
        &self.allocation
    }

    pub fn receipt(&self) -> Option<&ReceiptRef> {
        self.receipt.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether `user` paid for or owes a part of this expense.
    pub fn involves(&self, user: UserId) -> bool {
        self.payer == user || self.allocation.share_of(user).is_some()
    }
}

/// Serialized shape of [`Expense`].
#[derive(Deserialize)]
struct ExpenseRecord {
    id: ExpenseId,
    group_id: GroupId,
    description: String,
    amount: Money,
    category: String,
    payer: UserId,
    split_type: SplitType,
    allocation: Allocation,
    #[serde(default)]
    receipt: Option<ReceiptRef>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ExpenseRecord> for Expense {
    type Error = DomainError;

    fn try_from(record: ExpenseRecord) -> Result<Self, Self::Error> {
        Ok(Expense::new(
            record.id,
            record.group_id,
            record.description,
            record.amount,
            record.payer,
            record.split_type,
            record.allocation,
            record.created_at,
        )?
        .with_category(record.category)
        .with_receipt(record.receipt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn share(member: UserId, units: i64) -> Share {
        Share {
            member,
            amount: Money::from_minor(units),
        }
    }

    #[test]
    fn allocation_rejects_duplicates_negatives_and_empty() {
        let a = UserId::new();
        let b = UserId::new();

        assert!(Allocation::new(vec![]).is_err());
        assert!(Allocation::new(vec![share(a, 10), share(a, 5)]).is_err());
        assert!(Allocation::new(vec![share(a, 10), share(b, -1)]).is_err());

        let ok = Allocation::new(vec![share(a, 10), share(b, 0)]).unwrap();
        assert_eq!(ok.total(), Money::from_minor(10));
        assert_eq!(ok.share_of(b), Some(Money::ZERO));
    }

    #[test]
    fn expense_requires_allocation_to_match_amount() {
        let a = UserId::new();
        let b = UserId::new();
        let allocation = Allocation::new(vec![share(a, 40), share(b, 70)]).unwrap();

        let err = Expense::new(
            ExpenseId::new(),
            GroupId::new(),
            "Dinner",
            Money::from_minor(100),
            a,
            SplitType::Custom,
            allocation,
            Utc::now(),
        )
        .unwrap_err();

        assert_eq!(
            err,
            DomainError::SplitMismatch {
                expected: Money::from_minor(100),
                actual: Money::from_minor(110),
            }
        );
    }

    #[test]
    fn blank_category_falls_back_to_general() {
        let a = UserId::new();
        let expense = Expense::new(
            ExpenseId::new(),
            GroupId::new(),
            "Taxi",
            Money::from_minor(10),
            a,
            SplitType::Equal,
            Allocation::new(vec![share(a, 10)]).unwrap(),
            Utc::now(),
        )
        .unwrap()
        .with_category("  ");

        assert_eq!(expense.category(), DEFAULT_CATEGORY);
        assert!(expense.involves(a));
        assert!(!expense.involves(UserId::new()));
    }

    #[test]
    fn allocation_rejects_shares_that_overflow() {
        let a = UserId::new();
        let b = UserId::new();
        let err = Allocation::new(vec![share(a, i64::MAX), share(b, 1)]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn expense_survives_a_json_round_trip() {
        let a = UserId::new();
        let expense = Expense::new(
            ExpenseId::new(),
            GroupId::new(),
            "Groceries",
            Money::from_minor(250),
            a,
            SplitType::Equal,
            Allocation::new(vec![share(a, 250)]).unwrap(),
            Utc::now(),
        )
        .unwrap()
        .with_category("Food")
        .with_receipt(Some(ReceiptRef::new("receipts/1.png")));

        let json = serde_json::to_value(&expense).unwrap();
        assert_eq!(serde_json::from_value::<Expense>(json).unwrap(), expense);
    }

    #[test]
    fn expense_deserialization_rechecks_the_constructor_rules() {
        let a = UserId::new();
        let expense = Expense::new(
            ExpenseId::new(),
            GroupId::new(),
            "Dinner",
            Money::from_minor(100),
            a,
            SplitType::Equal,
            Allocation::new(vec![share(a, 100)]).unwrap(),
            Utc::now(),
        )
        .unwrap();

        let mut mismatched = serde_json::to_value(&expense).unwrap();
        mismatched["amount"] = serde_json::json!(150);
        let err = serde_json::from_value::<Expense>(mismatched).unwrap_err();
        assert!(err.to_string().contains("split amounts sum to 100 but the total is 150"));

        let mut blank = serde_json::to_value(&expense).unwrap();
        blank["description"] = serde_json::json!("   ");
        assert!(serde_json::from_value::<Expense>(blank).is_err());
    }

    #[test]
    fn allocation_deserialization_enforces_invariants() {
        let a = UserId::new();
        let json = serde_json::json!([
            { "member": a, "amount": 5 },
            { "member": a, "amount": 5 },
        ]);
        assert!(serde_json::from_value::<Allocation>(json).is_err());
    }
}
