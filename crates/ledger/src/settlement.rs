//! Settling up: recorded payments and suggested transfers.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use expenseshare_core::{DomainError, DomainResult, Money, SettlementId, UserId};

use crate::balance::Balances;

/// A payment of `amount` from `from` (the debtor) to `to` (the creditor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: UserId,
    pub to: UserId,
    pub amount: Money,
}

/// A payment that actually happened inside a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SettlementRecord")]
pub struct Settlement {
    id: SettlementId,
    from: UserId,
    to: UserId,
    amount: Money,
    settled_at: DateTime<Utc>,
}

impl Settlement {
    pub fn new(
        id: SettlementId,
        from: UserId,
        to: UserId,
        amount: Money,
        settled_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if !amount.is_positive() {
            return Err(DomainError::invalid_input("settlement amount must be positive"));
        }
        if from == to {
            return Err(DomainError::invalid_input("cannot settle with yourself"));
        }
        Ok(Self {
            id,
            from,
            to,
            amount,
            settled_at,
        })
    }

    pub fn id(&self) -> SettlementId {
        self.id
    }

    pub fn from(&self) -> UserId {
        self.from
    }

    pub fn to(&self) -> UserId {
        self.to
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn settled_at(&self) -> DateTime<Utc> {
        self.settled_at
    }

    pub fn as_transfer(&self) -> Transfer {
        Transfer {
            from: self.from,
            to: self.to,
            amount: self.amount,
        }
    }
}

#[derive(Deserialize)]
struct SettlementRecord {
    id: SettlementId,
    from: UserId,
    to: UserId,
    amount: Money,
    settled_at: DateTime<Utc>,
}

impl TryFrom<SettlementRecord> for Settlement {
    type Error = DomainError;

    fn try_from(record: SettlementRecord) -> Result<Self, Self::Error> {
        Settlement::new(record.id, record.from, record.to, record.amount, record.settled_at)
    }
}

/// Greedy settlement plan: repeatedly pay from the largest debtor to the
/// largest creditor, ties going to the smaller member id.
///
/// When the balances sum to zero, applying the result zeroes every entry.
/// Otherwise the side with money left over keeps it.
pub fn suggest_settlements(balances: &Balances) -> Vec<Transfer> {
    // Max-heaps on (amount, Reverse(id)): biggest amount first, then smallest id.
    let mut debtors: BinaryHeap<(Money, Reverse<UserId>)> = BinaryHeap::new();
    let mut creditors: BinaryHeap<(Money, Reverse<UserId>)> = BinaryHeap::new();

    for (member, amount) in balances.iter() {
        if amount.is_negative() {
            debtors.push((amount.abs(), Reverse(member)));
        } else if amount.is_positive() {
            creditors.push((amount, Reverse(member)));
        }
    }

    let mut transfers = Vec::new();
    while let (Some((owes, Reverse(debtor))), Some((owed, Reverse(creditor)))) =
        (debtors.pop(), creditors.pop())
    {
        let amount = owes.min(owed);
        transfers.push(Transfer {
            from: debtor,
            to: creditor,
            amount,
        });

        if owes > amount {
            debtors.push((owes - amount, Reverse(debtor)));
        }
        if owed > amount {
            creditors.push((owed - amount, Reverse(creditor)));
        }
    }

    transfers
}

/// Balances after every transfer has been paid.
pub fn apply_transfers(balances: &Balances, transfers: &[Transfer]) -> Balances {
    let mut result = balances.clone();
    for transfer in transfers {
        result.credit(transfer.from, transfer.amount);
        result.debit(transfer.to, transfer.amount);
    }
    result
}

/// One user's view of a set of transfers: counterpart → signed amount.
///
/// Positive means the counterpart owes `user`; negative means `user` owes
/// the counterpart. Counterparts that net out to zero are omitted.
pub fn personal_balances(user: UserId, transfers: &[Transfer]) -> BTreeMap<UserId, Money> {
    let mut per_counterpart: BTreeMap<UserId, Money> = BTreeMap::new();
    for transfer in transfers {
        if transfer.to == user {
            *per_counterpart.entry(transfer.from).or_default() += transfer.amount;
        } else if transfer.from == user {
            *per_counterpart.entry(transfer.to).or_default() -= transfer.amount;
        }
    }
    per_counterpart.retain(|_, amount| !amount.is_zero());
    per_counterpart
}
