use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use expenseshare_core::{Money, UserId};

use crate::group::Group;

/// Net position per member: positive is owed money, negative owes money.
///
/// Derived from a group's expenses and settlements; never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balances(BTreeMap<UserId, Money>);

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `member`; zero for members without an entry.
    pub fn get(&self, member: UserId) -> Money {
        self.0.get(&member).copied().unwrap_or_default()
    }

    pub fn contains(&self, member: UserId) -> bool {
        self.0.contains_key(&member)
    }

    /// Entries ordered by member id.
    pub fn iter(&self) -> impl Iterator<Item = (UserId, Money)> + '_ {
        self.0.iter().map(|(id, amount)| (*id, *amount))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ensure `member` has an entry, starting at zero.
    pub fn track(&mut self, member: UserId) {
        self.0.entry(member).or_default();
    }

    pub fn credit(&mut self, member: UserId, amount: Money) {
        *self.0.entry(member).or_default() += amount;
    }

    pub fn debit(&mut self, member: UserId, amount: Money) {
        *self.0.entry(member).or_default() -= amount;
    }

    /// Sum over all entries; zero for any balance derived from a group.
    pub fn total(&self) -> Money {
        self.0.values().sum()
    }

    pub fn is_settled(&self) -> bool {
        self.0.values().all(|amount| amount.is_zero())
    }

    /// Total owed to members with a positive balance.
    pub fn owed_to_sum(&self) -> Money {
        self.0.values().filter(|a| a.is_positive()).sum()
    }

    /// Total owed by members with a negative balance, as a positive amount.
    pub fn owed_by_sum(&self) -> Money {
        self.0.values().filter(|a| a.is_negative()).map(|a| a.abs()).sum()
    }

    /// Add every entry of `other` into `self`.
    pub fn merge(&mut self, other: &Balances) {
        for (member, amount) in other.iter() {
            self.credit(member, amount);
        }
    }

    pub fn into_inner(self) -> BTreeMap<UserId, Money> {
        self.0
    }
}

impl FromIterator<(UserId, Money)> for Balances {
    fn from_iter<T: IntoIterator<Item = (UserId, Money)>>(iter: T) -> Self {
        let mut balances = Balances::new();
        for (member, amount) in iter {
            balances.credit(member, amount);
        }
        balances
    }
}

impl From<BTreeMap<UserId, Money>> for Balances {
    fn from(value: BTreeMap<UserId, Money>) -> Self {
        Self(value)
    }
}

/// Net balance of every current member of `group`.
///
/// The payer of each expense is credited its total and every allocated member
/// is debited its share. A recorded settlement credits the payer and debits
/// the receiver. Members without activity appear with zero.
pub fn compute_balances(group: &Group) -> Balances {
    let mut balances = Balances::new();
    for member in group.member_ids() {
        balances.track(member);
    }

    for expense in group.expenses() {
        balances.credit(expense.payer(), expense.amount());
        for share in expense.allocation().shares() {
            balances.debit(share.member, share.amount);
        }
    }

    for settlement in group.settlements() {
        balances.credit(settlement.from(), settlement.amount());
        balances.debit(settlement.to(), settlement.amount());
    }

    balances
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    use expenseshare_core::{ExpenseId, GroupId, SettlementId};

    use crate::expense::{Expense, SplitType};
    use crate::group::{CreateGroup, GroupCommand, RecordExpense, RecordSettlement};
    use crate::member::Member;
    use crate::settlement::{Settlement, apply_transfers, suggest_settlements};
    use crate::split::{ShareSpec, compute_custom_split, compute_equal_split};

    fn group_of(names: &[&str]) -> (Group, Vec<UserId>) {
        let members: Vec<Member> = names
            .iter()
            .map(|n| Member::new(UserId::new(), *n).unwrap())
            .collect();
        let ids: Vec<UserId> = members.iter().map(Member::user_id).collect();
        let group_id = GroupId::new();
        let mut group = Group::empty(group_id);
        group
            .execute(&GroupCommand::CreateGroup(CreateGroup {
                group_id,
                name: "House".to_string(),
                color: None,
                created_by: ids[0],
                members,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        (group, ids)
    }

    fn record_equal(group: &mut Group, payer: UserId, units: i64) {
        let ids: Vec<UserId> = group.member_ids().collect();
        let expense = Expense::new(
            ExpenseId::new(),
            group.id_typed(),
            "Groceries",
            Money::from_minor(units),
            payer,
            SplitType::Equal,
            compute_equal_split(Money::from_minor(units), &ids).unwrap(),
            Utc::now(),
        )
        .unwrap();
        group
            .execute(&GroupCommand::RecordExpense(RecordExpense {
                group_id: group.id_typed(),
                expense,
            }))
            .unwrap();
    }

    #[test]
    fn three_way_equal_split_balances() {
        let (mut group, ids) = group_of(&["A", "B", "C"]);
        record_equal(&mut group, ids[0], 100);

        let b = compute_balances(&group);
        assert_eq!(b.get(ids[0]), Money::from_minor(66));
        assert_eq!(b.get(ids[1]), Money::from_minor(-33));
        assert_eq!(b.get(ids[2]), Money::from_minor(-33));
        assert_eq!(b.total(), Money::ZERO);
        assert_eq!(b.owed_to_sum(), Money::from_minor(66));
        assert_eq!(b.owed_by_sum(), Money::from_minor(66));
    }

    #[test]
    fn single_member_group_is_always_settled() {
        let (mut group, ids) = group_of(&["A"]);
        record_equal(&mut group, ids[0], 50);

        let b = compute_balances(&group);
        assert_eq!(b.len(), 1);
        assert_eq!(b.get(ids[0]), Money::ZERO);
        assert!(suggest_settlements(&b).is_empty());
    }

    #[test]
    fn members_without_activity_map_to_zero() {
        let (group, ids) = group_of(&["A", "B"]);
        let b = compute_balances(&group);
        assert!(b.contains(ids[1]));
        assert!(b.is_settled());
    }

    #[test]
    fn zero_total_expense_changes_nothing() {
        let (mut group, ids) = group_of(&["A", "B"]);
        record_equal(&mut group, ids[1], 0);
        assert!(compute_balances(&group).is_settled());
    }

    #[test]
    fn recorded_settlement_moves_balances_towards_zero() {
        let (mut group, ids) = group_of(&["A", "B"]);
        record_equal(&mut group, ids[0], 100);

        let settlement = Settlement::new(
            SettlementId::new(),
            ids[1],
            ids[0],
            Money::from_minor(50),
            Utc::now(),
        )
        .unwrap();
        group
            .execute(&GroupCommand::RecordSettlement(RecordSettlement {
                group_id: group.id_typed(),
                settlement,
            }))
            .unwrap();

        assert!(compute_balances(&group).is_settled());
    }

    #[test]
    fn merge_adds_entries() {
        let a = UserId::new();
        let mut left: Balances = [(a, Money::from_minor(5))].into_iter().collect();
        let right: Balances = [(a, Money::from_minor(-7))].into_iter().collect();
        left.merge(&right);
        assert_eq!(left.get(a), Money::from_minor(-2));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Equal { payer: usize, units: i64 },
        Weighted { payer: usize, units: i64, weights: Vec<i64> },
    }

    fn op_strategy(n: usize) -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..n, 0i64..1_000_000).prop_map(|(payer, units)| Op::Equal { payer, units }),
            (0..n, 0i64..1_000_000, prop::collection::vec(1i64..20, n))
                .prop_map(|(payer, units, weights)| Op::Weighted { payer, units, weights }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: balances sum to zero, are idempotent, and can be settled.
        #[test]
        fn balances_are_conserved(
            ops in (1usize..6).prop_flat_map(|n| (Just(n), prop::collection::vec(op_strategy(n), 0..20)))
        ) {
            let (n, ops) = ops;
            let names: Vec<String> = (0..n).map(|i| format!("m{i}")).collect();
            let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let (mut group, ids) = group_of(&name_refs);

            for op in ops {
                match op {
                    Op::Equal { payer, units } => record_equal(&mut group, ids[payer], units),
                    Op::Weighted { payer, units, weights } => {
                        let spec = ShareSpec::Weights(ids.iter().copied().zip(weights).collect());
                        let allocation = compute_custom_split(Money::from_minor(units), &spec).unwrap();
                        let expense = Expense::new(
                            ExpenseId::new(),
                            group.id_typed(),
                            "Weighted",
                            Money::from_minor(units),
                            ids[payer],
                            SplitType::Custom,
                            allocation,
                            Utc::now(),
                        )
                        .unwrap();
                        group
                            .execute(&GroupCommand::RecordExpense(RecordExpense {
                                group_id: group.id_typed(),
                                expense,
                            }))
                            .unwrap();
                    }
                }
            }

            let first = compute_balances(&group);
            let second = compute_balances(&group);
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.total(), Money::ZERO);
            prop_assert_eq!(first.len(), n);

            let transfers = suggest_settlements(&first);
            prop_assert!(apply_transfers(&first, &transfers).is_settled());
        }
    }
}
