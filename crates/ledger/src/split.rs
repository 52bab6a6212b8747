//! Turning a total into per-member shares.
//!
//! Every split distributes the indivisible remainder one minor unit at a
//! time, front to back, in the order the members were given. The same input
//! always yields the same allocation.

use serde::{Deserialize, Serialize};

use expenseshare_core::{DomainError, DomainResult, Money, UserId};

use crate::expense::{Allocation, Share};

/// Sum of percentage weights (basis points) for a complete percentage split.
pub const FULL_PERCENT_BPS: i64 = 10_000;

/// Input for a custom split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareSpec {
    /// Exact owed amount per member; must add up to the total.
    Amounts(Vec<(UserId, Money)>),
    /// Relative weights; shares are proportional.
    Weights(Vec<(UserId, i64)>),
    /// Percentages in basis points (2500 = 25%); must add up to 100%.
    Percentages(Vec<(UserId, i64)>),
}

/// Split `total` as evenly as minor units allow among `members`.
pub fn compute_equal_split(total: Money, members: &[UserId]) -> DomainResult<Allocation> {
    ensure_total(total)?;
    if members.is_empty() {
        return Err(DomainError::invalid_input("cannot split among zero members"));
    }
    ensure_unique(members.iter().copied())?;

    let weights: Vec<(UserId, i64)> = members.iter().map(|m| (*m, 1)).collect();
    proportional(total, &weights)
}

/// Split `total` according to explicit amounts, weights or percentages.
pub fn compute_custom_split(total: Money, spec: &ShareSpec) -> DomainResult<Allocation> {
    ensure_total(total)?;

    match spec {
        ShareSpec::Amounts(amounts) => {
            if amounts.is_empty() {
                return Err(DomainError::invalid_input("cannot split among zero members"));
            }
            ensure_unique(amounts.iter().map(|(m, _)| *m))?;
            if let Some((member, _)) = amounts.iter().find(|(_, a)| a.is_negative()) {
                return Err(DomainError::invalid_input(format!(
                    "amount for {member} is negative"
                )));
            }

            let sum = Money::checked_sum(amounts.iter().map(|(_, a)| *a))
                .ok_or_else(|| DomainError::invalid_input("amount out of range"))?;
            if sum != total {
                return Err(DomainError::split_mismatch(total, sum));
            }

            Allocation::new(
                amounts
                    .iter()
                    .map(|(member, amount)| Share {
                        member: *member,
                        amount: *amount,
                    })
                    .collect(),
            )
        }
        ShareSpec::Weights(weights) => {
            validate_weights(weights)?;
            proportional(total, weights)
        }
        ShareSpec::Percentages(bps) => {
            validate_weights(bps)?;
            let sum = bps
                .iter()
                .try_fold(0i64, |acc, (_, w)| acc.checked_add(*w))
                .ok_or_else(|| DomainError::invalid_input("percentage out of range"))?;
            if sum != FULL_PERCENT_BPS {
                return Err(DomainError::invalid_input(format!(
                    "percentages add up to {}.{:02}%, expected 100%",
                    sum / 100,
                    sum % 100
                )));
            }
            proportional(total, bps)
        }
    }
}

fn ensure_total(total: Money) -> DomainResult<()> {
    if total.is_negative() {
        return Err(DomainError::invalid_input("total cannot be negative"));
    }
    Ok(())
}

fn ensure_unique(members: impl Iterator<Item = UserId>) -> DomainResult<()> {
    let mut seen = std::collections::HashSet::new();
    for member in members {
        if !seen.insert(member) {
            return Err(DomainError::invalid_input(format!(
                "member {member} appears twice"
            )));
        }
    }
    Ok(())
}

fn validate_weights(weights: &[(UserId, i64)]) -> DomainResult<()> {
    if weights.is_empty() {
        return Err(DomainError::invalid_input("cannot split among zero members"));
    }
    ensure_unique(weights.iter().map(|(m, _)| *m))?;
    if let Some((member, _)) = weights.iter().find(|(_, w)| *w < 0) {
        return Err(DomainError::invalid_input(format!(
            "weight for {member} is negative"
        )));
    }
    if weights.iter().all(|(_, w)| *w == 0) {
        return Err(DomainError::invalid_input("all weights are zero"));
    }
    Ok(())
}

/// Floor of `total * w / W` per member, then the leftover units handed out
/// one at a time to members with a positive weight, in input order.
fn proportional(total: Money, weights: &[(UserId, i64)]) -> DomainResult<Allocation> {
    let total_units = i128::from(total.minor_units());
    let weight_sum: i128 = weights.iter().map(|(_, w)| i128::from(*w)).sum();

    let mut shares: Vec<Share> = weights
        .iter()
        .map(|(member, w)| {
            let units = total_units * i128::from(*w) / weight_sum;
            Share {
                member: *member,
                amount: Money::from_minor(units as i64),
            }
        })
        .collect();

    let allocated: i128 = shares.iter().map(|s| i128::from(s.amount.minor_units())).sum();
    let mut remainder = total_units - allocated;

    // Each floor loses < 1 unit, so the remainder is smaller than the number
    // of positively weighted members and one pass is enough.
    for (share, (_, w)) in shares.iter_mut().zip(weights) {
        if remainder == 0 {
            break;
        }
        if *w > 0 {
            share.amount += Money::from_minor(1);
            remainder -= 1;
        }
    }
    debug_assert_eq!(remainder, 0);

    Allocation::new(shares)
}
