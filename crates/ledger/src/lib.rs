//! Ledger/Splitter for shared group expenses (event-sourced group aggregate).
//!
//! Pure domain logic only: no IO, no persistence, no clocks. Callers pass
//! timestamps in and decide where events are stored.

pub mod analytics;
pub mod balance;
pub mod expense;
pub mod group;
pub mod member;
pub mod settlement;
pub mod split;

pub use analytics::{CategoryTotals, MonthlySummary, category_breakdown, group_category_totals, monthly_summary};
pub use balance::{Balances, compute_balances};
pub use expense::{Allocation, DEFAULT_CATEGORY, Expense, ReceiptRef, Share, SplitType};
pub use group::{
    AddMember, CreateGroup, DeleteExpense, EditExpense, ExpenseDeleted, ExpenseEdited,
    ExpenseRecorded, Group, GroupCommand, GroupCreated, GroupEvent, MemberAdded, RecordExpense,
    RecordSettlement, SettlementRecorded, DEFAULT_GROUP_COLOR,
};
pub use member::Member;
pub use settlement::{Settlement, Transfer, apply_transfers, personal_balances, suggest_settlements};
pub use split::{FULL_PERCENT_BPS, ShareSpec, compute_custom_split, compute_equal_split};
