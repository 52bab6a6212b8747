//! Application service the GUI calls instead of touching storage directly.
//!
//! Every method takes the caller's [`Session`] explicitly. Group reads and
//! writes require the session user to be a member of the group; everything
//! that changes a group goes through the [`CommandDispatcher`].

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use expenseshare_auth::{Session, UserAccount, normalize_username};
use expenseshare_core::{Currency, DomainError, ExpenseId, GroupId, Money, SettlementId, UserId};
use expenseshare_infra::{AccountStore, CommandDispatcher, EventStore};
use expenseshare_ledger::{
    AddMember, Balances, CategoryTotals, CreateGroup, DeleteExpense, EditExpense, Expense, Group, GroupCommand,
    Member, RecordExpense, RecordSettlement, Settlement, Transfer, category_breakdown, compute_balances,
    group_category_totals, monthly_summary, personal_balances, suggest_settlements,
};

use crate::errors::{ServiceError, ServiceResult};
use crate::export::write_expenses_csv;
use crate::types::{Dashboard, ExpenseEntry, NewExpense};

/// Facade over a store that keeps both group streams and accounts.
#[derive(Debug)]
pub struct ExpenseShare<S> {
    store: Arc<S>,
    dispatcher: CommandDispatcher<Arc<S>>,
}

impl<S> Clone for ExpenseShare<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<S> ExpenseShare<S>
where
    S: EventStore + AccountStore,
{
    pub fn new(store: S) -> Self {
        let store = Arc::new(store);
        Self {
            dispatcher: CommandDispatcher::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ---- accounts ----

    /// Create an account and sign it in.
    #[instrument(skip(self, password, email), err)]
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
        currency: Currency,
    ) -> ServiceResult<Session> {
        let account = UserAccount::register(username, password, email, currency, Utc::now())?;
        self.store.insert_user(&account).await?;
        info!(user_id = %account.id(), "account registered");
        Ok(Session::for_account(&account))
    }

    /// Unknown usernames and wrong passwords are both `Unauthorized`.
    #[instrument(skip(self, password), err)]
    pub async fn login(&self, username: &str, password: &str) -> ServiceResult<Session> {
        let username = normalize_username(username).map_err(|_| ServiceError::Unauthorized)?;
        let account = self
            .store
            .find_by_username(&username)
            .await?
            .ok_or(ServiceError::Unauthorized)?;
        let session = account.authenticate(password)?;
        info!(user_id = %session.user_id, "signed in");
        Ok(session)
    }

    pub async fn list_users(&self) -> ServiceResult<Vec<UserAccount>> {
        Ok(self.store.list_users().await?)
    }

    /// Befriend the user called `friend_username`.
    #[instrument(skip(self, session), fields(user_id = %session.user_id), err)]
    pub async fn add_friend(&self, session: &Session, friend_username: &str) -> ServiceResult<UserAccount> {
        let friend = self
            .store
            .find_by_username(friend_username.trim())
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("user '{}'", friend_username.trim())))?;
        self.store.add_friend(session.user_id, friend.id()).await?;
        Ok(friend)
    }

    pub async fn friends(&self, session: &Session) -> ServiceResult<Vec<UserAccount>> {
        Ok(self.store.friends(session.user_id).await?)
    }

    // ---- groups ----

    /// Create a group; the creator is always its first member.
    #[instrument(skip(self, session, members), fields(user_id = %session.user_id), err)]
    pub async fn create_group(
        &self,
        session: &Session,
        name: &str,
        members: &[UserId],
        color: Option<&str>,
    ) -> ServiceResult<Group> {
        let mut roster = vec![Member::new(session.user_id, session.username.clone())?];
        for id in members {
            if roster.iter().any(|m| m.user_id() == *id) {
                continue;
            }
            roster.push(self.member_for(*id).await?);
        }

        let (group, _) = self
            .dispatcher
            .dispatch(
                GroupCommand::CreateGroup(CreateGroup {
                    group_id: GroupId::new(),
                    name: name.to_string(),
                    color: color.map(str::to_string),
                    created_by: session.user_id,
                    members: roster,
                    occurred_at: Utc::now(),
                }),
                Group::empty,
            )
            .await?;
        info!(group_id = %group.id_typed(), members = group.members().len(), "group created");
        Ok(group)
    }

    #[instrument(skip(self, session), fields(user_id = %session.user_id), err)]
    pub async fn add_member(&self, session: &Session, group_id: GroupId, user: UserId) -> ServiceResult<Group> {
        self.group(session, group_id).await?;
        let member = self.member_for(user).await?;

        let (group, _) = self
            .dispatcher
            .dispatch(
                GroupCommand::AddMember(AddMember {
                    group_id,
                    member,
                    occurred_at: Utc::now(),
                }),
                Group::empty,
            )
            .await?;
        Ok(group)
    }

    /// A group the session user belongs to.
    pub async fn group(&self, session: &Session, group_id: GroupId) -> ServiceResult<Group> {
        let group: Group = self.dispatcher.load(group_id, Group::empty).await?;
        if !group.is_created() {
            return Err(ServiceError::not_found(format!("group {group_id}")));
        }
        if !group.is_member(session.user_id) {
            return Err(ServiceError::Unauthorized);
        }
        Ok(group)
    }

    /// The session user's groups, newest first.
    pub async fn groups_for(&self, session: &Session) -> ServiceResult<Vec<Group>> {
        let mut groups = Vec::new();
        for group_id in self.store.list_streams().await?.into_iter().rev() {
            let group: Group = self.dispatcher.load(group_id, Group::empty).await?;
            if group.is_created() && group.is_member(session.user_id) {
                groups.push(group);
            }
        }
        groups.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(groups)
    }

    // ---- expenses ----

    #[instrument(skip(self, session, new), fields(user_id = %session.user_id, group_id = %new.group_id), err)]
    pub async fn add_expense(&self, session: &Session, new: NewExpense) -> ServiceResult<Expense> {
        let group = self.group(session, new.group_id).await?;
        let created_at = new.created_at.unwrap_or_else(Utc::now);
        let expense = build_expense(session, &group, ExpenseId::new(), new, created_at)?;

        self.dispatcher
            .dispatch(
                GroupCommand::RecordExpense(RecordExpense {
                    group_id: group.id_typed(),
                    expense: expense.clone(),
                }),
                Group::empty,
            )
            .await?;
        info!(expense_id = %expense.id(), amount = %expense.amount(), "expense recorded");
        Ok(expense)
    }

    /// Replace an expense; the creation time is kept unless the form sets one.
    #[instrument(skip(self, session, new), fields(user_id = %session.user_id, group_id = %new.group_id), err)]
    pub async fn edit_expense(
        &self,
        session: &Session,
        expense_id: ExpenseId,
        new: NewExpense,
    ) -> ServiceResult<Expense> {
        let group = self.group(session, new.group_id).await?;
        let existing = group
            .expense(expense_id)
            .ok_or_else(|| ServiceError::not_found(format!("expense {expense_id}")))?;
        let created_at = new.created_at.unwrap_or(existing.created_at());
        let expense = build_expense(session, &group, expense_id, new, created_at)?;

        self.dispatcher
            .dispatch(
                GroupCommand::EditExpense(EditExpense {
                    group_id: group.id_typed(),
                    expense: expense.clone(),
                    occurred_at: Utc::now(),
                }),
                Group::empty,
            )
            .await?;
        Ok(expense)
    }

    #[instrument(skip(self, session), fields(user_id = %session.user_id), err)]
    pub async fn delete_expense(&self, session: &Session, group_id: GroupId, expense_id: ExpenseId) -> ServiceResult<()> {
        let group = self.group(session, group_id).await?;
        if group.expense(expense_id).is_none() {
            return Err(ServiceError::not_found(format!("expense {expense_id}")));
        }

        self.dispatcher
            .dispatch(
                GroupCommand::DeleteExpense(DeleteExpense {
                    group_id,
                    expense_id,
                    occurred_at: Utc::now(),
                }),
                Group::empty,
            )
            .await?;
        Ok(())
    }

    /// A group's expenses, newest first.
    pub async fn group_expenses(&self, session: &Session, group_id: GroupId) -> ServiceResult<Vec<Expense>> {
        let group = self.group(session, group_id).await?;
        Ok(newest_first(group.expenses().iter().cloned()))
    }

    /// Expenses the user paid for or shares in, across all groups, newest first.
    pub async fn user_expenses(&self, session: &Session, limit: Option<usize>) -> ServiceResult<Vec<ExpenseEntry>> {
        let groups = self.groups_for(session).await?;

        let mut names: HashMap<(GroupId, UserId), String> = HashMap::new();
        let mut group_names: HashMap<GroupId, String> = HashMap::new();
        for group in &groups {
            group_names.insert(group.id_typed(), group.name().to_string());
            for member in group.members() {
                names.insert((group.id_typed(), member.user_id()), member.display_name().to_string());
            }
        }

        let involved = groups
            .iter()
            .flat_map(|g| g.expenses().iter())
            .filter(|e| e.involves(session.user_id))
            .cloned();
        let mut expenses = newest_first(involved);
        if let Some(limit) = limit {
            expenses.truncate(limit);
        }

        Ok(expenses
            .into_iter()
            .map(|expense| ExpenseEntry {
                group_name: group_names.get(&expense.group_id()).cloned().unwrap_or_default(),
                payer_name: names
                    .get(&(expense.group_id(), expense.payer()))
                    .cloned()
                    .unwrap_or_else(|| expense.payer().to_string()),
                expense,
            })
            .collect())
    }

    // ---- balances ----

    pub async fn group_balances(&self, session: &Session, group_id: GroupId) -> ServiceResult<Balances> {
        let group = self.group(session, group_id).await?;
        Ok(compute_balances(&group))
    }

    /// Suggested transfers that would settle the group.
    pub async fn group_settlements(&self, session: &Session, group_id: GroupId) -> ServiceResult<Vec<Transfer>> {
        let group = self.group(session, group_id).await?;
        Ok(suggest_settlements(&compute_balances(&group)))
    }

    /// Counterpart → signed amount across all of the user's groups.
    ///
    /// Positive means the counterpart owes the user.
    pub async fn personal_balances(&self, session: &Session) -> ServiceResult<BTreeMap<UserId, Money>> {
        let mut totals: BTreeMap<UserId, Money> = BTreeMap::new();
        for group in self.groups_for(session).await? {
            for (counterpart, amount) in personal_view(session.user_id, &group) {
                *totals.entry(counterpart).or_default() += amount;
            }
        }
        totals.retain(|_, amount| !amount.is_zero());
        Ok(totals)
    }

    /// Record a payment between the user and `counterpart` in one group.
    ///
    /// The direction follows who owes whom; `amount` defaults to the whole
    /// outstanding amount and may not exceed it.
    #[instrument(skip(self, session), fields(user_id = %session.user_id), err)]
    pub async fn settle_up(
        &self,
        session: &Session,
        group_id: GroupId,
        counterpart: UserId,
        amount: Option<Money>,
    ) -> ServiceResult<Settlement> {
        let group = self.group(session, group_id).await?;
        let outstanding = personal_view(session.user_id, &group)
            .get(&counterpart)
            .copied()
            .unwrap_or_default();
        if outstanding.is_zero() {
            return Err(ServiceError::InvalidInput(format!(
                "nothing to settle with {counterpart} in this group"
            )));
        }

        let amount = amount.unwrap_or(outstanding.abs());
        if !amount.is_positive() {
            return Err(DomainError::invalid_input("settlement amount must be positive").into());
        }
        if amount > outstanding.abs() {
            return Err(ServiceError::InvalidInput(format!(
                "amount {amount} exceeds the outstanding {}",
                outstanding.abs()
            )));
        }

        let (from, to) = if outstanding.is_positive() {
            (counterpart, session.user_id)
        } else {
            (session.user_id, counterpart)
        };
        let settlement = Settlement::new(SettlementId::new(), from, to, amount, Utc::now())?;

        self.dispatcher
            .dispatch(
                GroupCommand::RecordSettlement(RecordSettlement {
                    group_id,
                    settlement: settlement.clone(),
                }),
                Group::empty,
            )
            .await?;
        info!(from = %from, to = %to, amount = %amount, "settlement recorded");
        Ok(settlement)
    }

    // ---- analytics ----

    pub async fn dashboard(&self, session: &Session, now: DateTime<Utc>) -> ServiceResult<Dashboard> {
        let groups = self.groups_for(session).await?;
        let summary = monthly_summary(session.user_id, groups.iter().flat_map(|g| g.expenses()), now);

        let personal = self.personal_balances(session).await?;
        let owed_to_you: Money = personal.values().filter(|a| a.is_positive()).sum();
        let you_owe: Money = personal
            .values()
            .filter(|a| a.is_negative())
            .map(|a| a.abs())
            .sum();

        Ok(Dashboard {
            currency: session.currency,
            this_month: summary.current_month,
            last_month: summary.previous_month,
            owed_to_you,
            you_owe,
        })
    }

    /// The user's shares per category across all groups.
    pub async fn category_breakdown(&self, session: &Session) -> ServiceResult<CategoryTotals> {
        let groups = self.groups_for(session).await?;
        Ok(category_breakdown(session.user_id, groups.iter().flat_map(|g| g.expenses())))
    }

    pub async fn group_category_totals(&self, session: &Session, group_id: GroupId) -> ServiceResult<CategoryTotals> {
        let group = self.group(session, group_id).await?;
        Ok(group_category_totals(group.expenses()))
    }

    // ---- export ----

    /// Write the user's expense history as CSV; returns the number of rows.
    #[instrument(skip(self, session, writer), fields(user_id = %session.user_id), err)]
    pub async fn export_csv<W: Write>(&self, session: &Session, writer: W) -> ServiceResult<usize> {
        let entries = self.user_expenses(session, None).await?;
        Ok(write_expenses_csv(writer, session.currency, &entries)?)
    }

    async fn member_for(&self, user: UserId) -> ServiceResult<Member> {
        let account = self
            .store
            .find_by_id(user)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("user {user}")))?;
        Ok(Member::new(account.id(), account.username())?)
    }
}

fn build_expense(
    session: &Session,
    group: &Group,
    id: ExpenseId,
    new: NewExpense,
    created_at: DateTime<Utc>,
) -> ServiceResult<Expense> {
    let allocation = new.split.allocate(new.amount, group)?;
    let mut expense = Expense::new(
        id,
        group.id_typed(),
        new.description,
        new.amount,
        new.payer.unwrap_or(session.user_id),
        new.split.split_type(),
        allocation,
        created_at,
    )?
    .with_receipt(new.receipt);
    if let Some(category) = new.category {
        expense = expense.with_category(category);
    }
    Ok(expense)
}

/// Stable newest-first order; among equal timestamps the later-recorded comes first.
fn newest_first(expenses: impl Iterator<Item = Expense>) -> Vec<Expense> {
    let mut expenses: Vec<Expense> = expenses.collect();
    expenses.reverse();
    expenses.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    expenses
}

fn personal_view(user: UserId, group: &Group) -> BTreeMap<UserId, Money> {
    personal_balances(user, &suggest_settlements(&compute_balances(group)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use expenseshare_infra::{InMemoryStore, SqliteStore};
    use expenseshare_ledger::SplitType;

    use crate::types::SplitRequest;

    struct Fixture<S> {
        app: ExpenseShare<S>,
        alice: Session,
        bob: Session,
        carol: Session,
    }

    async fn fixture<S: EventStore + AccountStore>(store: S) -> Fixture<S> {
        let app = ExpenseShare::new(store);
        let alice = app.register("alice", "pw-alice", None, Currency::USD).await.unwrap();
        let bob = app.register("bob", "pw-bob", None, Currency::USD).await.unwrap();
        let carol = app.register("carol", "pw-carol", None, Currency::EUR).await.unwrap();
        Fixture { app, alice, bob, carol }
    }

    async fn trip<S: EventStore + AccountStore>(f: &Fixture<S>) -> Group {
        f.app
            .create_group(&f.alice, "Trip", &[f.bob.user_id, f.carol.user_id], None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn register_and_login() {
        let f = fixture(InMemoryStore::new()).await;

        let session = f.app.login("  alice ", "pw-alice").await.unwrap();
        assert_eq!(session, f.alice);

        assert!(matches!(f.app.login("alice", "nope").await, Err(ServiceError::Unauthorized)));
        assert!(matches!(f.app.login("mallory", "pw").await, Err(ServiceError::Unauthorized)));
        assert!(matches!(
            f.app.register("alice", "another", None, Currency::USD).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            f.app.register("dave", "pw", None, Currency::USD).await,
            Err(ServiceError::InvalidInput(_))
        ));

        let names: Vec<String> = f
            .app
            .list_users()
            .await
            .unwrap()
            .iter()
            .map(|u| u.username().to_string())
            .collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }

    #[tokio::test]
    async fn friends_by_username() {
        let f = fixture(InMemoryStore::new()).await;

        let bob = f.app.add_friend(&f.alice, "bob").await.unwrap();
        assert_eq!(bob.id(), f.bob.user_id);
        f.app.add_friend(&f.bob, "alice").await.unwrap();

        assert_eq!(f.app.friends(&f.alice).await.unwrap().len(), 1);
        assert_eq!(f.app.friends(&f.bob).await.unwrap()[0].id(), f.alice.user_id);
        assert!(matches!(f.app.add_friend(&f.alice, "alice").await, Err(ServiceError::InvalidInput(_))));
        assert!(matches!(f.app.add_friend(&f.alice, "zed").await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn creator_is_first_member_and_groups_are_private() {
        let f = fixture(InMemoryStore::new()).await;
        let group = f
            .app
            .create_group(&f.alice, "Flat", &[f.bob.user_id, f.alice.user_id], Some(" "))
            .await
            .unwrap();

        let ids: Vec<UserId> = group.member_ids().collect();
        assert_eq!(ids, vec![f.alice.user_id, f.bob.user_id]);
        assert_eq!(group.color(), expenseshare_ledger::DEFAULT_GROUP_COLOR);

        assert!(matches!(
            f.app.group(&f.carol, group.id_typed()).await,
            Err(ServiceError::Unauthorized)
        ));
        assert!(matches!(
            f.app.group(&f.carol, GroupId::new()).await,
            Err(ServiceError::NotFound(_))
        ));

        let group = f.app.add_member(&f.bob, group.id_typed(), f.carol.user_id).await.unwrap();
        assert!(group.is_member(f.carol.user_id));
        assert!(matches!(
            f.app.add_member(&f.bob, group.id_typed(), f.carol.user_id).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn groups_are_listed_newest_first() {
        let f = fixture(InMemoryStore::new()).await;
        let first = f.app.create_group(&f.alice, "First", &[], None).await.unwrap();
        let second = f.app.create_group(&f.alice, "Second", &[f.bob.user_id], None).await.unwrap();

        let mine: Vec<GroupId> = f
            .app
            .groups_for(&f.alice)
            .await
            .unwrap()
            .iter()
            .map(|g| g.id_typed())
            .collect();
        assert_eq!(mine, vec![second.id_typed(), first.id_typed()]);
        assert_eq!(f.app.groups_for(&f.bob).await.unwrap().len(), 1);
        assert!(f.app.groups_for(&f.carol).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn equal_expense_produces_expected_balances() {
        let f = fixture(InMemoryStore::new()).await;
        let group = trip(&f).await;

        let expense = f
            .app
            .add_expense(&f.alice, NewExpense::equal(group.id_typed(), "Hotel", Money::from_minor(100)))
            .await
            .unwrap();
        assert_eq!(expense.split_type(), SplitType::Equal);
        assert_eq!(expense.allocation().share_of(f.alice.user_id), Some(Money::from_minor(34)));

        let balances = f.app.group_balances(&f.bob, group.id_typed()).await.unwrap();
        assert_eq!(balances.get(f.alice.user_id), Money::from_minor(66));
        assert_eq!(balances.get(f.bob.user_id), Money::from_minor(-33));
        assert_eq!(balances.get(f.carol.user_id), Money::from_minor(-33));

        let transfers = f.app.group_settlements(&f.alice, group.id_typed()).await.unwrap();
        assert_eq!(transfers.len(), 2);
        assert!(transfers.iter().all(|t| t.to == f.alice.user_id));
    }

    #[tokio::test]
    async fn custom_split_must_add_up() {
        let f = fixture(InMemoryStore::new()).await;
        let group = trip(&f).await;

        let bad = NewExpense::equal(group.id_typed(), "Taxi", Money::from_minor(100)).split(SplitRequest::Exact(vec![
            (f.alice.user_id, Money::from_minor(40)),
            (f.bob.user_id, Money::from_minor(70)),
        ]));
        assert!(matches!(
            f.app.add_expense(&f.alice, bad).await,
            Err(ServiceError::SplitMismatch { .. })
        ));

        let percent = NewExpense::equal(group.id_typed(), "Taxi", Money::from_minor(1000))
            .paid_by(f.bob.user_id)
            .split(SplitRequest::Percent(vec![(f.alice.user_id, 2500), (f.bob.user_id, 7500)]));
        let expense = f.app.add_expense(&f.alice, percent).await.unwrap();
        assert_eq!(expense.payer(), f.bob.user_id);
        assert_eq!(expense.allocation().share_of(f.alice.user_id), Some(Money::from_minor(250)));

        let outsider = NewExpense::equal(group.id_typed(), "Gift", Money::from_minor(10))
            .split(SplitRequest::Equal(vec![f.alice.user_id, UserId::new()]));
        assert!(matches!(
            f.app.add_expense(&f.alice, outsider).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn edit_and_delete_expenses() {
        let f = fixture(InMemoryStore::new()).await;
        let group = trip(&f).await;
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let original = f
            .app
            .add_expense(
                &f.alice,
                NewExpense::equal(group.id_typed(), "Groceries", Money::from_minor(300)).at(at),
            )
            .await
            .unwrap();

        let edited = f
            .app
            .edit_expense(
                &f.bob,
                original.id(),
                NewExpense::equal(group.id_typed(), "Groceries", Money::from_minor(600))
                    .paid_by(f.alice.user_id)
                    .with_category("Food"),
            )
            .await
            .unwrap();
        assert_eq!(edited.id(), original.id());
        assert_eq!(edited.created_at(), at);
        assert_eq!(edited.category(), "Food");

        let expenses = f.app.group_expenses(&f.carol, group.id_typed()).await.unwrap();
        assert_eq!(expenses, vec![edited.clone()]);

        f.app.delete_expense(&f.alice, group.id_typed(), edited.id()).await.unwrap();
        assert!(f.app.group_balances(&f.alice, group.id_typed()).await.unwrap().is_settled());
        assert!(matches!(
            f.app.delete_expense(&f.alice, group.id_typed(), edited.id()).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn settle_up_follows_the_debt_direction() {
        let f = fixture(InMemoryStore::new()).await;
        let group = trip(&f).await;
        f.app
            .add_expense(&f.alice, NewExpense::equal(group.id_typed(), "Hotel", Money::from_minor(300)))
            .await
            .unwrap();

        let personal = f.app.personal_balances(&f.bob).await.unwrap();
        assert_eq!(personal.get(&f.alice.user_id), Some(&Money::from_minor(-100)));

        assert!(matches!(
            f.app
                .settle_up(&f.bob, group.id_typed(), f.alice.user_id, Some(Money::from_minor(150)))
                .await,
            Err(ServiceError::InvalidInput(_))
        ));

        let partial = f
            .app
            .settle_up(&f.alice, group.id_typed(), f.bob.user_id, Some(Money::from_minor(40)))
            .await
            .unwrap();
        assert_eq!((partial.from(), partial.to()), (f.bob.user_id, f.alice.user_id));

        f.app.settle_up(&f.bob, group.id_typed(), f.alice.user_id, None).await.unwrap();
        f.app.settle_up(&f.carol, group.id_typed(), f.alice.user_id, None).await.unwrap();

        assert!(f.app.group_balances(&f.alice, group.id_typed()).await.unwrap().is_settled());
        assert!(f.app.personal_balances(&f.alice).await.unwrap().is_empty());
        assert!(matches!(
            f.app.settle_up(&f.bob, group.id_typed(), f.alice.user_id, None).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn dashboard_and_breakdown() {
        let f = fixture(InMemoryStore::new()).await;
        let group = trip(&f).await;
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let last_month = Utc.with_ymd_and_hms(2024, 2, 20, 9, 0, 0).unwrap();

        f.app
            .add_expense(
                &f.alice,
                NewExpense::equal(group.id_typed(), "Dinner", Money::from_minor(900))
                    .with_category("Food")
                    .at(now),
            )
            .await
            .unwrap();
        f.app
            .add_expense(
                &f.bob,
                NewExpense::equal(group.id_typed(), "Train", Money::from_minor(300))
                    .with_category("Transport")
                    .at(last_month),
            )
            .await
            .unwrap();

        let dashboard = f.app.dashboard(&f.alice, now).await.unwrap();
        assert_eq!(dashboard.this_month, Money::from_minor(300));
        assert_eq!(dashboard.last_month, Money::from_minor(100));
        assert_eq!(dashboard.owed_to_you, Money::from_minor(500));
        assert_eq!(dashboard.you_owe, Money::ZERO);

        let carol = f.app.dashboard(&f.carol, now).await.unwrap();
        assert_eq!(carol.currency, Currency::EUR);
        assert_eq!(carol.you_owe, Money::from_minor(400));

        let breakdown = f.app.category_breakdown(&f.bob).await.unwrap();
        assert_eq!(breakdown.get("Food"), Money::from_minor(300));
        assert_eq!(breakdown.get("Transport"), Money::from_minor(100));

        let totals = f.app.group_category_totals(&f.carol, group.id_typed()).await.unwrap();
        assert_eq!(totals.total(), Money::from_minor(1200));
    }

    #[tokio::test]
    async fn user_expenses_and_csv_export() {
        let f = fixture(InMemoryStore::new()).await;
        let group = trip(&f).await;
        let solo = f.app.create_group(&f.bob, "Solo", &[], None).await.unwrap();

        let early = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();
        f.app
            .add_expense(&f.alice, NewExpense::equal(group.id_typed(), "Museum", Money::from_minor(600)).at(early))
            .await
            .unwrap();
        f.app
            .add_expense(&f.bob, NewExpense::equal(group.id_typed(), "Lunch", Money::from_minor(300)).at(late))
            .await
            .unwrap();
        f.app
            .add_expense(&f.bob, NewExpense::equal(solo.id_typed(), "Books", Money::from_minor(50)))
            .await
            .unwrap();

        let entries = f.app.user_expenses(&f.alice, None).await.unwrap();
        let descriptions: Vec<&str> = entries.iter().map(|e| e.expense.description()).collect();
        assert_eq!(descriptions, vec!["Lunch", "Museum"]);
        assert_eq!(entries[0].payer_name, "bob");
        assert_eq!(entries[0].group_name, "Trip");
        assert_eq!(f.app.user_expenses(&f.alice, Some(1)).await.unwrap().len(), 1);

        let mut out = Vec::new();
        assert_eq!(f.app.export_csv(&f.alice, &mut out).await.unwrap(), 2);
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Date,Description,Category,Amount,Currency,Payer,Group,Type\n"));
        assert!(text.contains("2024-01-02 08:00:00,Lunch,General,3.00,USD,bob,Trip,equal"));
    }

    #[tokio::test]
    async fn works_against_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");

        let group_id = {
            let f = fixture(SqliteStore::open(&path).await.unwrap()).await;
            let group = trip(&f).await;
            f.app
                .add_expense(&f.bob, NewExpense::equal(group.id_typed(), "Fuel", Money::from_minor(90)))
                .await
                .unwrap();
            f.app.store().close().await;
            group.id_typed()
        };

        let app = ExpenseShare::new(SqliteStore::open(&path).await.unwrap());
        let carol = app.login("carol", "pw-carol").await.unwrap();
        let balances = app.group_balances(&carol, group_id).await.unwrap();
        assert_eq!(balances.get(carol.user_id), Money::from_minor(-30));
        assert_eq!(app.groups_for(&carol).await.unwrap().len(), 1);
    }
}
