use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use expenseshare_core::{
    Aggregate, AggregateRoot, DomainError, DomainResult, Entity, ExpenseId, GroupId, UserId,
};
use expenseshare_events::{Command, Event};

use crate::expense::Expense;
use crate::member::Member;
use crate::settlement::Settlement;

/// Color label given to groups created without one.
pub const DEFAULT_GROUP_COLOR: &str = "#E3F2FD";

/// Aggregate root: Group (members, expenses and recorded settlements).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    id: GroupId,
    name: String,
    color: String,
    created_by: Option<UserId>,
    created_at: Option<DateTime<Utc>>,
    members: Vec<Member>,
    expenses: Vec<Expense>,
    settlements: Vec<Settlement>,
    version: u64,
    created: bool,
}

impl Group {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: GroupId) -> Self {
        Self {
            id,
            name: String::new(),
            color: DEFAULT_GROUP_COLOR.to_string(),
            created_by: None,
            created_at: None,
            members: Vec::new(),
            expenses: Vec::new(),
            settlements: Vec::new(),
            version: 0,
            created: false,
        }
    }

    /// Rebuild a group from its stored events.
    pub fn rehydrate<'a>(id: GroupId, events: impl IntoIterator<Item = &'a GroupEvent>) -> Self {
        let mut group = Self::empty(id);
        for event in events {
            group.apply(event);
        }
        group
    }

    /// Handle a command and apply the resulting events in place.
    pub fn execute(&mut self, command: &GroupCommand) -> DomainResult<Vec<GroupEvent>> {
        let events = self.handle(command)?;
        for event in &events {
            self.apply(event);
        }
        Ok(events)
    }

    pub fn id_typed(&self) -> GroupId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Members in the order they joined.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member_ids(&self) -> impl Iterator<Item = UserId> + '_ {
        self.members.iter().map(Member::user_id)
    }

    pub fn member(&self, user: UserId) -> Option<&Member> {
        self.members.iter().find(|m| m.user_id() == user)
    }

    pub fn is_member(&self, user: UserId) -> bool {
        self.member(user).is_some()
    }

    /// Expenses in the order they were recorded.
    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn expense(&self, id: ExpenseId) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.id() == id)
    }

    pub fn settlements(&self) -> &[Settlement] {
        &self.settlements
    }
}

impl AggregateRoot for Group {
    type Id = GroupId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateGroup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGroup {
    pub group_id: GroupId,
    pub name: String,
    /// Color label; `None` or blank picks [`DEFAULT_GROUP_COLOR`].
    pub color: Option<String>,
    pub created_by: UserId,
    /// Initial members, in display order.
    pub members: Vec<Member>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddMember.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddMember {
    pub group_id: GroupId,
    pub member: Member,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordExpense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordExpense {
    pub group_id: GroupId,
    pub expense: Expense,
}

/// Command: EditExpense (replace an existing expense with the same id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditExpense {
    pub group_id: GroupId,
    pub expense: Expense,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteExpense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteExpense {
    pub group_id: GroupId,
    pub expense_id: ExpenseId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordSettlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSettlement {
    pub group_id: GroupId,
    pub settlement: Settlement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupCommand {
    CreateGroup(CreateGroup),
    AddMember(AddMember),
    RecordExpense(RecordExpense),
    EditExpense(EditExpense),
    DeleteExpense(DeleteExpense),
    RecordSettlement(RecordSettlement),
}

impl Command for GroupCommand {
    fn target_group_id(&self) -> GroupId {
        match self {
            GroupCommand::CreateGroup(c) => c.group_id,
            GroupCommand::AddMember(c) => c.group_id,
            GroupCommand::RecordExpense(c) => c.group_id,
            GroupCommand::EditExpense(c) => c.group_id,
            GroupCommand::DeleteExpense(c) => c.group_id,
            GroupCommand::RecordSettlement(c) => c.group_id,
        }
    }
}

/// Event: GroupCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCreated {
    pub group_id: GroupId,
    pub name: String,
    pub color: String,
    pub created_by: UserId,
    pub members: Vec<Member>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MemberAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberAdded {
    pub group_id: GroupId,
    pub member: Member,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ExpenseRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecorded {
    pub group_id: GroupId,
    pub expense: Expense,
}

/// Event: ExpenseEdited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseEdited {
    pub group_id: GroupId,
    pub expense: Expense,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ExpenseDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseDeleted {
    pub group_id: GroupId,
    pub expense_id: ExpenseId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SettlementRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecorded {
    pub group_id: GroupId,
    pub settlement: Settlement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupEvent {
    GroupCreated(GroupCreated),
    MemberAdded(MemberAdded),
    ExpenseRecorded(ExpenseRecorded),
    ExpenseEdited(ExpenseEdited),
    ExpenseDeleted(ExpenseDeleted),
    SettlementRecorded(SettlementRecorded),
}

impl Event for GroupEvent {
    fn event_type(&self) -> &'static str {
        match self {
            GroupEvent::GroupCreated(_) => "ledger.group.created",
            GroupEvent::MemberAdded(_) => "ledger.group.member_added",
            GroupEvent::ExpenseRecorded(_) => "ledger.group.expense_recorded",
            GroupEvent::ExpenseEdited(_) => "ledger.group.expense_edited",
            GroupEvent::ExpenseDeleted(_) => "ledger.group.expense_deleted",
            GroupEvent::SettlementRecorded(_) => "ledger.group.settlement_recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            GroupEvent::GroupCreated(e) => e.occurred_at,
            GroupEvent::MemberAdded(e) => e.occurred_at,
            GroupEvent::ExpenseRecorded(e) => e.expense.created_at(),
            GroupEvent::ExpenseEdited(e) => e.occurred_at,
            GroupEvent::ExpenseDeleted(e) => e.occurred_at,
            GroupEvent::SettlementRecorded(e) => e.settlement.settled_at(),
        }
    }
}

impl Aggregate for Group {
    type Command = GroupCommand;
    type Event = GroupEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            GroupEvent::GroupCreated(e) => {
                self.id = e.group_id;
                self.name = e.name.clone();
                self.color = e.color.clone();
                self.created_by = Some(e.created_by);
                self.created_at = Some(e.occurred_at);
                self.members = e.members.clone();
                self.created = true;
            }
            GroupEvent::MemberAdded(e) => {
                self.members.push(e.member.clone());
            }
            GroupEvent::ExpenseRecorded(e) => {
                self.expenses.push(e.expense.clone());
            }
            GroupEvent::ExpenseEdited(e) => {
                if let Some(slot) = self.expenses.iter_mut().find(|x| x.id() == e.expense.id()) {
                    *slot = e.expense.clone();
                }
            }
            GroupEvent::ExpenseDeleted(e) => {
                self.expenses.retain(|x| x.id() != e.expense_id);
            }
            GroupEvent::SettlementRecorded(e) => {
                self.settlements.push(e.settlement.clone());
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            GroupCommand::CreateGroup(cmd) => self.handle_create(cmd),
            GroupCommand::AddMember(cmd) => self.handle_add_member(cmd),
            GroupCommand::RecordExpense(cmd) => self.handle_record_expense(cmd),
            GroupCommand::EditExpense(cmd) => self.handle_edit_expense(cmd),
            GroupCommand::DeleteExpense(cmd) => self.handle_delete_expense(cmd),
            GroupCommand::RecordSettlement(cmd) => self.handle_record_settlement(cmd),
        }
    }
}

impl Group {
    fn ensure_created(&self) -> DomainResult<()> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn ensure_group_id(&self, group_id: GroupId) -> DomainResult<()> {
        if self.id != group_id {
            return Err(DomainError::invariant("group_id mismatch"));
        }
        Ok(())
    }

    /// Payer and every allocated member must currently belong to the group.
    ///
    /// Totals are not rechecked here: an [`Expense`] cannot exist, decoded or
    /// constructed, with an allocation that disagrees with its amount.
    fn ensure_expense_members(&self, expense: &Expense) -> DomainResult<()> {
        if expense.group_id() != self.id {
            return Err(DomainError::invariant("expense belongs to another group"));
        }
        if !self.is_member(expense.payer()) {
            return Err(DomainError::validation(format!(
                "payer {} is not a member of the group",
                expense.payer()
            )));
        }
        if let Some(outsider) = expense.allocation().members().find(|m| !self.is_member(*m)) {
            return Err(DomainError::validation(format!(
                "{outsider} is not a member of the group"
            )));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateGroup) -> DomainResult<Vec<GroupEvent>> {
        if self.created {
            return Err(DomainError::conflict("group already exists"));
        }

        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(DomainError::invalid_input("group name cannot be empty"));
        }
        if cmd.members.is_empty() {
            return Err(DomainError::invalid_input("a group needs at least one member"));
        }
        for (idx, member) in cmd.members.iter().enumerate() {
            if cmd.members[..idx].iter().any(|m| m.same_identity(member)) {
                return Err(DomainError::invalid_input(format!(
                    "member {} listed twice",
                    member.user_id()
                )));
            }
        }

        let color = match cmd.color.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => DEFAULT_GROUP_COLOR.to_string(),
        };

        Ok(vec![GroupEvent::GroupCreated(GroupCreated {
            group_id: cmd.group_id,
            name: name.to_string(),
            color,
            created_by: cmd.created_by,
            members: cmd.members.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_member(&self, cmd: &AddMember) -> DomainResult<Vec<GroupEvent>> {
        self.ensure_created()?;
        self.ensure_group_id(cmd.group_id)?;

        if self.is_member(cmd.member.user_id()) {
            return Err(DomainError::conflict(format!(
                "{} is already a member",
                cmd.member.user_id()
            )));
        }

        Ok(vec![GroupEvent::MemberAdded(MemberAdded {
            group_id: cmd.group_id,
            member: cmd.member.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_expense(&self, cmd: &RecordExpense) -> DomainResult<Vec<GroupEvent>> {
        self.ensure_created()?;
        self.ensure_group_id(cmd.group_id)?;
        self.ensure_expense_members(&cmd.expense)?;

        if self.expense(cmd.expense.id()).is_some() {
            return Err(DomainError::conflict("expense already recorded"));
        }

        Ok(vec![GroupEvent::ExpenseRecorded(ExpenseRecorded {
            group_id: cmd.group_id,
            expense: cmd.expense.clone(),
        })])
    }

    fn handle_edit_expense(&self, cmd: &EditExpense) -> DomainResult<Vec<GroupEvent>> {
        self.ensure_created()?;
        self.ensure_group_id(cmd.group_id)?;

        if self.expense(cmd.expense.id()).is_none() {
            return Err(DomainError::not_found());
        }
        self.ensure_expense_members(&cmd.expense)?;

        Ok(vec![GroupEvent::ExpenseEdited(ExpenseEdited {
            group_id: cmd.group_id,
            expense: cmd.expense.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete_expense(&self, cmd: &DeleteExpense) -> DomainResult<Vec<GroupEvent>> {
        self.ensure_created()?;
        self.ensure_group_id(cmd.group_id)?;

        if self.expense(cmd.expense_id).is_none() {
            return Err(DomainError::not_found());
        }

        Ok(vec![GroupEvent::ExpenseDeleted(ExpenseDeleted {
            group_id: cmd.group_id,
            expense_id: cmd.expense_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_settlement(&self, cmd: &RecordSettlement) -> DomainResult<Vec<GroupEvent>> {
        self.ensure_created()?;
        self.ensure_group_id(cmd.group_id)?;

        let settlement = &cmd.settlement;
        // Settlement::new already checks these, but commands can be deserialized.
        if !settlement.amount().is_positive() {
            return Err(DomainError::invalid_input("settlement amount must be positive"));
        }
        if settlement.from() == settlement.to() {
            return Err(DomainError::invalid_input("cannot settle with yourself"));
        }
        for party in [settlement.from(), settlement.to()] {
            if !self.is_member(party) {
                return Err(DomainError::validation(format!(
                    "{party} is not a member of the group"
                )));
            }
        }
        if self.settlements.iter().any(|s| s.id() == settlement.id()) {
            return Err(DomainError::conflict("settlement already recorded"));
        }

        Ok(vec![GroupEvent::SettlementRecorded(SettlementRecorded {
            group_id: cmd.group_id,
            settlement: settlement.clone(),
        })])
    }
}
