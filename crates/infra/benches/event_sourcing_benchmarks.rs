use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::Utc;
use expenseshare_core::{ExpenseId, GroupId, Money, UserId};
use expenseshare_infra::command_dispatcher::CommandDispatcher;
use expenseshare_infra::event_store::InMemoryEventStore;
use expenseshare_ledger::{
    CreateGroup, Expense, Group, GroupCommand, Member, RecordExpense, SplitType, compute_balances,
    compute_equal_split,
};
use tokio::runtime::{Builder, Runtime};

fn runtime() -> Runtime {
    Builder::new_current_thread()
        .build()
        .expect("failed to build tokio runtime")
}

/// A group of `members` people with `expenses` recorded expenses.
fn seeded_group(rt: &Runtime, members: usize, expenses: usize) -> (CommandDispatcher<InMemoryEventStore>, GroupId) {
    let dispatcher = CommandDispatcher::new(InMemoryEventStore::new());
    let group_id = GroupId::new();
    let users: Vec<UserId> = (0..members).map(|_| UserId::new()).collect();

    rt.block_on(async {
        dispatcher
            .dispatch(
                GroupCommand::CreateGroup(CreateGroup {
                    group_id,
                    name: "bench".to_string(),
                    color: None,
                    created_by: users[0],
                    members: users
                        .iter()
                        .enumerate()
                        .map(|(i, u)| Member::new(*u, format!("user{i}")).unwrap())
                        .collect(),
                    occurred_at: Utc::now(),
                }),
                Group::empty,
            )
            .await
            .unwrap();

        for i in 0..expenses {
            let total = Money::from_minor(1_000 + i as i64);
            let expense = Expense::new(
                ExpenseId::new(),
                group_id,
                format!("expense {i}"),
                total,
                users[i % members],
                SplitType::Equal,
                compute_equal_split(total, &users).unwrap(),
                Utc::now(),
            )
            .unwrap();
            dispatcher
                .dispatch(GroupCommand::RecordExpense(RecordExpense { group_id, expense }), Group::empty)
                .await
                .unwrap();
        }
    });

    (dispatcher, group_id)
}

fn bench_rehydrate(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("rehydrate_group");

    for expenses in [10usize, 100, 1_000] {
        let (dispatcher, group_id) = seeded_group(&rt, 6, expenses);
        group.throughput(Throughput::Elements(expenses as u64));
        group.bench_with_input(BenchmarkId::from_parameter(expenses), &expenses, |b, _| {
            b.iter(|| {
                let loaded: Group = rt
                    .block_on(dispatcher.load(black_box(group_id), Group::empty))
                    .unwrap();
                black_box(compute_balances(&loaded))
            })
        });
    }

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let rt = runtime();
    let (dispatcher, group_id) = seeded_group(&rt, 6, 100);
    let users: Vec<UserId> = rt
        .block_on(dispatcher.load(group_id, Group::empty))
        .unwrap()
        .member_ids()
        .collect();

    c.bench_function("dispatch_record_expense_on_100_event_stream", |b| {
        b.iter(|| {
            let total = Money::from_minor(4_200);
            let expense = Expense::new(
                ExpenseId::new(),
                group_id,
                "coffee",
                total,
                users[0],
                SplitType::Equal,
                compute_equal_split(total, &users).unwrap(),
                Utc::now(),
            )
            .unwrap();
            rt.block_on(dispatcher.dispatch(
                GroupCommand::RecordExpense(RecordExpense { group_id, expense }),
                Group::empty,
            ))
            .unwrap()
        })
    });
}

criterion_group!(benches, bench_rehydrate, bench_dispatch);
criterion_main!(benches);
