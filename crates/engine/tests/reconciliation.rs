use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    BudgetPeriod, DeliveryError, Engine, EngineError, MoneyCents, NewBudgetCmd, NewGoalCmd,
    NewTransactionCmd, Notifier, RecurringCmd, RecurringFrequency, TransactionKind,
    TransactionListFilter, TransactionStatus,
};
use migration::MigratorTrait;

/// Captures every message instead of delivering it.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

async fn engine_with_db() -> (Engine, DatabaseConnection, Arc<RecordingNotifier>) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (username, password, email, role, default_currency) \
         VALUES (?, ?, ?, ?, ?)",
        vec![
            "alice".into(),
            "password".into(),
            "alice@example.com".into(),
            "user".into(),
            "EUR".into(),
        ],
    ))
    .await
    .unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = Engine::builder()
        .database(db.clone())
        .notifier(notifier.clone())
        .build();
    (engine, db, notifier)
}

fn cmd(kind: TransactionKind, amount: i64) -> NewTransactionCmd {
    NewTransactionCmd {
        user_id: "alice".to_string(),
        kind,
        amount: MoneyCents::new(amount),
        currency: None,
        category: None,
        goal_id: None,
        tags: Vec::new(),
        note: None,
        recurring: None,
        date: None,
    }
}

#[tokio::test]
async fn balance_counts_only_completed_active_transactions() {
    let (engine, _db, _notifier) = engine_with_db().await;

    engine
        .create_transaction(cmd(TransactionKind::Income, 100_00))
        .await
        .unwrap();
    // Over balance, admitted as pending; must not move the balance.
    let pending = engine
        .create_transaction(cmd(TransactionKind::Expense, 150_00))
        .await
        .unwrap();
    assert_eq!(pending.status, TransactionStatus::Pending);

    let summary = engine.balance("alice").await.unwrap();
    assert_eq!(summary.balance, MoneyCents::new(100_00));
    assert_eq!(summary.income, MoneyCents::new(100_00));
    assert_eq!(summary.expense, MoneyCents::ZERO);
}

#[tokio::test]
async fn expense_admission_depends_on_balance() {
    let (engine, _db, _notifier) = engine_with_db().await;

    engine
        .create_transaction(cmd(TransactionKind::Income, 100_00))
        .await
        .unwrap();

    let over = engine
        .create_transaction(cmd(TransactionKind::Expense, 150_00))
        .await
        .unwrap();
    assert_eq!(over.status, TransactionStatus::Pending);

    let within = engine
        .create_transaction(cmd(TransactionKind::Expense, 80_00))
        .await
        .unwrap();
    assert_eq!(within.status, TransactionStatus::Completed);

    let summary = engine.balance("alice").await.unwrap();
    assert_eq!(summary.balance, MoneyCents::new(20_00));
}

#[tokio::test]
async fn completed_expense_accrues_in_matching_budgets_only() {
    let (engine, _db, _notifier) = engine_with_db().await;
    engine.new_category("groceries").await.unwrap();
    engine.new_category("rent").await.unwrap();
    engine
        .create_transaction(cmd(TransactionKind::Income, 500_00))
        .await
        .unwrap();

    let matching = engine
        .new_budget(NewBudgetCmd {
            user_id: "alice".to_string(),
            amount: MoneyCents::new(200_00),
            period: BudgetPeriod::Monthly,
            category: Some("groceries".to_string()),
            tags: Vec::new(),
        })
        .await
        .unwrap();
    let disjoint = engine
        .new_budget(NewBudgetCmd {
            user_id: "alice".to_string(),
            amount: MoneyCents::new(200_00),
            period: BudgetPeriod::Monthly,
            category: Some("rent".to_string()),
            tags: vec!["housing".to_string()],
        })
        .await
        .unwrap();

    let mut expense = cmd(TransactionKind::Expense, 40_00);
    expense.category = Some("groceries".to_string());
    expense.tags = vec!["food".to_string()];
    engine.create_transaction(expense).await.unwrap();

    let matching = engine.budget(matching.id, "alice").await.unwrap();
    assert_eq!(matching.current_amount, MoneyCents::new(40_00));
    let disjoint = engine.budget(disjoint.id, "alice").await.unwrap();
    assert_eq!(disjoint.current_amount, MoneyCents::ZERO);
}

#[tokio::test]
async fn overspend_past_threshold_notifies_owner() {
    let (engine, _db, notifier) = engine_with_db().await;
    engine.new_category("groceries").await.unwrap();
    engine
        .create_transaction(cmd(TransactionKind::Income, 500_00))
        .await
        .unwrap();
    engine
        .new_budget(NewBudgetCmd {
            user_id: "alice".to_string(),
            amount: MoneyCents::new(100_00),
            period: BudgetPeriod::Weekly,
            category: Some("groceries".to_string()),
            tags: Vec::new(),
        })
        .await
        .unwrap();

    let mut expense = cmd(TransactionKind::Expense, 90_00);
    expense.category = Some("groceries".to_string());
    engine.create_transaction(expense).await.unwrap();

    let sent = notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "alice@example.com");
    assert!(sent[0].1.contains("Budget Exceeded"));
}

#[tokio::test]
async fn delete_reverts_budget_accrual_and_balance() {
    let (engine, _db, _notifier) = engine_with_db().await;
    engine.new_category("groceries").await.unwrap();
    engine
        .create_transaction(cmd(TransactionKind::Income, 500_00))
        .await
        .unwrap();
    let budget = engine
        .new_budget(NewBudgetCmd {
            user_id: "alice".to_string(),
            amount: MoneyCents::new(200_00),
            period: BudgetPeriod::Monthly,
            category: Some("groceries".to_string()),
            tags: Vec::new(),
        })
        .await
        .unwrap();

    let mut expense = cmd(TransactionKind::Expense, 40_00);
    expense.category = Some("groceries".to_string());
    let tx = engine.create_transaction(expense).await.unwrap();

    engine.delete_transaction(tx.id, "alice").await.unwrap();

    let budget = engine.budget(budget.id, "alice").await.unwrap();
    assert_eq!(budget.current_amount, MoneyCents::ZERO);
    let summary = engine.balance("alice").await.unwrap();
    assert_eq!(summary.balance, MoneyCents::new(500_00));
}

#[tokio::test]
async fn future_recurring_expense_is_pending_inactive_until_activation() {
    let (engine, _db, _notifier) = engine_with_db().await;

    let start = Utc::now().checked_add_days(Days::new(3)).unwrap();
    let mut recurring = cmd(TransactionKind::Expense, 50_00);
    recurring.recurring = Some(RecurringCmd {
        frequency: RecurringFrequency::Monthly,
        start_date: start,
    });
    let tx = engine.create_transaction(recurring).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert!(!tx.is_active);

    let activated = engine.activate_scheduled(start.date_naive()).await.unwrap();
    assert_eq!(activated, 1);
    let tx = engine.transaction(tx.id, "alice").await.unwrap();
    assert!(tx.is_active);
    assert_eq!(tx.date.date_naive(), start.date_naive());
}

#[tokio::test]
async fn linked_incomes_advance_goal_and_record_contributions() {
    let (engine, db, _notifier) = engine_with_db().await;
    let goal = engine
        .new_goal(NewGoalCmd {
            user_id: "alice".to_string(),
            name: "Laptop".to_string(),
            target_amount: MoneyCents::new(1000_00),
            target_date: Utc::now().checked_add_days(Days::new(90)).unwrap(),
            category: None,
        })
        .await
        .unwrap();
    // Start the goal at 400 already saved.
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE goals SET current_amount_minor = ? WHERE id = ?",
        vec![400_00i64.into(), goal.id.to_string().into()],
    ))
    .await
    .unwrap();

    for _ in 0..2 {
        let mut income = cmd(TransactionKind::Income, 300_00);
        income.goal_id = Some(goal.id);
        engine.create_transaction(income).await.unwrap();
    }

    let goal = engine.goal(goal.id, "alice").await.unwrap();
    assert_eq!(goal.current_amount, MoneyCents::new(1000_00));
    let contributions = engine.goal_contributions(goal.id, "alice").await.unwrap();
    assert_eq!(contributions.len(), 2);
}

#[tokio::test]
async fn deleting_linked_income_reverts_goal_progress() {
    let (engine, _db, _notifier) = engine_with_db().await;
    let goal = engine
        .new_goal(NewGoalCmd {
            user_id: "alice".to_string(),
            name: "Laptop".to_string(),
            target_amount: MoneyCents::new(1000_00),
            target_date: Utc::now().checked_add_days(Days::new(90)).unwrap(),
            category: None,
        })
        .await
        .unwrap();

    let mut income = cmd(TransactionKind::Income, 300_00);
    income.goal_id = Some(goal.id);
    let tx = engine.create_transaction(income).await.unwrap();

    engine.delete_transaction(tx.id, "alice").await.unwrap();

    let goal = engine.goal(goal.id, "alice").await.unwrap();
    assert_eq!(goal.current_amount, MoneyCents::ZERO);
    assert!(engine
        .goal_contributions(goal.id, "alice")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn regeneration_clones_due_recurring_transactions_once() {
    let (engine, _db, _notifier) = engine_with_db().await;

    let start = Utc::now();
    let mut recurring = cmd(TransactionKind::Income, 100_00);
    recurring.recurring = Some(RecurringCmd {
        frequency: RecurringFrequency::Daily,
        start_date: start,
    });
    engine.create_transaction(recurring).await.unwrap();

    let tomorrow = start.date_naive().checked_add_days(Days::new(1)).unwrap();
    let created = engine.regenerate_recurring(tomorrow).await.unwrap();
    assert_eq!(created, 1);
    // Not due again on the same day.
    let created = engine.regenerate_recurring(tomorrow).await.unwrap();
    assert_eq!(created, 0);

    let txs = engine
        .transactions("alice", &TransactionListFilter::default())
        .await
        .unwrap();
    assert_eq!(txs.len(), 2);
}

#[tokio::test]
async fn retry_completes_pending_expense_once_funds_arrive() {
    let (engine, _db, notifier) = engine_with_db().await;

    engine
        .create_transaction(cmd(TransactionKind::Income, 100_00))
        .await
        .unwrap();
    let stuck = engine
        .create_transaction(cmd(TransactionKind::Expense, 150_00))
        .await
        .unwrap();
    assert_eq!(stuck.status, TransactionStatus::Pending);

    // Still short; the attempt fails and mails the owner.
    engine.retry_pending().await.unwrap();
    let tx = engine.transaction(stuck.id, "alice").await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Failed);
    {
        let sent = notifier.sent.lock().unwrap();
        assert!(sent.iter().any(|(_, subject)| subject == "Transaction Failed"));
    }

    // A fresh pending expense with enough balance completes.
    engine
        .create_transaction(cmd(TransactionKind::Income, 200_00))
        .await
        .unwrap();
    let second = engine
        .create_transaction(cmd(TransactionKind::Expense, 400_00))
        .await
        .unwrap();
    assert_eq!(second.status, TransactionStatus::Pending);
    engine
        .create_transaction(cmd(TransactionKind::Income, 200_00))
        .await
        .unwrap();

    let transitioned = engine.retry_pending().await.unwrap();
    assert_eq!(transitioned, 1);
    let tx = engine.transaction(second.id, "alice").await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Completed);
    let summary = engine.balance("alice").await.unwrap();
    assert_eq!(summary.balance, MoneyCents::new(100_00));
}

#[tokio::test]
async fn rollover_resets_budget_exactly_once_per_boundary() {
    let (engine, db, _notifier) = engine_with_db().await;
    engine.new_category("groceries").await.unwrap();
    engine
        .create_transaction(cmd(TransactionKind::Income, 500_00))
        .await
        .unwrap();
    let budget = engine
        .new_budget(NewBudgetCmd {
            user_id: "alice".to_string(),
            amount: MoneyCents::new(200_00),
            period: BudgetPeriod::Weekly,
            category: Some("groceries".to_string()),
            tags: Vec::new(),
        })
        .await
        .unwrap();
    let mut expense = cmd(TransactionKind::Expense, 40_00);
    expense.category = Some("groceries".to_string());
    engine.create_transaction(expense).await.unwrap();

    // Pin the period start so the boundary lands on a known day.
    let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE budgets SET start_date = ?, end_date = NULL WHERE id = ?",
        vec![
            "2026-03-02 00:00:00+00:00".into(),
            budget.id.to_string().into(),
        ],
    ))
    .await
    .unwrap();

    let boundary = start.checked_add_days(Days::new(7)).unwrap();
    let rolled = engine.rollover_budgets(boundary).await.unwrap();
    assert_eq!(rolled, 1);
    let rolled_budget = engine.budget(budget.id, "alice").await.unwrap();
    assert_eq!(rolled_budget.current_amount, MoneyCents::ZERO);
    assert_eq!(rolled_budget.start_date.date_naive(), boundary);

    // Same day again: the boundary has moved a week out, nothing to do.
    let rolled = engine.rollover_budgets(boundary).await.unwrap();
    assert_eq!(rolled, 0);
}

#[tokio::test]
async fn goal_reminder_goes_out_two_days_before_deadline() {
    let (engine, _db, notifier) = engine_with_db().await;

    let today = Utc::now().date_naive();
    let deadline = today.checked_add_days(Days::new(2)).unwrap();
    engine
        .new_goal(NewGoalCmd {
            user_id: "alice".to_string(),
            name: "Laptop".to_string(),
            target_amount: MoneyCents::new(1000_00),
            target_date: deadline.and_hms_opt(0, 0, 0).unwrap().and_utc(),
            category: None,
        })
        .await
        .unwrap();

    let reminded = engine.remind_goal_deadlines(today).await.unwrap();
    assert_eq!(reminded, 1);
    let sent = notifier.sent.lock().unwrap();
    assert!(sent.iter().any(|(_, subject)| subject == "Goal Status Reminder"));

    // A day earlier nothing is due.
    drop(sent);
    let early = today.checked_sub_days(Days::new(1)).unwrap();
    assert_eq!(engine.remind_goal_deadlines(early).await.unwrap(), 0);
}

#[tokio::test]
async fn listing_all_users_requires_admin_role() {
    let (engine, _db, _notifier) = engine_with_db().await;

    let err = engine
        .transactions_all_users("alice", None, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn expense_with_unknown_category_is_rejected() {
    let (engine, _db, _notifier) = engine_with_db().await;
    engine
        .create_transaction(cmd(TransactionKind::Income, 100_00))
        .await
        .unwrap();

    let mut expense = cmd(TransactionKind::Expense, 10_00);
    expense.category = Some("no-such-category".to_string());
    let err = engine.create_transaction(expense).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}
