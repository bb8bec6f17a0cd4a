//! Integration tests for kassa-core
//!
//! These tests exercise the full utterance → extract → validate → ledger
//! workflow through the public `Tracker` API.

use chrono::NaiveDate;
use kassa_core::{
    classify, AIClient, AccountName, Category, Database, Direction, Error, Extractor,
    MockBackend, MockReply, Movement, Outcome, PromptLibrary, StatsPeriod, Tracker,
    TrackerConfig, UtteranceKind,
};

fn tracker_with(mock: &MockBackend) -> Tracker {
    let extractor =
        Extractor::with_prompts(AIClient::Mock(mock.clone()), PromptLibrary::embedded_only());
    Tracker::new(
        Database::in_memory().expect("Failed to create in-memory database"),
        extractor,
        TrackerConfig::default(),
    )
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 12).unwrap()
}

fn balance_of(tracker: &Tracker, user_id: i64, account: AccountName) -> f64 {
    tracker
        .balances(user_id)
        .unwrap()
        .into_iter()
        .find(|b| b.account == account)
        .map(|b| b.balance)
        .unwrap_or(0.0)
}

// =============================================================================
// Extraction scenarios
// =============================================================================

#[tokio::test]
async fn test_single_sided_expense() {
    let mock = MockBackend::new();
    let tracker = tracker_with(&mock);

    assert_eq!(classify("bought coffee 800"), UtteranceKind::SingleSided);

    let outcome = tracker
        .record_utterance_on(1, "bought coffee 800", day())
        .await
        .unwrap();
    let Outcome::Recorded(tx) = outcome else {
        panic!("expected a recorded expense");
    };

    assert_eq!(tx.amount, 800.0);
    assert_eq!(tx.direction(), Direction::Expense);
    assert!(Category::expense_vocabulary().contains(&tx.category));
    assert_eq!(tx.raw_text, "bought coffee 800");

    // Single-sided prompt, not the transfer one
    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].user.contains("from_account"));
}

#[tokio::test]
async fn test_transfer_between_banks() {
    let mock = MockBackend::new();
    let tracker = tracker_with(&mock);

    let text = "transferred from kaspi to halyk 50000";
    assert_eq!(classify(text), UtteranceKind::Transfer);

    let outcome = tracker.record_utterance_on(1, text, day()).await.unwrap();
    let Outcome::Recorded(tx) = outcome else {
        panic!("expected a recorded transfer");
    };

    assert_eq!(tx.direction(), Direction::Transfer);
    assert_eq!(tx.category, Category::Transfer);
    assert_eq!(
        tx.movement,
        Movement::Transfer {
            source: AccountName::Kaspi,
            destination: AccountName::Halyk,
        }
    );
    assert_eq!(tx.account_label().as_deref(), Some("kaspi → halyk"));

    assert_eq!(balance_of(&tracker, 1, AccountName::Kaspi), -50_000.0);
    assert_eq!(balance_of(&tracker, 1, AccountName::Halyk), 50_000.0);
}

#[tokio::test]
async fn test_prose_wrapped_fenced_json() {
    let mock = MockBackend::with_replies([
        "Here you go: ```json\n{\"success\": true, \"amount\": \"1 500\", \"category\": \"такси\", \"account\": \"Kaspi Gold\", \"direction\": \"expense\"}\n```",
    ]);
    let tracker = tracker_with(&mock);

    let outcome = tracker
        .record_utterance_on(1, "такси 1500 с каспи", day())
        .await
        .unwrap();
    let Outcome::Recorded(tx) = outcome else {
        panic!("expected a recorded expense");
    };

    assert_eq!(tx.amount, 1500.0);
    assert_eq!(tx.movement.account(), Some(AccountName::Kaspi));
    // "такси" is not a category: falls back to other with reduced confidence
    assert_eq!(tx.category, Category::Other);
    assert!((tx.confidence - 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn test_oracle_decline_leaves_ledger_untouched() {
    let mock = MockBackend::with_replies([r#"{"success": false, "error": "no amount found"}"#]);
    let tracker = tracker_with(&mock);

    let err = tracker
        .record_utterance_on(1, "купил что-то", day())
        .await
        .unwrap_err();

    match err {
        Error::LowConfidenceReject(reason) => assert_eq!(reason, "no amount found"),
        other => panic!("expected LowConfidenceReject, got {:?}", other),
    }
    assert_eq!(tracker.db().count_transactions(1).unwrap(), 0);
    assert!(tracker.balances(1).unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_and_unavailable_oracle() {
    let mock = MockBackend::with_replies(["I am not sure what you mean"]);
    mock.push(MockReply::Unavailable("connection refused".into()));
    let tracker = tracker_with(&mock);

    let err = tracker
        .record_utterance_on(1, "кофе 800", day())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MalformedResponse { .. }));

    let err = tracker
        .record_utterance_on(1, "кофе 800", day())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::OracleUnavailable(_)));
    assert_eq!(err.user_message(), Error::OracleUnavailable(String::new()).user_message());

    assert_eq!(tracker.db().count_transactions(1).unwrap(), 0);
}

#[tokio::test]
async fn test_nonpositive_amount_needs_clarification() {
    let mock = MockBackend::with_replies([
        r#"{"success": true, "amount": -300, "category": "food"}"#,
        r#"{"success": true, "amount": 1000, "from_account": "kaspi", "to_account": "kaspi"}"#,
    ]);
    let tracker = tracker_with(&mock);

    let outcome = tracker
        .record_utterance_on(1, "кофе минус 300", day())
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::NeedsClarification(_)));

    let outcome = tracker
        .record_utterance_on(1, "перевел с каспи на каспи 1000", day())
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::NeedsClarification(_)));

    assert_eq!(tracker.db().count_transactions(1).unwrap(), 0);
}

// =============================================================================
// Ledger corrections and balances
// =============================================================================

#[tokio::test]
async fn test_delete_reverses_balance() {
    let mock = MockBackend::with_replies([
        r#"{"success": true, "amount": 1200, "category": "gifts", "account": "kaspi", "direction": "income"}"#,
        r#"{"success": true, "amount": 1200, "category": "food", "account": "каспи", "direction": "expense"}"#,
    ]);
    let tracker = tracker_with(&mock);

    let Outcome::Recorded(income) = tracker
        .record_utterance_on(1, "подарили 1200 на каспи", day())
        .await
        .unwrap()
    else {
        panic!("expected income");
    };
    let Outcome::Recorded(expense) = tracker
        .record_utterance_on(1, "обед 1200 с каспи", day())
        .await
        .unwrap()
    else {
        panic!("expected expense");
    };
    assert_eq!(balance_of(&tracker, 1, AccountName::Kaspi), 0.0);

    let before = balance_of(&tracker, 1, AccountName::Kaspi);
    tracker.delete(1, income.id).unwrap();
    assert_eq!(balance_of(&tracker, 1, AccountName::Kaspi) - before, -1200.0);

    let before = balance_of(&tracker, 1, AccountName::Kaspi);
    tracker.delete(1, expense.id).unwrap();
    assert_eq!(balance_of(&tracker, 1, AccountName::Kaspi) - before, 1200.0);

    // Deleted rows are gone for good
    assert!(matches!(
        tracker.delete(1, expense.id),
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_rows_are_private_to_their_owner() {
    let mock = MockBackend::new();
    let tracker = tracker_with(&mock);

    let Outcome::Recorded(tx) = tracker
        .record_utterance_on(1, "coffee 800 kaspi", day())
        .await
        .unwrap()
    else {
        panic!("expected expense");
    };

    assert!(matches!(tracker.transaction(2, tx.id), Err(Error::NotFound(_))));
    assert!(matches!(tracker.delete(2, tx.id), Err(Error::NotFound(_))));
    assert_eq!(tracker.transaction(1, tx.id).unwrap(), tx);
    assert!(tracker.recent(2, None).unwrap().is_empty());
}

#[tokio::test]
async fn test_balances_reconcile_after_mixed_sequence() {
    let mock = MockBackend::new();
    let tracker = tracker_with(&mock);

    tracker
        .set_opening_balance(1, AccountName::Kaspi, 100_000.0)
        .unwrap();

    let utterances = [
        "salary 250000 kaspi",
        "coffee 800 kaspi",
        "taxi 1500 halyk",
        "перевел с каспи на халык 50000",
        "снял 20000 с каспи наличными",
        "lunch 3000 cash",
    ];
    let mut ids = Vec::new();
    for text in utterances {
        match tracker.record_utterance_on(1, text, day()).await.unwrap() {
            Outcome::Recorded(tx) => ids.push(tx.id),
            Outcome::NeedsClarification(draft) => panic!("{} needed clarification: {}", text, draft.reason),
        }
    }

    // Drop the taxi ride and the withdrawal
    tracker.delete(1, ids[2]).unwrap();
    tracker.delete(1, ids[4]).unwrap();

    assert!(tracker.reconcile(1).unwrap().is_empty());
    assert_eq!(
        balance_of(&tracker, 1, AccountName::Kaspi),
        100_000.0 + 250_000.0 - 800.0 - 50_000.0
    );
    assert_eq!(balance_of(&tracker, 1, AccountName::Halyk), 50_000.0);
    assert_eq!(balance_of(&tracker, 1, AccountName::Cash), -3000.0);

    let names: Vec<AccountName> = tracker.balances(1).unwrap().iter().map(|b| b.account).collect();
    let mut sorted = names.clone();
    sorted.sort_by_key(|a| a.as_str());
    assert_eq!(names, sorted);
}

#[tokio::test]
async fn test_history_and_stats() {
    let mock = MockBackend::new();
    let tracker = tracker_with(&mock);
    let monday = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();

    tracker.record_utterance_on(1, "coffee 800", monday).await.unwrap();
    tracker.record_utterance_on(1, "lunch 2200", day()).await.unwrap();
    tracker.record_utterance_on(1, "taxi 1500", day()).await.unwrap();
    tracker.record_utterance_on(1, "salary 250000", day()).await.unwrap();

    let recent = tracker.recent(1, Some(2)).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].raw_text, "salary 250000");

    assert_eq!(tracker.on_date(1, monday).unwrap().len(), 1);
    assert_eq!(tracker.on_date(1, day()).unwrap().len(), 3);

    let stats = tracker
        .stats(1, StatsPeriod::Week, Direction::Expense, day())
        .unwrap();
    assert_eq!(stats[0].category, Category::Food);
    assert_eq!(stats[0].total, 3000.0);
    assert_eq!(stats[0].count, 2);
    assert_eq!(stats[1].category, Category::Transport);

    let today = tracker
        .stats(1, StatsPeriod::Today, Direction::Expense, day())
        .unwrap();
    assert_eq!(today[0].total, 2200.0);

    let summary = tracker.summary(1, StatsPeriod::Month, day()).unwrap();
    assert_eq!(summary.total_expenses, 4500.0);
    assert_eq!(summary.total_income, 250_000.0);
    assert_eq!(summary.net(), 245_500.0);
}
