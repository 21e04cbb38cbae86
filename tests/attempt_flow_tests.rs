// tests/attempt_flow_tests.rs

mod common;

use common::{HOUR_MS, SUBMIT_GRACE, spawn_app};
use examprep::{
    exam::{
        AccessDecision, Attempt, AttemptError, SubmitError, gate_access,
        attempt::{SubmitTrigger, Tick},
        status::ExamStatus,
    },
    query::QueryState,
    session::{FileStorage, MemoryStorage, SessionAnswerStore},
    utils::clock::Clock,
};

#[tokio::test]
async fn candidate_reloads_mid_attempt_then_submits() {
    // Arrange
    let app = spawn_app().await;
    let exam = app.exam("Cardiologie", -HOUR_MS, HOUR_MS).await;
    app.questions(exam.id, 2).await;
    let candidate = app.candidate().await;
    let dir = tempfile::tempdir().unwrap();

    // Gate
    let query = candidate.get_exam(exam.id).await.unwrap().map(|v| v.window());
    assert_eq!(gate_access(&query, app.clock.now_ms()), AccessDecision::Granted);
    let QueryState::Found(window) = query else {
        panic!("exam should exist");
    };

    let questions = candidate.list_questions(exam.id).await.unwrap();

    // First page load: answer one question, then the tab goes away.
    {
        let storage = FileStorage::open(dir.path()).unwrap();
        let store = SessionAnswerStore::with_clock(storage, app.clock.clone());
        let mut attempt = Attempt::start(exam.id, window, &store, app.clock.now_ms()).unwrap();
        attempt.select(questions[0].id.to_string(), "A").unwrap();
    }

    app.clock.advance(10 * 60 * 1000);

    // Reload: the saved answer comes back.
    let storage = FileStorage::open(dir.path()).unwrap();
    let store = SessionAnswerStore::with_clock(storage, app.clock.clone());
    let mut attempt = Attempt::start(exam.id, window, &store, app.clock.now_ms()).unwrap();
    assert!(attempt.was_restored());
    assert_eq!(
        attempt.answers().get(&questions[0].id.to_string()).map(String::as_str),
        Some("A")
    );

    attempt.select(questions[1].id.to_string(), "A").unwrap();
    let result = attempt
        .submit(&candidate, SubmitTrigger::Manual)
        .await
        .expect("Submit failed");

    // Assert
    assert_eq!(result.correct_count, 2);
    assert!(result.passed);
    assert_eq!(store.load(&exam.id.to_string()), None);
    assert_eq!(candidate.my_attempts().await.unwrap().len(), 1);
}

#[tokio::test]
async fn timer_expiry_submits_within_grace() {
    let app = spawn_app().await;
    let exam = app.exam("Infectiologie", -HOUR_MS, HOUR_MS).await;
    app.questions(exam.id, 1).await;
    let candidate = app.candidate().await;
    let question = candidate.list_questions(exam.id).await.unwrap().remove(0);
    let store = SessionAnswerStore::with_clock(MemoryStorage::new(), app.clock.clone());

    let mut attempt = Attempt::start(exam.id, exam.window(), &store, app.clock.now_ms()).unwrap();
    attempt.select(question.id.to_string(), "B").unwrap();
    assert_eq!(
        attempt.tick(app.clock.now_ms()),
        Tick::Running { remaining_ms: HOUR_MS }
    );

    app.clock.advance(HOUR_MS + 1);
    assert_eq!(attempt.tick(app.clock.now_ms()), Tick::Expired);

    let result = attempt
        .submit(&candidate, SubmitTrigger::TimerExpired)
        .await
        .unwrap();
    assert_eq!(result.correct_count, 0);
    assert_eq!(store.load(&exam.id.to_string()), None);
}

#[tokio::test]
async fn submit_past_grace_is_rejected_and_drops_saved_answers() {
    let app = spawn_app().await;
    let exam = app.exam("Oncologie", -HOUR_MS, HOUR_MS).await;
    app.questions(exam.id, 1).await;
    let candidate = app.candidate().await;
    let store = SessionAnswerStore::with_clock(MemoryStorage::new(), app.clock.clone());

    let mut attempt = Attempt::start(exam.id, exam.window(), &store, app.clock.now_ms()).unwrap();
    attempt.select("1", "A").unwrap();

    // The tab was asleep well past the grace period.
    app.clock.advance(HOUR_MS + SUBMIT_GRACE + 1);
    let err = attempt
        .submit(&candidate, SubmitTrigger::TimerExpired)
        .await
        .unwrap_err();

    assert!(matches!(err, AttemptError::Submit(SubmitError::Rejected(_))));
    assert!(!attempt.is_submitted());
    assert_eq!(store.load(&exam.id.to_string()), None);
}

#[tokio::test]
async fn deactivation_mid_attempt_closes_the_timer() {
    let app = spawn_app().await;
    let exam = app.exam("Gastro-entérologie", -HOUR_MS, HOUR_MS).await;
    let candidate = app.candidate().await;
    let store = SessionAnswerStore::with_clock(MemoryStorage::new(), app.clock.clone());

    let mut attempt = Attempt::start(exam.id, exam.window(), &store, app.clock.now_ms()).unwrap();
    attempt.select("1", "A").unwrap();

    app.admin().await.deactivate_exam(exam.id, true).await.unwrap();
    let QueryState::Found(view) = candidate.get_exam(exam.id).await.unwrap() else {
        panic!("exam should exist");
    };
    attempt.update_window(view.window());

    assert_eq!(
        attempt.tick(app.clock.now_ms()),
        Tick::Closed(ExamStatus::Inactive)
    );
    // Kept in case the exam is switched back on.
    assert!(store.load(&exam.id.to_string()).is_some());
}

#[tokio::test]
async fn second_device_sees_backend_duplicate() {
    let app = spawn_app().await;
    let exam = app.exam("Psychiatrie", -HOUR_MS, HOUR_MS).await;
    app.questions(exam.id, 1).await;
    let candidate = app.candidate().await;
    let laptop = SessionAnswerStore::with_clock(MemoryStorage::new(), app.clock.clone());
    let phone = SessionAnswerStore::with_clock(MemoryStorage::new(), app.clock.clone());
    let now = app.clock.now_ms();

    let mut first = Attempt::start(exam.id, exam.window(), &laptop, now).unwrap();
    first.select("1", "A").unwrap();
    let mut second = Attempt::start(exam.id, exam.window(), &phone, now).unwrap();
    second.select("1", "B").unwrap();

    first.submit(&candidate, SubmitTrigger::Manual).await.unwrap();
    let err = second
        .submit(&candidate, SubmitTrigger::Manual)
        .await
        .unwrap_err();

    assert!(matches!(err, AttemptError::AlreadySubmitted));
    assert_eq!(phone.load(&exam.id.to_string()), None);
}

#[tokio::test]
async fn deactivated_exam_denies_access() {
    let app = spawn_app().await;
    let exam = app.exam("Rhumatologie", -HOUR_MS, HOUR_MS).await;
    app.admin().await.deactivate_exam(exam.id, true).await.unwrap();
    let candidate = app.candidate().await;

    let query = candidate.get_exam(exam.id).await.unwrap().map(|v| v.window());
    assert_eq!(
        gate_access(&query, app.clock.now_ms()),
        AccessDecision::Denied(ExamStatus::Inactive)
    );

    let store = SessionAnswerStore::with_clock(MemoryStorage::new(), app.clock.clone());
    let QueryState::Found(window) = query else {
        panic!("exam should exist");
    };
    let err = Attempt::start(exam.id, window, &store, app.clock.now_ms())
        .err()
        .unwrap();
    assert!(matches!(err, AttemptError::NotOpen(ExamStatus::Inactive)));
}
