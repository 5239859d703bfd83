use chrono::Duration;
use quiz_core::Scheduler;
use quiz_core::model::{
    ProgressDraft, ProgressFilter, ProgressUpdate, QuestionDraft, QuestionFilter, Subject, TagName,
    UserId, ValidatedQuestion,
};
use quiz_core::time::fixed_now;
use storage::repository::{ProgressRepository, QuestionRepository, StorageError};
use storage::sqlite::SqliteRepository;

fn validated(text: &str, subject: Option<&str>, tags: &[&str]) -> ValidatedQuestion {
    QuestionDraft {
        text: text.into(),
        options: vec!["first".into(), "second".into(), "third".into()],
        correct_answer: 2,
        explanation: Some("because".into()),
        subject: subject.map(str::to_owned),
        tags: tags.iter().map(|t| (*t).to_owned()).collect(),
    }
    .validate(fixed_now())
    .unwrap()
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_roundtrips_questions_and_filters() {
    let repo = connect("memdb_questions").await;

    let algebra = repo
        .create_question(validated("Solve x", Some("Math"), &["algebra", "equations"]))
        .await
        .unwrap();
    let mut later = validated("Area of a circle", Some("Math"), &["geometry"]);
    later.created_at = fixed_now() + Duration::minutes(1);
    let geometry = repo.create_question(later).await.unwrap();
    repo.create_question(validated("Year of Hastings", Some("History"), &["algebra"]))
        .await
        .unwrap();
    repo.create_question(validated("No subject", None, &[]))
        .await
        .unwrap();

    let fetched = repo.get_question(algebra.id()).await.unwrap();
    assert_eq!(fetched, algebra);
    assert_eq!(fetched.options().len(), 3);
    assert_eq!(fetched.correct_answer(), 2);
    assert_eq!(fetched.tags().len(), 2);

    let all = repo.list_questions(&QuestionFilter::all()).await.unwrap();
    assert_eq!(all.len(), 4);

    let math = repo
        .list_questions(&QuestionFilter::all().with_subject(Subject::new("Math").unwrap()))
        .await
        .unwrap();
    assert_eq!(math.len(), 2);
    assert_eq!(math[0].id(), geometry.id());

    let tagged = repo
        .list_questions(&QuestionFilter::all().with_tags([
            TagName::new("algebra").unwrap(),
            TagName::new("geometry").unwrap(),
        ]))
        .await
        .unwrap();
    assert_eq!(tagged.len(), 3);

    let both = repo
        .list_questions(
            &QuestionFilter::all()
                .with_subject(Subject::new("Math").unwrap())
                .with_tags([TagName::new("algebra").unwrap()]),
        )
        .await
        .unwrap();
    assert_eq!(both.len(), 1);
    assert_eq!(both[0].id(), algebra.id());
}

#[tokio::test]
async fn sqlite_progress_create_update_and_uniqueness() {
    let repo = connect("memdb_progress").await;
    let question = repo
        .create_question(validated("Q", Some("Math"), &[]))
        .await
        .unwrap();
    let user = UserId::new("learner-1").unwrap();
    let scheduler = Scheduler::new();

    let first = scheduler.apply_answer(None, true, fixed_now()).unwrap();
    let created = repo
        .create_progress(ProgressDraft::new(
            user.clone(),
            question.id().clone(),
            first.clone(),
        ))
        .await
        .unwrap();
    assert_eq!(created.stats(), &first);

    let err = repo
        .create_progress(ProgressDraft::new(
            user.clone(),
            question.id().clone(),
            first.clone(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let answered_at = fixed_now() + Duration::days(2);
    let second = scheduler
        .apply_answer(Some(created.stats()), false, answered_at)
        .unwrap();
    let updated = repo
        .update_progress(created.id(), ProgressUpdate::answer(second.clone()))
        .await
        .unwrap();
    assert_eq!(updated.stats(), &second);

    let annotated = repo
        .update_progress(
            created.id(),
            ProgressUpdate {
                difficulty_rating: Some(4),
                notes: Some("watch the units".into()),
                ..ProgressUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(annotated.difficulty_rating(), 4);

    let listed = repo
        .list_progress(&ProgressFilter::for_question(
            user.clone(),
            question.id().clone(),
        ))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].stats(), &second);
    assert_eq!(listed[0].notes(), "watch the units");
    assert_eq!(listed[0].next_review(), second.next_review);

    let other = repo
        .list_progress(&ProgressFilter::for_user(UserId::new("someone-else").unwrap()))
        .await
        .unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn sqlite_rejects_invalid_update_without_writing() {
    let repo = connect("memdb_invalid_update").await;
    let question = repo
        .create_question(validated("Q", None, &[]))
        .await
        .unwrap();
    let user = UserId::new("learner-1").unwrap();
    let stats = Scheduler::new()
        .apply_answer(None, false, fixed_now())
        .unwrap();
    let created = repo
        .create_progress(ProgressDraft::new(user.clone(), question.id().clone(), stats))
        .await
        .unwrap();

    let err = repo
        .update_progress(
            created.id(),
            ProgressUpdate {
                difficulty_rating: Some(9),
                ..ProgressUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Serialization(_)));

    let listed = repo
        .list_progress(&ProgressFilter::for_user(user))
        .await
        .unwrap();
    assert_eq!(listed[0], created);
}

#[tokio::test]
async fn connections_enforce_foreign_keys_and_wait_on_locks() {
    let repo = connect("memdb_pragmas").await;

    let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys;")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(foreign_keys, 1);
    let busy_timeout: i64 = sqlx::query_scalar("PRAGMA busy_timeout;")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(busy_timeout, 5000);

    let orphan = sqlx::query(
        r"
            INSERT INTO progress (
                id, user_id, question_id, correct_count, incorrect_count, total_attempts,
                streak_count, mastery_level, review_count, last_reviewed, next_review,
                last_answer_correct, difficulty_rating
            ) VALUES (
                'p-orphan', 'learner', 'missing-question', 0, 0, 0,
                0, 0, 0, '2024-01-01T00:00:00Z', '2024-01-01',
                0, 3
            );
        ",
    )
    .execute(repo.pool())
    .await
    .unwrap_err();
    assert!(orphan.to_string().contains("FOREIGN KEY"), "{orphan}");
}
