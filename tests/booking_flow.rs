//! End-to-end engine tests against a real Postgres.
//!
//! Run with a database available:
//!   DATABASE_URL=postgres://... cargo test -- --ignored

use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use gym_class::config::BookingConfig;
use gym_class::database::Database;
use gym_class::models::PlanType;
use gym_class::services::{BookingError, BookingService};

async fn test_service() -> (BookingService, PgPool) {
    let url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .expect("failed to connect to test database");

    let db = Database { pool: pool.clone() };
    db.run_migrations().await.expect("failed to run migrations");

    let service = BookingService::new(
        db,
        BookingConfig {
            min_lead_minutes: 0,
            admission_retries: 3,
        },
    );
    (service, pool)
}

async fn new_member(service: &BookingService, plan: PlanType) -> i64 {
    service
        .create_member("Teste Aluno", plan)
        .await
        .expect("failed to create member")
        .id
}

async fn new_class(service: &BookingService, class_type: &str, capacity: i32) -> i64 {
    service
        .create_class(class_type, Utc::now() + Duration::hours(24), capacity)
        .await
        .expect("failed to create class")
        .id
}

async fn occupied_seats(pool: &PgPool, class_id: i64) -> i32 {
    sqlx::query_scalar("SELECT occupied_seats FROM class_sessions WHERE id = $1")
        .bind(class_id)
        .fetch_one(pool)
        .await
        .expect("failed to read occupied_seats")
}

async fn active_bookings(pool: &PgPool, class_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE class_id = $1 AND active")
        .bind(class_id)
        .fetch_one(pool)
        .await
        .expect("failed to count bookings")
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn first_booking_takes_one_seat() {
    let (service, pool) = test_service().await;
    let member_id = new_member(&service, PlanType::Monthly).await;
    let class_id = new_class(&service, "Yoga", 20).await;

    let booking = service.create_booking(member_id, class_id).await.unwrap();
    assert!(booking.active);
    assert_eq!(booking.member_id, member_id);
    assert_eq!(booking.class_id, class_id);

    assert_eq!(occupied_seats(&pool, class_id).await, 1);
    assert_eq!(
        service.count_month_bookings(member_id, Utc::now()).await.unwrap(),
        1
    );
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn full_class_rejects_booking() {
    let (service, pool) = test_service().await;
    let first = new_member(&service, PlanType::Monthly).await;
    let second = new_member(&service, PlanType::Monthly).await;
    let class_id = new_class(&service, "Cross", 1).await;

    service.create_booking(first, class_id).await.unwrap();

    let err = service.create_booking(second, class_id).await.unwrap_err();
    assert!(matches!(err, BookingError::ClassFull { .. }));
    assert_eq!(occupied_seats(&pool, class_id).await, 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn monthly_quota_blocks_the_thirteenth_booking() {
    let (service, _pool) = test_service().await;
    let member_id = new_member(&service, PlanType::Monthly).await;

    // the 12th booking is still within the monthly limit
    for i in 0..12 {
        let class_id = new_class(&service, &format!("Turma {}", i), 10).await;
        service.create_booking(member_id, class_id).await.unwrap();
    }

    let extra_class = new_class(&service, "Turma extra", 10).await;
    let err = service.create_booking(member_id, extra_class).await.unwrap_err();
    match err {
        BookingError::QuotaExceeded { plan, limit, booked } => {
            assert_eq!(plan, PlanType::Monthly);
            assert_eq!(limit, 12);
            assert_eq!(booked, 12);
        }
        other => panic!("expected QuotaExceeded, got {:?}", other),
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn duplicate_booking_rejected_until_cancelled() {
    let (service, _pool) = test_service().await;
    let member_id = new_member(&service, PlanType::Quarterly).await;
    let class_id = new_class(&service, "Pilates", 10).await;

    let booking = service.create_booking(member_id, class_id).await.unwrap();

    let err = service.create_booking(member_id, class_id).await.unwrap_err();
    assert!(matches!(err, BookingError::DuplicateBooking { .. }));

    assert!(service.cancel_booking(booking.id).await.unwrap());
    service
        .create_booking(member_id, class_id)
        .await
        .expect("rebooking after cancellation should succeed");
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn cancellation_releases_seat_and_is_idempotent() {
    let (service, pool) = test_service().await;
    let class_id = new_class(&service, "Funcional", 20).await;

    let mut bookings = Vec::new();
    for _ in 0..5 {
        let member_id = new_member(&service, PlanType::Annual).await;
        bookings.push(service.create_booking(member_id, class_id).await.unwrap());
    }
    assert_eq!(occupied_seats(&pool, class_id).await, 5);

    assert!(service.cancel_booking(bookings[0].id).await.unwrap());
    assert_eq!(occupied_seats(&pool, class_id).await, 4);
    assert_eq!(active_bookings(&pool, class_id).await, 4);

    // cancelling again is a no-op
    assert!(!service.cancel_booking(bookings[0].id).await.unwrap());
    assert_eq!(occupied_seats(&pool, class_id).await, 4);

    // as is cancelling a booking that never existed
    assert!(!service.cancel_booking(9_999_999).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn checks_run_in_declared_order() {
    let (service, pool) = test_service().await;

    // missing member is reported before the (also missing) class
    let err = service.create_booking(9_999_999, 9_999_999).await.unwrap_err();
    assert!(matches!(err, BookingError::MemberNotFound(_)));

    // an inactive class is reported as not found
    let member_id = new_member(&service, PlanType::Monthly).await;
    let class_id = new_class(&service, "Spinning", 10).await;
    sqlx::query("UPDATE class_sessions SET active = FALSE WHERE id = $1")
        .bind(class_id)
        .execute(&pool)
        .await
        .unwrap();
    let err = service.create_booking(member_id, class_id).await.unwrap_err();
    assert!(matches!(err, BookingError::ClassNotFound(_)));

    // a full class wins over the duplicate rule
    let small_class = new_class(&service, "Spinning", 1).await;
    service.create_booking(member_id, small_class).await.unwrap();
    let err = service.create_booking(member_id, small_class).await.unwrap_err();
    assert!(matches!(err, BookingError::ClassFull { .. }));

    // an inactive member is reported first of all
    sqlx::query("UPDATE members SET active = FALSE WHERE id = $1")
        .bind(member_id)
        .execute(&pool)
        .await
        .unwrap();
    let err = service.create_booking(member_id, small_class).await.unwrap_err();
    assert!(matches!(err, BookingError::MemberNotFound(_)));
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn report_groups_month_bookings_by_class_type() {
    let (service, _pool) = test_service().await;
    let member_id = new_member(&service, PlanType::Quarterly).await;

    for _ in 0..3 {
        let class_id = new_class(&service, "Yoga", 10).await;
        service.create_booking(member_id, class_id).await.unwrap();
    }
    let pilates = new_class(&service, "Pilates", 10).await;
    service.create_booking(member_id, pilates).await.unwrap();

    let report = service.member_report(member_id).await.unwrap();
    assert_eq!(report.member_id, member_id);
    assert_eq!(report.plan, PlanType::Quarterly);
    assert_eq!(report.total_bookings_month, 4);
    assert_eq!(report.monthly_limit, 20);
    assert_eq!(report.class_type_frequencies.len(), 2);
    assert_eq!(report.class_type_frequencies[0].class_type, "Yoga");
    assert_eq!(report.class_type_frequencies[0].count, 3);
    assert_eq!(report.class_type_frequencies[1].class_type, "Pilates");
    assert_eq!(report.class_type_frequencies[1].count, 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn report_for_unknown_member_fails() {
    let (service, _pool) = test_service().await;
    let err = service.member_report(9_999_999).await.unwrap_err();
    assert!(matches!(err, BookingError::MemberNotFound(_)));
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn concurrent_admissions_never_oversell_a_class() {
    const CAPACITY: i32 = 3;
    const CONTENDERS: usize = 8;

    let (service, pool) = test_service().await;
    let class_id = new_class(&service, "Cross", CAPACITY).await;

    let mut members = Vec::new();
    for _ in 0..CONTENDERS {
        members.push(new_member(&service, PlanType::Annual).await);
    }

    let mut tasks = tokio::task::JoinSet::new();
    for member_id in members {
        let service = service.clone();
        tasks.spawn(async move { service.create_booking(member_id, class_id).await });
    }

    let mut successes = 0;
    let mut full_rejections = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.expect("admission task panicked") {
            Ok(_) => successes += 1,
            Err(BookingError::ClassFull { .. }) => full_rejections += 1,
            Err(other) => panic!("unexpected admission error: {:?}", other),
        }
    }

    assert_eq!(successes, CAPACITY as usize);
    assert_eq!(full_rejections, CONTENDERS - CAPACITY as usize);
    assert_eq!(occupied_seats(&pool, class_id).await, CAPACITY);
    assert_eq!(active_bookings(&pool, class_id).await, CAPACITY as i64);
}
