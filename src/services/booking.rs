//! Booking admission engine.
//!
//! All seat accounting goes through this service: admission checks run in a
//! fixed order inside a transaction, and the seat counter is only ever moved
//! by a conditional UPDATE so that `occupied_seats` stays within capacity and
//! equal to the number of active bookings, no matter how requests interleave.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::Serialize;
use sqlx::FromRow;
use tracing::{error, info, warn};

use crate::config::BookingConfig;
use crate::database::Database;
use crate::models::{Booking, ClassSession, Member, PlanType};
use crate::services::error::BookingError;

const MAX_MEMBER_NAME_LEN: usize = 100;
const MAX_CLASS_TYPE_LEN: usize = 50;
const MAX_CLASS_CAPACITY: i32 = 100;

const MONTH_BOOKINGS_SQL: &str = "SELECT COUNT(*) FROM bookings \
     WHERE member_id = $1 AND active AND created_at >= $2 AND created_at < $3";

#[derive(Clone)]
pub struct BookingService {
    db: Database,
    config: BookingConfig,
}

/* ---------- read models ---------- */

// Booking joined with the member and class it references, for listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BookingDetails {
    pub id: i64,
    pub member_id: i64,
    pub member_name: String,
    pub class_id: i64,
    pub class_type: String,
    pub class_scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassTypeFrequency {
    pub class_type: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberReport {
    pub member_id: i64,
    pub member_name: String,
    pub plan: PlanType,
    pub total_bookings_month: i64,
    pub monthly_limit: i64,
    pub class_type_frequencies: Vec<ClassTypeFrequency>,
}

impl BookingService {
    pub fn new(db: Database, config: BookingConfig) -> Self {
        Self { db, config }
    }

    /* ---------- members ---------- */

    pub async fn create_member(
        &self,
        name: &str,
        plan: PlanType,
    ) -> Result<Member, BookingError> {
        validate_member_name(name)?;

        let member = sqlx::query_as::<_, Member>(
            "INSERT INTO members (name, plan, active, created_at) \
             VALUES ($1, $2, TRUE, $3) RETURNING *",
        )
        .bind(name)
        .bind(plan)
        .bind(Utc::now())
        .fetch_one(&self.db.pool)
        .await?;

        info!("member {} registered on the {} plan", member.id, member.plan);
        Ok(member)
    }

    pub async fn list_members(&self) -> Result<Vec<Member>, BookingError> {
        let members =
            sqlx::query_as::<_, Member>("SELECT * FROM members WHERE active ORDER BY id")
                .fetch_all(&self.db.pool)
                .await?;
        Ok(members)
    }

    /* ---------- classes ---------- */

    pub async fn create_class(
        &self,
        class_type: &str,
        scheduled_at: DateTime<Utc>,
        capacity_max: i32,
    ) -> Result<ClassSession, BookingError> {
        validate_new_class(
            class_type,
            scheduled_at,
            capacity_max,
            self.config.min_lead_minutes,
            Utc::now(),
        )?;

        let class = sqlx::query_as::<_, ClassSession>(
            "INSERT INTO class_sessions \
             (class_type, scheduled_at, capacity_max, occupied_seats, active, created_at) \
             VALUES ($1, $2, $3, 0, TRUE, $4) RETURNING *",
        )
        .bind(class_type)
        .bind(scheduled_at)
        .bind(capacity_max)
        .bind(Utc::now())
        .fetch_one(&self.db.pool)
        .await?;

        info!(
            "class {} ({}) created with {} seats",
            class.id, class.class_type, class.capacity_max
        );
        Ok(class)
    }

    pub async fn list_classes(&self) -> Result<Vec<ClassSession>, BookingError> {
        let classes = sqlx::query_as::<_, ClassSession>(
            "SELECT * FROM class_sessions WHERE active ORDER BY id",
        )
        .fetch_all(&self.db.pool)
        .await?;
        Ok(classes)
    }

    /* ---------- admission ---------- */

    // Admits a booking request, retrying when the seat counter was raced.
    // Each retry re-runs the whole check sequence, so a loser that finds the
    // class full reports ClassFull rather than a transient conflict.
    pub async fn create_booking(
        &self,
        member_id: i64,
        class_id: i64,
    ) -> Result<Booking, BookingError> {
        for attempt in 0..=self.config.admission_retries {
            match self.try_admit(member_id, class_id).await {
                Err(BookingError::ConcurrencyConflict) => {
                    warn!(
                        "admission for member {} on class {} lost seat race (attempt {})",
                        member_id,
                        class_id,
                        attempt + 1
                    );
                    continue;
                }
                other => return other,
            }
        }
        Err(BookingError::ConcurrencyConflict)
    }

    // One admission attempt: ordered checks, then seat increment and booking
    // insert committed together.
    async fn try_admit(&self, member_id: i64, class_id: i64) -> Result<Booking, BookingError> {
        let now = Utc::now();
        let mut tx = self.db.pool.begin().await?;

        let member = sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1")
            .bind(member_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(member) = member.filter(|m| m.active) else {
            return Err(BookingError::MemberNotFound(member_id));
        };

        let class = sqlx::query_as::<_, ClassSession>("SELECT * FROM class_sessions WHERE id = $1")
            .bind(class_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(class) = class.filter(|c| c.active) else {
            return Err(BookingError::ClassNotFound(class_id));
        };

        if !class.has_available_seats() {
            return Err(BookingError::ClassFull {
                class_id,
                capacity_max: class.capacity_max,
            });
        }

        let (window_start, window_end) = month_window(now);
        let booked: i64 = sqlx::query_scalar(MONTH_BOOKINGS_SQL)
            .bind(member_id)
            .bind(window_start)
            .bind(window_end)
            .fetch_one(&mut *tx)
            .await?;
        let limit = member.plan.quota();
        if booked >= limit {
            return Err(BookingError::QuotaExceeded {
                plan: member.plan,
                limit,
                booked,
            });
        }

        let duplicate: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM bookings \
             WHERE member_id = $1 AND class_id = $2 AND active)",
        )
        .bind(member_id)
        .bind(class_id)
        .fetch_one(&mut *tx)
        .await?;
        if duplicate {
            return Err(BookingError::DuplicateBooking {
                member_id,
                class_id,
            });
        }

        // The seat is only taken if it is still free at write time; zero rows
        // means another transaction moved the counter since our read.
        let updated = sqlx::query(
            "UPDATE class_sessions SET occupied_seats = occupied_seats + 1 \
             WHERE id = $1 AND active AND occupied_seats < capacity_max",
        )
        .bind(class_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Err(BookingError::ConcurrencyConflict);
        }

        let inserted = sqlx::query_as::<_, Booking>(
            "INSERT INTO bookings (member_id, class_id, active, created_at) \
             VALUES ($1, $2, TRUE, $3) RETURNING *",
        )
        .bind(member_id)
        .bind(class_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await;

        let booking = match inserted {
            Ok(booking) => booking,
            // A concurrent admission slipped past the duplicate check; the
            // partial unique index turns that into a duplicate rejection.
            Err(e) if e.as_database_error().is_some_and(|d| d.is_unique_violation()) => {
                tx.rollback().await?;
                return Err(BookingError::DuplicateBooking {
                    member_id,
                    class_id,
                });
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;

        info!(
            "member {} booked class {} (booking {})",
            member_id, class_id, booking.id
        );
        Ok(booking)
    }

    /* ---------- cancellation ---------- */

    // Reverses a booking and releases its seat. Returns false when there is
    // nothing to cancel, so repeated cancellations are a no-op.
    pub async fn cancel_booking(&self, booking_id: i64) -> Result<bool, BookingError> {
        let mut tx = self.db.pool.begin().await?;

        let booking = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE id = $1 AND active",
        )
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(booking) = booking else {
            return Ok(false);
        };

        let released = sqlx::query("UPDATE bookings SET active = FALSE WHERE id = $1 AND active")
            .bind(booking_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if released == 0 {
            // a concurrent cancellation got here first
            tx.rollback().await?;
            return Ok(false);
        }

        let adjusted = sqlx::query(
            "UPDATE class_sessions SET occupied_seats = occupied_seats - 1 \
             WHERE id = $1 AND occupied_seats > 0",
        )
        .bind(booking.class_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if adjusted == 0 {
            error!(
                "seat counter for class {} was already at zero while cancelling booking {}",
                booking.class_id, booking_id
            );
        }

        tx.commit().await?;

        info!(
            "booking {} cancelled, seat released on class {}",
            booking_id, booking.class_id
        );
        Ok(true)
    }

    /* ---------- quota counter ---------- */

    // Active bookings of a member within the calendar month containing `instant`.
    pub async fn count_month_bookings(
        &self,
        member_id: i64,
        instant: DateTime<Utc>,
    ) -> Result<i64, BookingError> {
        let (window_start, window_end) = month_window(instant);
        let count: i64 = sqlx::query_scalar(MONTH_BOOKINGS_SQL)
            .bind(member_id)
            .bind(window_start)
            .bind(window_end)
            .fetch_one(&self.db.pool)
            .await?;
        Ok(count)
    }

    /* ---------- listings & report ---------- */

    pub async fn list_bookings(&self) -> Result<Vec<BookingDetails>, BookingError> {
        let bookings = sqlx::query_as::<_, BookingDetails>(
            "SELECT b.id, b.member_id, m.name AS member_name, b.class_id, \
                    cs.class_type, cs.scheduled_at AS class_scheduled_at, \
                    b.created_at, b.active \
             FROM bookings b \
             JOIN members m ON m.id = b.member_id \
             JOIN class_sessions cs ON cs.id = b.class_id \
             WHERE b.active \
             ORDER BY b.id",
        )
        .fetch_all(&self.db.pool)
        .await?;
        Ok(bookings)
    }

    pub async fn member_report(&self, member_id: i64) -> Result<MemberReport, BookingError> {
        let member = Member::find_active_by_id(member_id, &self.db)
            .await?
            .ok_or(BookingError::MemberNotFound(member_id))?;

        let (window_start, window_end) = month_window(Utc::now());
        let class_types: Vec<String> = sqlx::query_scalar(
            "SELECT cs.class_type \
             FROM bookings b \
             JOIN class_sessions cs ON cs.id = b.class_id \
             WHERE b.member_id = $1 AND b.active \
               AND b.created_at >= $2 AND b.created_at < $3 \
             ORDER BY b.created_at, b.id",
        )
        .bind(member_id)
        .bind(window_start)
        .bind(window_end)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(MemberReport {
            member_id: member.id,
            member_name: member.name,
            plan: member.plan,
            total_bookings_month: class_types.len() as i64,
            monthly_limit: member.plan.quota(),
            class_type_frequencies: class_type_frequencies(&class_types),
        })
    }
}

/* ---------- pure helpers ---------- */

// Half-open UTC window [first instant of the month, first instant of the next).
pub fn month_window(instant: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let (year, month) = (instant.year(), instant.month());
    let start = first_instant_of(year, month);
    let end = if month == 12 {
        first_instant_of(year + 1, 1)
    } else {
        first_instant_of(year, month + 1)
    };
    (start, end)
}

fn first_instant_of(year: i32, month: u32) -> DateTime<Utc> {
    // day 1 of a valid month always exists
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).unwrap()
}

// Groups class-type labels in first-encountered order, then sorts by count
// descending. The sort is stable, so ties keep their first-encountered order.
pub fn class_type_frequencies(class_types: &[String]) -> Vec<ClassTypeFrequency> {
    let mut groups: Vec<ClassTypeFrequency> = Vec::new();
    for class_type in class_types {
        match groups.iter_mut().find(|g| g.class_type == *class_type) {
            Some(group) => group.count += 1,
            None => groups.push(ClassTypeFrequency {
                class_type: class_type.clone(),
                count: 1,
            }),
        }
    }
    groups.sort_by(|a, b| b.count.cmp(&a.count));
    groups
}

pub fn validate_member_name(name: &str) -> Result<(), BookingError> {
    if name.trim().is_empty() {
        return Err(BookingError::InvalidInput(
            "member name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_MEMBER_NAME_LEN {
        return Err(BookingError::InvalidInput(format!(
            "member name must be at most {} characters",
            MAX_MEMBER_NAME_LEN
        )));
    }
    Ok(())
}

pub fn validate_new_class(
    class_type: &str,
    scheduled_at: DateTime<Utc>,
    capacity_max: i32,
    min_lead_minutes: i64,
    now: DateTime<Utc>,
) -> Result<(), BookingError> {
    if class_type.trim().is_empty() {
        return Err(BookingError::InvalidInput(
            "class type must not be empty".to_string(),
        ));
    }
    if class_type.chars().count() > MAX_CLASS_TYPE_LEN {
        return Err(BookingError::InvalidInput(format!(
            "class type must be at most {} characters",
            MAX_CLASS_TYPE_LEN
        )));
    }
    if !(1..=MAX_CLASS_CAPACITY).contains(&capacity_max) {
        return Err(BookingError::InvalidInput(format!(
            "class capacity must be between 1 and {}",
            MAX_CLASS_CAPACITY
        )));
    }
    if scheduled_at <= now + Duration::minutes(min_lead_minutes) {
        let message = if min_lead_minutes > 0 {
            format!(
                "class must be scheduled at least {} minutes in the future",
                min_lead_minutes
            )
        } else {
            "class must be scheduled in the future".to_string()
        };
        return Err(BookingError::InvalidInput(message));
    }
    Ok(())
}
