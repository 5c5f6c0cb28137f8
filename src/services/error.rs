use crate::models::PlanType;

// Every rejection names the rule that failed and the numbers involved.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("member {0} not found or inactive")]
    MemberNotFound(i64),

    #[error("class {0} not found or inactive")]
    ClassNotFound(i64),

    #[error("class {class_id} is full: all {capacity_max} seats are taken")]
    ClassFull { class_id: i64, capacity_max: i32 },

    #[error("member already has {booked} bookings this month; the {plan} plan allows {limit}")]
    QuotaExceeded {
        plan: PlanType,
        limit: i64,
        booked: i64,
    },

    #[error("member {member_id} is already booked for class {class_id}")]
    DuplicateBooking { member_id: i64, class_id: i64 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("booking raced with concurrent updates on the same class; retry the request")]
    ConcurrencyConflict,

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_message_carries_plan_and_limit() {
        let err = BookingError::QuotaExceeded {
            plan: PlanType::Monthly,
            limit: 12,
            booked: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("monthly"));
        assert!(msg.contains("12"));
    }
}
