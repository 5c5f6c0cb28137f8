use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

// Subscription plans and how many classes each allows per calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "plan_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Monthly,
    Quarterly,
    Annual,
}

impl PlanType {
    pub fn quota(self) -> i64 {
        match self {
            PlanType::Monthly => 12,
            PlanType::Quarterly => 20,
            PlanType::Annual => 30,
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlanType::Monthly => "monthly",
            PlanType::Quarterly => "quarterly",
            PlanType::Annual => "annual",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub plan: PlanType,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Member {
    // Look up a member that has not been deactivated
    pub async fn find_active_by_id(
        id: i64,
        db: &crate::database::Database,
    ) -> Result<Option<Member>, sqlx::Error> {
        sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1 AND active")
            .bind(id)
            .fetch_optional(&db.pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_follows_plan_table() {
        assert_eq!(PlanType::Monthly.quota(), 12);
        assert_eq!(PlanType::Quarterly.quota(), 20);
        assert_eq!(PlanType::Annual.quota(), 30);
    }

    #[test]
    fn plan_names_are_lowercase() {
        assert_eq!(PlanType::Monthly.to_string(), "monthly");
        assert_eq!(PlanType::Quarterly.to_string(), "quarterly");
        assert_eq!(PlanType::Annual.to_string(), "annual");
    }
}
