//! Subscription store.
//!
//! Users watch (plan, datacenter set, region) criteria. Identical criteria
//! are stored once and shared by every subscribed user; a subscription is
//! the membership edge between a user and a criterion.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{FromRow, Row};
use stockwatch_inventory::DatacenterSet;
use tracing::{debug, info};

use super::DbError;

/// A messaging platform user. The id doubles as the delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl User {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            username: None,
            first_name: None,
            last_name: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// How the user is addressed in messages.
    pub fn mention(&self) -> String {
        match (&self.username, &self.first_name) {
            (Some(username), _) => format!("@{username}"),
            (None, Some(first_name)) => first_name.clone(),
            (None, None) => format!("user {}", self.id),
        }
    }
}

/// A deduplicated watch criterion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchCriterion {
    pub id: i64,
    pub plan_code: String,
    pub datacenters: DatacenterSet,
    pub region: String,
    pub last_check: Option<DateTime<Utc>>,
    pub notifications: i64,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for WatchCriterion {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let datacenters: String = row.try_get("datacenters")?;
        Ok(Self {
            id: row.try_get("id")?,
            plan_code: row.try_get("plan_code")?,
            datacenters: DatacenterSet::parse(&datacenters),
            region: row.try_get("region")?,
            last_check: row.try_get("last_check")?,
            notifications: row.try_get("notifications")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// One of a user's subscriptions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSubscription {
    #[serde(flatten)]
    pub criterion: WatchCriterion,
    pub subscribed_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for UserSubscription {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            criterion: WatchCriterion::from_row(row)?,
            subscribed_at: row.try_get("subscribed_at")?,
        })
    }
}

/// A criterion together with everyone subscribed to it.
#[derive(Debug, Clone, PartialEq)]
pub struct CriterionEntry {
    pub criterion: WatchCriterion,
    pub subscribers: Vec<User>,
}

/// One page of the bulk scan.
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaPage {
    pub entries: Vec<CriterionEntry>,
    /// Number of criteria when the page was read.
    pub total: i64,
}

impl CriteriaPage {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ordering of the bulk scan. Every key is tie-broken by id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CriterionSort {
    #[default]
    Id,
    LastCheck,
    Notifications,
}

impl CriterionSort {
    fn order_by(self, alias: &str) -> String {
        match self {
            Self::Id => format!("{alias}.id ASC"),
            Self::LastCheck => format!("{alias}.last_check ASC, {alias}.id ASC"),
            Self::Notifications => format!("{alias}.notifications DESC, {alias}.id ASC"),
        }
    }
}

impl fmt::Display for CriterionSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id => write!(f, "id"),
            Self::LastCheck => write!(f, "last_check"),
            Self::Notifications => write!(f, "notifications"),
        }
    }
}

const CRITERION_COLUMNS: &str =
    "c.id, c.plan_code, c.datacenters, c.region, c.last_check, c.notifications, c.created_at";

/// Store for users, criteria and subscriptions.
#[derive(Debug, Clone)]
pub struct SubscriptionStore {
    pool: SqlitePool,
}

impl SubscriptionStore {
    /// Create a new subscription store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Subscribe a user to a criterion, creating the criterion on first use.
    ///
    /// Returns the criterion id. Fails with [`DbError::AlreadyExists`] when
    /// the user is already subscribed.
    pub async fn subscribe(
        &self,
        user: &User,
        region: &str,
        plan_code: &str,
        datacenters: &DatacenterSet,
    ) -> Result<i64, DbError> {
        let blob = serde_json::to_string(user)?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(DbError::Query)?;

        sqlx::query(
            r#"
            INSERT INTO users (user_id, user)
            VALUES (?, ?)
            ON CONFLICT (user_id) DO UPDATE SET user = excluded.user
            "#,
        )
        .bind(user.id)
        .bind(&blob)
        .execute(&mut *tx)
        .await
        .map_err(DbError::Query)?;

        let criterion_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO criteria (plan_code, datacenters, region, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (plan_code, datacenters, region)
            DO UPDATE SET plan_code = excluded.plan_code
            RETURNING id
            "#,
        )
        .bind(plan_code)
        .bind(datacenters.to_query())
        .bind(region)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(DbError::Query)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO subscriptions (user_id, criterion_id, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(user.id)
        .bind(criterion_id)
        .bind(now)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(DbError::AlreadyExists {
                    user_id: user.id,
                    criterion_id,
                });
            }
            Err(e) => return Err(DbError::Query(e)),
        }

        tx.commit().await.map_err(DbError::Query)?;

        info!(
            user_id = user.id,
            criterion_id,
            plan_code,
            region,
            datacenters = %datacenters,
            "User subscribed"
        );

        Ok(criterion_id)
    }

    /// Remove one subscription.
    pub async fn unsubscribe(&self, user_id: i64, criterion_id: i64) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = ? AND criterion_id = ?")
            .bind(user_id)
            .bind(criterion_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::Query)?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!(
                "subscription of user {user_id} to criterion {criterion_id}"
            )));
        }

        debug!(user_id, criterion_id, "Subscription removed");
        Ok(())
    }

    /// Remove every subscription of a user. Returns how many were removed.
    pub async fn unsubscribe_all(&self, user_id: i64) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::Query)?;

        let removed = result.rows_affected();
        if removed == 0 {
            return Err(DbError::NotFound(format!(
                "subscriptions of user {user_id}"
            )));
        }

        info!(user_id, removed, "All subscriptions removed");
        Ok(removed)
    }

    /// A user's subscriptions, ordered by criterion id.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<UserSubscription>, DbError> {
        let query = format!(
            r#"
            SELECT {CRITERION_COLUMNS}, s.created_at AS subscribed_at
            FROM subscriptions s
            JOIN criteria c ON c.id = s.criterion_id
            WHERE s.user_id = ?
            ORDER BY c.id ASC
            "#
        );

        let subscriptions = sqlx::query_as::<_, UserSubscription>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Query)?;

        if subscriptions.is_empty() {
            return Err(DbError::NotFound(format!(
                "subscriptions of user {user_id}"
            )));
        }

        Ok(subscriptions)
    }

    /// One page over all criteria, each with its full subscriber list.
    pub async fn list_page(
        &self,
        sort: CriterionSort,
        limit: i64,
        offset: i64,
    ) -> Result<CriteriaPage, DbError> {
        let query = format!(
            r#"
            SELECT {CRITERION_COLUMNS}, u.user AS user
            FROM (
                SELECT * FROM criteria
                ORDER BY {inner}
                LIMIT ? OFFSET ?
            ) AS c
            LEFT JOIN subscriptions s ON s.criterion_id = c.id
            LEFT JOIN users u ON u.user_id = s.user_id
            ORDER BY {outer}, s.user_id ASC
            "#,
            inner = sort.order_by("criteria"),
            outer = sort.order_by("c"),
        );

        let rows = sqlx::query(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Query)?;

        let mut entries: Vec<CriterionEntry> = Vec::new();
        for row in &rows {
            let criterion = WatchCriterion::from_row(row).map_err(DbError::Query)?;
            let blob: Option<String> = row.try_get("user").map_err(DbError::Query)?;
            let subscriber = blob
                .map(|b| serde_json::from_str::<User>(&b))
                .transpose()?;

            match entries.last_mut() {
                Some(entry) if entry.criterion.id == criterion.id => {
                    entry.subscribers.extend(subscriber);
                }
                _ => entries.push(CriterionEntry {
                    criterion,
                    subscribers: subscriber.into_iter().collect(),
                }),
            }
        }

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM criteria")
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::Query)?;

        Ok(CriteriaPage { entries, total })
    }

    /// Stamp a check and add to the notification counter.
    pub async fn record_check(&self, criterion_id: i64, notified: i64) -> Result<(), DbError> {
        let result = sqlx::query(
            r#"
            UPDATE criteria
            SET last_check = ?, notifications = notifications + ?
            WHERE id = ?
            "#,
        )
        .bind(Utc::now())
        .bind(notified)
        .bind(criterion_id)
        .execute(&self.pool)
        .await
        .map_err(DbError::Query)?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("criterion {criterion_id}")));
        }

        Ok(())
    }

    /// Fetch a criterion by id.
    pub async fn get_criterion(&self, criterion_id: i64) -> Result<WatchCriterion, DbError> {
        let query = format!("SELECT {CRITERION_COLUMNS} FROM criteria c WHERE c.id = ?");
        sqlx::query_as::<_, WatchCriterion>(&query)
            .bind(criterion_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::Query)?
            .ok_or_else(|| DbError::NotFound(format!("criterion {criterion_id}")))
    }

    /// Look up a criterion by its natural key.
    pub async fn find_criterion(
        &self,
        region: &str,
        plan_code: &str,
        datacenters: &DatacenterSet,
    ) -> Result<Option<WatchCriterion>, DbError> {
        let query = format!(
            r#"
            SELECT {CRITERION_COLUMNS} FROM criteria c
            WHERE c.plan_code = ? AND c.datacenters = ? AND c.region = ?
            "#
        );
        sqlx::query_as::<_, WatchCriterion>(&query)
            .bind(plan_code)
            .bind(datacenters.to_query())
            .bind(region)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::Query)
    }

    /// Number of users subscribed to a criterion.
    pub async fn subscriber_count(&self, criterion_id: i64) -> Result<i64, DbError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE criterion_id = ?")
            .bind(criterion_id)
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::Query)
    }

    /// Delete criteria nobody is subscribed to. Returns how many were removed.
    pub async fn reclaim_orphaned_criteria(&self) -> Result<u64, DbError> {
        let result = sqlx::query(
            r#"
            DELETE FROM criteria
            WHERE NOT EXISTS (
                SELECT 1 FROM subscriptions s WHERE s.criterion_id = criteria.id
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(DbError::Query)?;

        Ok(result.rows_affected())
    }
}
