// SQLite TicketRepository Implementation
//
// Every mutating operation is a single SQL statement, so each service call
// is one atomic unit of work. Dequeue is "update the selected row and return
// it" in one statement - there is no select-then-update window for a second
// dispatcher to slip through.

use async_trait::async_trait;
use lanekeeper_core::domain::{
    DomainError, Lane, LaneId, Ticket, TicketId, TicketStatus, User, UserId, UserProfile,
};
use lanekeeper_core::error::{AppError, Result};
use lanekeeper_core::port::{IssuedToken, TicketRepository};
use sqlx::SqlitePool;

// Helper to convert sqlx::Error to AppError with structured information
fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            if let Some(code) = db_err.code() {
                let code_str = code.as_ref();

                // SQLite error codes: https://www.sqlite.org/rescode.html
                match code_str {
                    "2067" | "1555" => {
                        // UNIQUE constraint failed
                        AppError::Conflict(format!(
                            "Unique constraint violation: {} ({})",
                            db_err.message(),
                            code_str
                        ))
                    }
                    "787" | "3850" => {
                        // FOREIGN KEY constraint failed
                        AppError::Database(format!(
                            "Foreign key constraint violation: {} ({})",
                            db_err.message(),
                            code_str
                        ))
                    }
                    "5" => {
                        // SQLITE_BUSY - database is locked
                        AppError::Database(format!(
                            "Database locked (SQLITE_BUSY): {}",
                            db_err.message()
                        ))
                    }
                    _ => AppError::Database(format!(
                        "Database error [{}]: {}",
                        code_str,
                        db_err.message()
                    )),
                }
            } else {
                AppError::Database(format!("Database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Database(format!("Column not found: {}", col))
        }
        _ => AppError::Database(err.to_string()),
    }
}

pub struct SqliteTicketRepository {
    pool: SqlitePool,
}

impl SqliteTicketRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TicketRepository for SqliteTicketRepository {
    async fn upsert_user(&self, profile: &UserProfile) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (external_id, address, display_name)
            VALUES (?, ?, ?)
            ON CONFLICT (external_id) DO UPDATE
                SET address = excluded.address, display_name = excluded.display_name
            RETURNING *
            "#,
        )
        .bind(&profile.external_id)
        .bind(&profile.address)
        .bind(&profile.display_name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into_user())
    }

    async fn find_user(&self, external_id: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE external_id = ?")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_user()))
    }

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_user()))
    }

    async fn ensure_lane(&self, lane: &Lane) -> Result<()> {
        sqlx::query("INSERT INTO lanes (id, title) VALUES (?, ?) ON CONFLICT (id) DO NOTHING")
            .bind(lane.id)
            .bind(&lane.title)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_lane(&self, id: LaneId) -> Result<Option<Lane>> {
        let row = sqlx::query_as::<_, LaneRow>("SELECT * FROM lanes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_lane()))
    }

    async fn list_lanes(&self) -> Result<Vec<Lane>> {
        let rows = sqlx::query_as::<_, LaneRow>("SELECT * FROM lanes ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(|r| r.into_lane()).collect())
    }

    async fn insert_waiting_ticket(
        &self,
        lane_id: LaneId,
        user_id: UserId,
        created_at: i64,
    ) -> Result<Ticket> {
        // The partial unique index on active tickets turns a concurrent
        // double-submission into a Conflict instead of a second active row
        let row = sqlx::query_as::<_, TicketRow>(
            r#"
            INSERT INTO tickets (lane_id, user_id, status, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(lane_id)
        .bind(user_id)
        .bind(TicketStatus::Waiting.to_string())
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.into_ticket()
    }

    async fn find_ticket(&self, id: TicketId) -> Result<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>("SELECT * FROM tickets WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|r| r.into_ticket()).transpose()
    }

    async fn find_active_ticket(&self, user_id: UserId) -> Result<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT * FROM tickets
            WHERE user_id = ? AND status IN (?, ?, ?)
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(TicketStatus::Waiting.to_string())
        .bind(TicketStatus::Called.to_string())
        .bind(TicketStatus::Confirmed.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|r| r.into_ticket()).transpose()
    }

    async fn claim_next_waiting(
        &self,
        lane_id: LaneId,
        now_millis: i64,
        token: &IssuedToken,
    ) -> Result<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(
            r#"
            UPDATE tickets
            SET status = ?, called_at = ?, confirm_token = ?, token_expires_at = ?
            WHERE id = (
                SELECT t.id FROM tickets t
                WHERE t.lane_id = ? AND t.status = ?
                ORDER BY t.created_at ASC, t.id ASC
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .bind(TicketStatus::Called.to_string())
        .bind(now_millis)
        .bind(&token.value)
        .bind(token.expires_at)
        .bind(lane_id)
        .bind(TicketStatus::Waiting.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|r| r.into_ticket()).transpose()
    }

    async fn claim_next_called(&self, lane_id: LaneId, now_millis: i64) -> Result<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(
            r#"
            UPDATE tickets
            SET status = ?, no_show_at = ?
            WHERE id = (
                SELECT t.id FROM tickets t
                WHERE t.lane_id = ? AND t.status = ?
                ORDER BY t.called_at ASC, t.id ASC
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .bind(TicketStatus::NoShow.to_string())
        .bind(now_millis)
        .bind(lane_id)
        .bind(TicketStatus::Called.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|r| r.into_ticket()).transpose()
    }

    async fn claim_next_confirmed(
        &self,
        lane_id: LaneId,
        now_millis: i64,
    ) -> Result<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(
            r#"
            UPDATE tickets
            SET status = ?, served_at = ?
            WHERE id = (
                SELECT t.id FROM tickets t
                WHERE t.lane_id = ? AND t.status = ?
                ORDER BY t.confirmed_at ASC, t.id ASC
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .bind(TicketStatus::Served.to_string())
        .bind(now_millis)
        .bind(lane_id)
        .bind(TicketStatus::Confirmed.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|r| r.into_ticket()).transpose()
    }

    async fn cancel_active_ticket(
        &self,
        user_id: UserId,
        now_millis: i64,
    ) -> Result<Option<Ticket>> {
        // At most one row qualifies (single-active-ticket invariant)
        let row = sqlx::query_as::<_, TicketRow>(
            r#"
            UPDATE tickets
            SET status = ?, canceled_at = ?
            WHERE user_id = ? AND status IN (?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(TicketStatus::Canceled.to_string())
        .bind(now_millis)
        .bind(user_id)
        .bind(TicketStatus::Waiting.to_string())
        .bind(TicketStatus::Called.to_string())
        .bind(TicketStatus::Confirmed.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|r| r.into_ticket()).transpose()
    }

    async fn confirm_by_token(&self, token: &str, now_millis: i64) -> Result<Option<Ticket>> {
        // Token check and status flip in one conditional update: a racing
        // no-show or second confirmation finds zero matching rows
        let row = sqlx::query_as::<_, TicketRow>(
            r#"
            UPDATE tickets
            SET status = ?, confirmed_at = ?
            WHERE confirm_token = ? AND status = ? AND token_expires_at >= ?
            RETURNING *
            "#,
        )
        .bind(TicketStatus::Confirmed.to_string())
        .bind(now_millis)
        .bind(token)
        .bind(TicketStatus::Called.to_string())
        .bind(now_millis)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|r| r.into_ticket()).transpose()
    }

    async fn waiting_position(&self, ticket: &Ticket) -> Result<i64> {
        // Rank = how many waiting tickets in the lane are at or before this
        // one in FIFO order. The EXISTS guard makes the query return 0 when
        // the ticket has already left the waiting set.
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM tickets w
            WHERE w.lane_id = ? AND w.status = ?
              AND (w.created_at < ? OR (w.created_at = ? AND w.id <= ?))
              AND EXISTS (SELECT 1 FROM tickets s WHERE s.id = ? AND s.status = ?)
            "#,
        )
        .bind(ticket.lane_id)
        .bind(TicketStatus::Waiting.to_string())
        .bind(ticket.created_at)
        .bind(ticket.created_at)
        .bind(ticket.id)
        .bind(ticket.id)
        .bind(TicketStatus::Waiting.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(count)
    }

    async fn list_waiting(&self, lane_id: LaneId, limit: i64) -> Result<Vec<Ticket>> {
        let rows: Vec<TicketRow> = sqlx::query_as(
            r#"
            SELECT * FROM tickets
            WHERE lane_id = ? AND status = ?
            ORDER BY created_at ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(lane_id)
        .bind(TicketStatus::Waiting.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(|r| r.into_ticket()).collect()
    }

    async fn count_created_between(
        &self,
        start_millis: i64,
        end_millis: i64,
        lane_id: Option<LaneId>,
    ) -> Result<i64> {
        let count: i64 = match lane_id {
            Some(lane_id) => sqlx::query_scalar(
                "SELECT COUNT(*) FROM tickets WHERE created_at >= ? AND created_at < ? AND lane_id = ?",
            )
            .bind(start_millis)
            .bind(end_millis)
            .bind(lane_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?,
            None => sqlx::query_scalar(
                "SELECT COUNT(*) FROM tickets WHERE created_at >= ? AND created_at < ?",
            )
            .bind(start_millis)
            .bind(end_millis)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?,
        };

        Ok(count)
    }

    async fn count_confirmed_between(
        &self,
        start_millis: i64,
        end_millis: i64,
        lane_id: Option<LaneId>,
    ) -> Result<i64> {
        let count: i64 = match lane_id {
            Some(lane_id) => sqlx::query_scalar(
                "SELECT COUNT(*) FROM tickets WHERE confirmed_at >= ? AND confirmed_at < ? AND lane_id = ?",
            )
            .bind(start_millis)
            .bind(end_millis)
            .bind(lane_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?,
            None => sqlx::query_scalar(
                "SELECT COUNT(*) FROM tickets WHERE confirmed_at >= ? AND confirmed_at < ?",
            )
            .bind(start_millis)
            .bind(end_millis)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?,
        };

        Ok(count)
    }
}

/// SQLite row representation of a user
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    external_id: String,
    address: String,
    display_name: String,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.id,
            external_id: self.external_id,
            address: self.address,
            display_name: self.display_name,
        }
    }
}

/// SQLite row representation of a lane
#[derive(Debug, sqlx::FromRow)]
struct LaneRow {
    id: i64,
    title: String,
}

impl LaneRow {
    fn into_lane(self) -> Lane {
        Lane {
            id: self.id,
            title: self.title,
        }
    }
}

/// SQLite row representation of a ticket
#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: i64,
    lane_id: i64,
    user_id: i64,
    status: String,
    created_at: i64,
    called_at: Option<i64>,
    confirmed_at: Option<i64>,
    served_at: Option<i64>,
    canceled_at: Option<i64>,
    no_show_at: Option<i64>,
    confirm_token: Option<String>,
    token_expires_at: Option<i64>,
}

impl TicketRow {
    // Unknown status text is a storage fault, not a fallback
    fn into_ticket(self) -> Result<Ticket> {
        let status: TicketStatus = self
            .status
            .parse()
            .map_err(|e: DomainError| AppError::Database(e.to_string()))?;

        Ok(Ticket {
            id: self.id,
            lane_id: self.lane_id,
            user_id: self.user_id,
            status,
            created_at: self.created_at,
            called_at: self.called_at,
            confirmed_at: self.confirmed_at,
            served_at: self.served_at,
            canceled_at: self.canceled_at,
            no_show_at: self.no_show_at,
            confirm_token: self.confirm_token,
            token_expires_at: self.token_expires_at,
        })
    }
}
