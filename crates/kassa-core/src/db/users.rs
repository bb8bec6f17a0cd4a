//! User registration

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::User;

impl Database {
    /// Register a user on first contact
    ///
    /// Refreshes the display fields of a known user; `home_currency` and
    /// `created_at` keep their first values.
    pub fn upsert_user(
        &self,
        user_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
        home_currency: &str,
    ) -> Result<User> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO users (user_id, username, first_name, home_currency)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                username = COALESCE(excluded.username, username),
                first_name = COALESCE(excluded.first_name, first_name)
            "#,
            params![user_id, username, first_name, home_currency],
        )?;

        let user = conn.query_row(
            "SELECT user_id, username, first_name, home_currency, created_at FROM users WHERE user_id = ?",
            params![user_id],
            Self::row_to_user,
        )?;
        Ok(user)
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT user_id, username, first_name, home_currency, created_at FROM users WHERE user_id = ?",
                params![user_id],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let created_at: String = row.get(4)?;
        Ok(User {
            user_id: row.get(0)?,
            username: row.get(1)?,
            first_name: row.get(2)?,
            home_currency: row.get(3)?,
            created_at: parse_datetime(&created_at),
        })
    }
}
