//! Category statistics and period summaries

use chrono::NaiveDate;
use rusqlite::params;

use super::{format_date, Database};
use crate::error::Result;
use crate::models::{Category, CategoryTotal, Direction, PeriodSummary};

impl Database {
    /// Totals per category for one direction within `[from, to]`
    ///
    /// Ordered by total descending; ties by category name.
    pub fn stats_by_category(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
        direction: Direction,
    ) -> Result<Vec<CategoryTotal>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT category, COALESCE(SUM(amount), 0) AS total, COUNT(*)
            FROM transactions
            WHERE user_id = ?1
              AND direction = ?2
              AND occurred_at BETWEEN ?3 AND ?4
            GROUP BY category
            ORDER BY total DESC, category ASC
            "#,
        )?;

        let rows = stmt.query_map(
            params![
                user_id,
                direction.as_str(),
                format_date(from),
                format_date(to)
            ],
            |row| {
                let category: String = row.get(0)?;
                Ok(CategoryTotal {
                    category: category.parse().unwrap_or(Category::Other),
                    total: row.get(1)?,
                    count: row.get(2)?,
                })
            },
        )?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Income/expense overview of `[from, to]`
    pub fn period_summary(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PeriodSummary> {
        let expenses_by_category = self.stats_by_category(user_id, from, to, Direction::Expense)?;

        let conn = self.conn()?;
        let (total_income, transfer_count): (f64, i64) = conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN direction = 'income' THEN amount END), 0),
                COUNT(CASE WHEN direction = 'transfer' THEN 1 END)
            FROM transactions
            WHERE user_id = ?1 AND occurred_at BETWEEN ?2 AND ?3
            "#,
            params![user_id, format_date(from), format_date(to)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(PeriodSummary {
            from,
            to,
            total_expenses: expenses_by_category.iter().map(|c| c.total).sum(),
            expenses_by_category,
            total_income,
            transfer_count,
        })
    }
}
