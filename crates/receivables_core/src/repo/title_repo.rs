//! Receivable title repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `titles` table.
//! - Own the single-statement unpaid -> paid transition.
//!
//! # Invariants
//! - Write paths call `ReceivableTitle::validate()` before SQL mutations.
//! - `update_title` never touches `is_paid`/`paid_date` and refuses paid rows.
//! - `mark_paid` succeeds at most once per title, even under concurrent calls.
//! - `create_titles` stores every title of the batch or none of them.
//! - Listing order is `due_date ASC, id ASC`.

use super::{
    bool_to_int, date_to_db, ensure_schema, parse_db_date, parse_db_uuid, ConflictError,
    EntityRef, RepoError, RepoResult,
};
use crate::model::amount::Amount;
use crate::model::customer::CustomerId;
use crate::model::title::{check_storable_date, ReceivableTitle, TitleId, TitleValidationError};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const TITLE_COLUMNS: &[&str] = &[
    "id",
    "customer_id",
    "description",
    "amount_cents",
    "issue_date",
    "due_date",
    "is_paid",
    "paid_date",
    "notes",
    "created_at",
    "updated_at",
];

const TITLE_SELECT_SQL: &str = "SELECT
    t.id,
    t.customer_id,
    t.description,
    t.amount_cents,
    t.issue_date,
    t.due_date,
    t.is_paid,
    t.paid_date,
    t.notes,
    t.created_at,
    t.updated_at,
    c.name AS customer_name
FROM titles t
JOIN customers c ON c.id = t.customer_id";

/// Title row joined with the owning customer's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleWithCustomer {
    pub title: ReceivableTitle,
    pub customer_name: String,
}

/// Query options for listing titles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleListQuery {
    pub customer_id: Option<CustomerId>,
}

/// Repository interface for title CRUD and payment operations.
pub trait TitleRepository {
    fn create_title(&self, title: &ReceivableTitle) -> RepoResult<TitleId>;
    /// Inserts all titles in one transaction; any failure stores nothing.
    fn create_titles(&self, titles: &[ReceivableTitle]) -> RepoResult<Vec<TitleId>>;
    fn update_title(&self, title: &ReceivableTitle) -> RepoResult<()>;
    fn get_title(&self, id: TitleId) -> RepoResult<Option<ReceivableTitle>>;
    fn list_titles(&self, query: &TitleListQuery) -> RepoResult<Vec<TitleWithCustomer>>;
    fn mark_paid(&self, id: TitleId, paid_on: NaiveDate) -> RepoResult<()>;
    fn delete_title(&self, id: TitleId) -> RepoResult<()>;
}

/// SQLite-backed title repository.
pub struct SqliteTitleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTitleRepository<'conn> {
    /// Wraps a connection whose schema has been migrated by `db::open_db`.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema(conn, "titles", TITLE_COLUMNS)?;
        Ok(Self { conn })
    }

    /// Explains why a conditional write on an unpaid row touched nothing.
    fn unchanged_reason(&self, id: TitleId) -> RepoError {
        match self.get_title(id) {
            Ok(Some(existing)) if existing.paid => ConflictError::TitleAlreadyPaid(id).into(),
            Ok(Some(_)) => RepoError::InvalidData(format!(
                "title {id} is unpaid but the conditional write matched no row"
            )),
            Ok(None) => RepoError::NotFound(EntityRef::Title(id)),
            Err(err) => err,
        }
    }
}

impl TitleRepository for SqliteTitleRepository<'_> {
    fn create_title(&self, title: &ReceivableTitle) -> RepoResult<TitleId> {
        insert_title(self.conn, title)?;
        Ok(title.id)
    }

    fn create_titles(&self, titles: &[ReceivableTitle]) -> RepoResult<Vec<TitleId>> {
        let tx = self.conn.unchecked_transaction()?;
        for title in titles {
            insert_title(&tx, title)?;
        }
        tx.commit()?;
        Ok(titles.iter().map(|title| title.id).collect())
    }

    fn update_title(&self, title: &ReceivableTitle) -> RepoResult<()> {
        title.validate()?;

        let changed = self.conn.execute(
            "UPDATE titles
             SET
                description = ?1,
                amount_cents = ?2,
                issue_date = ?3,
                due_date = ?4,
                notes = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?6
               AND is_paid = 0;",
            params![
                title.description.as_str(),
                title.amount.cents(),
                date_to_db(title.issue_date),
                date_to_db(title.due_date),
                title.notes.as_deref(),
                title.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(self.unchanged_reason(title.id));
        }

        Ok(())
    }

    fn get_title(&self, id: TitleId) -> RepoResult<Option<ReceivableTitle>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TITLE_SELECT_SQL} WHERE t.id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_title_row(row)?.title));
        }
        Ok(None)
    }

    fn list_titles(&self, query: &TitleListQuery) -> RepoResult<Vec<TitleWithCustomer>> {
        let mut sql = format!("{TITLE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(customer_id) = query.customer_id {
            sql.push_str(" AND t.customer_id = ?");
            bind_values.push(Value::Text(customer_id.to_string()));
        }

        sql.push_str(" ORDER BY t.due_date ASC, t.id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut titles = Vec::new();
        while let Some(row) = rows.next()? {
            titles.push(parse_title_row(row)?);
        }
        Ok(titles)
    }

    fn mark_paid(&self, id: TitleId, paid_on: NaiveDate) -> RepoResult<()> {
        check_storable_date("paid_date", paid_on)?;
        let paid_on_text = date_to_db(paid_on);
        let changed = self.conn.execute(
            "UPDATE titles
             SET
                is_paid = 1,
                paid_date = ?1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?2
               AND is_paid = 0
               AND issue_date <= ?1;",
            params![paid_on_text, id.to_string()],
        )?;

        if changed == 0 {
            return Err(match self.get_title(id) {
                Ok(Some(existing)) if existing.paid => ConflictError::TitleAlreadyPaid(id).into(),
                Ok(Some(existing)) => TitleValidationError::PaidBeforeIssue {
                    issue_date: existing.issue_date,
                    paid_date: paid_on,
                }
                .into(),
                Ok(None) => RepoError::NotFound(EntityRef::Title(id)),
                Err(err) => err,
            });
        }

        Ok(())
    }

    fn delete_title(&self, id: TitleId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM titles WHERE id = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Title(id)));
        }

        Ok(())
    }
}

fn customer_exists(conn: &Connection, id: CustomerId) -> RepoResult<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM customers WHERE id = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn insert_title(conn: &Connection, title: &ReceivableTitle) -> RepoResult<()> {
    title.validate()?;
    if !customer_exists(conn, title.customer_id)? {
        return Err(TitleValidationError::UnknownCustomer(title.customer_id).into());
    }

    conn.execute(
        "INSERT INTO titles (
            id,
            customer_id,
            description,
            amount_cents,
            issue_date,
            due_date,
            is_paid,
            paid_date,
            notes
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
        params![
            title.id.to_string(),
            title.customer_id.to_string(),
            title.description.as_str(),
            title.amount.cents(),
            date_to_db(title.issue_date),
            date_to_db(title.due_date),
            bool_to_int(title.paid),
            title.paid_date.map(date_to_db),
            title.notes.as_deref(),
        ],
    )?;
    Ok(())
}

fn parse_title_row(row: &Row<'_>) -> RepoResult<TitleWithCustomer> {
    let id_text: String = row.get("id")?;
    let id = parse_db_uuid(&id_text, "titles.id")?;
    let customer_text: String = row.get("customer_id")?;
    let customer_id = parse_db_uuid(&customer_text, "titles.customer_id")?;

    let issue_text: String = row.get("issue_date")?;
    let due_text: String = row.get("due_date")?;
    let paid_text: Option<String> = row.get("paid_date")?;

    let paid = match row.get::<_, i64>("is_paid")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_paid value `{other}` in titles.is_paid"
            )));
        }
    };

    let title = ReceivableTitle {
        id,
        customer_id,
        description: row.get("description")?,
        amount: Amount::from_cents(row.get("amount_cents")?),
        issue_date: parse_db_date(&issue_text, "titles.issue_date")?,
        due_date: parse_db_date(&due_text, "titles.due_date")?,
        paid,
        paid_date: paid_text
            .as_deref()
            .map(|text| parse_db_date(text, "titles.paid_date"))
            .transpose()?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    title.validate()?;

    Ok(TitleWithCustomer {
        title,
        customer_name: row.get("customer_name")?,
    })
}
