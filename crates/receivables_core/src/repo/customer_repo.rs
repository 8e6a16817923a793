//! Customer repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Write paths call `Customer::validate()` before SQL mutations.
//! - A customer referenced by any title is never deleted.
//! - Listing order is `name COLLATE NOCASE ASC, id ASC`.

use super::{ensure_schema, parse_db_uuid, ConflictError, EntityRef, RepoError, RepoResult};
use crate::model::customer::{ContactInfo, Customer, CustomerId};
use rusqlite::{params, Connection, Row};

const CUSTOMER_COLUMNS: &[&str] = &[
    "id",
    "name",
    "document",
    "phone",
    "email",
    "address",
    "notes",
    "created_at",
    "updated_at",
];

const CUSTOMER_SELECT_SQL: &str = "SELECT
    c.id,
    c.name,
    c.document,
    c.phone,
    c.email,
    c.address,
    c.notes,
    c.created_at,
    c.updated_at,
    (SELECT COUNT(*) FROM titles t WHERE t.customer_id = c.id) AS title_count
FROM customers c";

/// Customer row plus the number of titles it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerSummary {
    pub customer: Customer,
    pub title_count: u64,
}

/// Query options for listing customers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerListQuery {
    /// Case-insensitive substring over name, document and email.
    pub search: Option<String>,
}

/// Repository interface for customer CRUD operations.
pub trait CustomerRepository {
    fn create_customer(&self, customer: &Customer) -> RepoResult<CustomerId>;
    fn update_customer(&self, customer: &Customer) -> RepoResult<()>;
    fn get_customer(&self, id: CustomerId) -> RepoResult<Option<Customer>>;
    fn list_customers(&self, query: &CustomerListQuery) -> RepoResult<Vec<CustomerSummary>>;
    fn count_customers(&self) -> RepoResult<u64>;
    fn delete_customer(&self, id: CustomerId) -> RepoResult<()>;
}

/// SQLite-backed customer repository.
pub struct SqliteCustomerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCustomerRepository<'conn> {
    /// Wraps a connection whose schema has been migrated by `db::open_db`.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema(conn, "customers", CUSTOMER_COLUMNS)?;
        Ok(Self { conn })
    }

    fn title_count(&self, id: CustomerId) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM titles WHERE customer_id = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn exists(&self, id: CustomerId) -> RepoResult<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM customers WHERE id = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

impl CustomerRepository for SqliteCustomerRepository<'_> {
    fn create_customer(&self, customer: &Customer) -> RepoResult<CustomerId> {
        customer.validate()?;

        self.conn.execute(
            "INSERT INTO customers (
                id,
                name,
                document,
                phone,
                email,
                address,
                notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                customer.id.to_string(),
                customer.name.trim(),
                customer.contact.document.as_deref(),
                customer.contact.phone.as_deref(),
                customer.contact.email.as_deref(),
                customer.contact.address.as_deref(),
                customer.notes.as_deref(),
            ],
        )?;

        Ok(customer.id)
    }

    fn update_customer(&self, customer: &Customer) -> RepoResult<()> {
        customer.validate()?;

        let changed = self.conn.execute(
            "UPDATE customers
             SET
                name = ?1,
                document = ?2,
                phone = ?3,
                email = ?4,
                address = ?5,
                notes = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?7;",
            params![
                customer.name.trim(),
                customer.contact.document.as_deref(),
                customer.contact.phone.as_deref(),
                customer.contact.email.as_deref(),
                customer.contact.address.as_deref(),
                customer.notes.as_deref(),
                customer.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Customer(customer.id)));
        }

        Ok(())
    }

    fn get_customer(&self, id: CustomerId) -> RepoResult<Option<Customer>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CUSTOMER_SELECT_SQL} WHERE c.id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_customer_row(row)?.customer));
        }
        Ok(None)
    }

    fn list_customers(&self, query: &CustomerListQuery) -> RepoResult<Vec<CustomerSummary>> {
        let pattern = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(like_pattern);

        let mut stmt = self.conn.prepare(&format!(
            "{CUSTOMER_SELECT_SQL}
             WHERE ?1 IS NULL
                OR lower(c.name) LIKE ?1 ESCAPE '\\'
                OR lower(coalesce(c.document, '')) LIKE ?1 ESCAPE '\\'
                OR lower(coalesce(c.email, '')) LIKE ?1 ESCAPE '\\'
             ORDER BY c.name COLLATE NOCASE ASC, c.id ASC;"
        ))?;

        let mut rows = stmt.query([pattern])?;
        let mut customers = Vec::new();
        while let Some(row) = rows.next()? {
            customers.push(parse_customer_row(row)?);
        }
        Ok(customers)
    }

    fn count_customers(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM customers;", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn delete_customer(&self, id: CustomerId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM customers
             WHERE id = ?1
               AND NOT EXISTS (SELECT 1 FROM titles WHERE customer_id = ?1);",
            [id.to_string()],
        )?;
        if changed > 0 {
            return Ok(());
        }

        if !self.exists(id)? {
            return Err(RepoError::NotFound(EntityRef::Customer(id)));
        }
        Err(ConflictError::CustomerHasTitles {
            customer_id: id,
            title_count: self.title_count(id)?,
        }
        .into())
    }
}

fn parse_customer_row(row: &Row<'_>) -> RepoResult<CustomerSummary> {
    let id_text: String = row.get("id")?;
    let id = parse_db_uuid(&id_text, "customers.id")?;
    let title_count: i64 = row.get("title_count")?;

    let customer = Customer {
        id,
        name: row.get("name")?,
        contact: ContactInfo {
            document: row.get("document")?,
            phone: row.get("phone")?,
            email: row.get("email")?,
            address: row.get("address")?,
        },
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    customer.validate()?;

    Ok(CustomerSummary {
        customer,
        title_count: title_count.max(0) as u64,
    })
}

fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
