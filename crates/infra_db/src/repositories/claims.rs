//! Claims repository implementation
//!
//! SQL for the claims, cost_line, credit_note and suppliers tables. Every read
//! is parameterized by a [`ClaimQuery`]; optional criteria are bound as NULL
//! and short-circuited with `$n IS NULL OR ...` so one statement serves every
//! filter combination. Line queries always join their parent claim and apply
//! the same predicate to it.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use core_kernel::{ClaimId, CostLineId, CreditNoteId, SupplierId, TechnicianId};
use domain_claims::{
    Claim, ClaimQuery, ClaimStatus, CostLine, CreditNote, DateField, Joined, Supplier,
};

use crate::error::DatabaseError;

const CLAIM_COLUMNS: &str = "c.claim_id, c.claim_number, c.status, c.supplier_id, c.technician_id, \
     c.machine_model, c.warranty, c.department, c.root_cause, c.due_date, \
     c.created_at, c.closed_at, c.deleted_at, c.updated_at";

/// The two line tables share a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTable {
    CostLine,
    CreditNote,
}

impl LineTable {
    fn table(&self) -> &'static str {
        match self {
            LineTable::CostLine => "cost_line",
            LineTable::CreditNote => "credit_note",
        }
    }

    fn id_column(&self) -> &'static str {
        match self {
            LineTable::CostLine => "cost_line_id",
            LineTable::CreditNote => "credit_note_id",
        }
    }
}

/// Repository for claims and the lines booked on them
#[derive(Debug, Clone)]
pub struct ClaimsRepository {
    pool: PgPool,
}

impl ClaimsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Non-deleted claims matching the query, newest first
    pub async fn find_claims(&self, query: &ClaimQuery) -> Result<Vec<ClaimRow>, DatabaseError> {
        let sql = format!(
            "SELECT {CLAIM_COLUMNS} FROM claims c WHERE {} ORDER BY c.created_at DESC",
            claim_predicate(query.window.field)
        );
        let rows = bind_claim_query(sqlx::query_as::<_, ClaimRow>(&sql), query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Lines whose parent claim matches the query, narrowed by account code
    pub async fn find_lines(
        &self,
        table: LineTable,
        query: &ClaimQuery,
    ) -> Result<Vec<LineRow>, DatabaseError> {
        let sql = format!(
            "SELECT l.{id} AS line_id, l.amount, l.account_code, l.created_on, {CLAIM_COLUMNS} \
             FROM {table} l JOIN claims c ON c.claim_id = l.claim_id \
             WHERE {predicate} AND ($6::int4 IS NULL OR l.account_code = $6) \
             ORDER BY l.created_on DESC",
            id = table.id_column(),
            table = table.table(),
            predicate = claim_predicate(query.window.field),
        );
        let rows = bind_claim_query(sqlx::query_as::<_, LineRow>(&sql), query)
            .bind(query.criteria.account_code)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Every supplier, deleted ones included
    pub async fn list_suppliers(&self) -> Result<Vec<SupplierRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, SupplierRow>(
            "SELECT supplier_id, name, deleted_at FROM suppliers ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Allocates the next claim-number sequence value
    pub async fn next_claim_sequence(&self) -> Result<u64, DatabaseError> {
        let value = sqlx::query_scalar::<_, i64>("SELECT nextval('claim_number_seq')")
            .fetch_one(&self.pool)
            .await?;
        u64::try_from(value)
            .map_err(|_| DatabaseError::Decode(format!("negative claim sequence {}", value)))
    }

    pub async fn insert_claim(&self, claim: &Claim) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO claims (
                claim_id, claim_number, status, supplier_id, technician_id,
                machine_model, warranty, department, root_cause, due_date,
                created_at, closed_at, deleted_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(Uuid::from(claim.id))
        .bind(&claim.claim_number)
        .bind(claim.status.as_str())
        .bind(claim.supplier_id.map(Uuid::from))
        .bind(claim.technician_id.map(Uuid::from))
        .bind(&claim.machine_model)
        .bind(claim.warranty)
        .bind(&claim.department)
        .bind(&claim.root_cause)
        .bind(claim.due_date)
        .bind(claim.created_at)
        .bind(claim.closed_at)
        .bind(claim.deleted_at)
        .bind(claim.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Locks the claim row for the rest of the transaction
    pub async fn find_claim_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: ClaimId,
    ) -> Result<Option<ClaimRow>, DatabaseError> {
        let sql = format!("SELECT {CLAIM_COLUMNS} FROM claims c WHERE c.claim_id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row)
    }

    pub async fn save_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        claim: &Claim,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE claims SET status = $2, closed_at = $3, updated_at = $4 WHERE claim_id = $1",
        )
        .bind(Uuid::from(claim.id))
        .bind(claim.status.as_str())
        .bind(claim.closed_at)
        .bind(claim.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Sets `deleted_at` once; returns false if the claim does not exist
    pub async fn soft_delete_claim(&self, id: ClaimId, at: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE claims
            SET deleted_at = COALESCE(deleted_at, $2),
                updated_at = CASE WHEN deleted_at IS NULL THEN $2 ELSE updated_at END
            WHERE claim_id = $1
            "#,
        )
        .bind(Uuid::from(id))
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Inserts a line only if its claim exists and is not deleted.
    /// Returns false when nothing was inserted.
    pub async fn insert_line(
        &self,
        table: LineTable,
        id: Uuid,
        claim_id: ClaimId,
        amount: Decimal,
        account_code: Option<i32>,
        created_on: NaiveDate,
    ) -> Result<bool, DatabaseError> {
        let sql = format!(
            "INSERT INTO {table} ({id_column}, claim_id, amount, account_code, created_on) \
             SELECT $1, $2, $3, $4, $5 \
             WHERE EXISTS (SELECT 1 FROM claims WHERE claim_id = $2 AND deleted_at IS NULL)",
            table = table.table(),
            id_column = table.id_column(),
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(Uuid::from(claim_id))
            .bind(amount)
            .bind(account_code)
            .bind(created_on)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn insert_supplier(&self, supplier: &Supplier) -> Result<(), DatabaseError> {
        sqlx::query("INSERT INTO suppliers (supplier_id, name, deleted_at) VALUES ($1, $2, $3)")
            .bind(Uuid::from(supplier.id))
            .bind(&supplier.name)
            .bind(supplier.deleted_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// WHERE clause shared by claim and line reads; binds $1..$5
fn claim_predicate(field: DateField) -> String {
    let column = match field {
        DateField::Created => "c.created_at",
        DateField::Closed => "c.closed_at",
    };
    format!(
        "c.deleted_at IS NULL \
         AND ($1::uuid IS NULL OR c.supplier_id = $1) \
         AND ($2::uuid IS NULL OR c.technician_id = $2) \
         AND ($3::text IS NULL OR c.machine_model ILIKE $3) \
         AND {column} >= $4 AND {column} < $5"
    )
}

fn bind_claim_query<'q, O>(
    sql: QueryAs<'q, Postgres, O, PgArguments>,
    query: &ClaimQuery,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    sql.bind(query.criteria.supplier_id.map(Uuid::from))
        .bind(query.criteria.technician_id.map(Uuid::from))
        .bind(query.criteria.machine_model_like_pattern())
        .bind(query.window.range.start())
        .bind(query.window.range.end())
}

// ============================================================================
// Row types
// ============================================================================

/// Database row for a claim
#[derive(Debug, Clone, FromRow)]
pub struct ClaimRow {
    pub claim_id: Uuid,
    pub claim_number: String,
    pub status: String,
    pub supplier_id: Option<Uuid>,
    pub technician_id: Option<Uuid>,
    pub machine_model: String,
    pub warranty: bool,
    pub department: String,
    pub root_cause: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ClaimRow> for Claim {
    type Error = DatabaseError;

    fn try_from(row: ClaimRow) -> Result<Self, Self::Error> {
        let status: ClaimStatus = row
            .status
            .parse()
            .map_err(|e: domain_claims::ClaimError| DatabaseError::Decode(e.to_string()))?;

        Ok(Claim {
            id: ClaimId::from_uuid(row.claim_id),
            claim_number: row.claim_number,
            status,
            supplier_id: row.supplier_id.map(SupplierId::from_uuid),
            technician_id: row.technician_id.map(TechnicianId::from_uuid),
            machine_model: row.machine_model,
            warranty: row.warranty,
            department: row.department,
            root_cause: row.root_cause,
            due_date: row.due_date,
            created_at: row.created_at,
            closed_at: row.closed_at,
            deleted_at: row.deleted_at,
            updated_at: row.updated_at,
        })
    }
}

/// A cost line or credit note joined with its parent claim
#[derive(Debug, Clone, FromRow)]
pub struct LineRow {
    pub line_id: Uuid,
    pub amount: Decimal,
    pub account_code: Option<i32>,
    pub created_on: NaiveDate,
    #[sqlx(flatten)]
    pub claim: ClaimRow,
}

impl LineRow {
    pub fn into_cost_line(self) -> Result<Joined<CostLine>, DatabaseError> {
        let claim = Claim::try_from(self.claim)?;
        Ok(Joined {
            line: CostLine {
                id: CostLineId::from_uuid(self.line_id),
                claim_id: claim.id,
                amount: self.amount,
                account_code: self.account_code,
                created_on: self.created_on,
            },
            claim,
        })
    }

    pub fn into_credit_note(self) -> Result<Joined<CreditNote>, DatabaseError> {
        let claim = Claim::try_from(self.claim)?;
        Ok(Joined {
            line: CreditNote {
                id: CreditNoteId::from_uuid(self.line_id),
                claim_id: claim.id,
                amount: self.amount,
                account_code: self.account_code,
                created_on: self.created_on,
            },
            claim,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SupplierRow {
    pub supplier_id: Uuid,
    pub name: String,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Supplier {
            id: SupplierId::from_uuid(row.supplier_id),
            name: row.name,
            deleted_at: row.deleted_at,
        }
    }
}
