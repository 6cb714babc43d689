use crate::{
    errors::AppError,
    structs::{Admin, CompanyId, Expense, ExpensePatch, NewExpense, User, Vendor},
    AppState,
};

const EXPENSE_COLUMNS: &str = "company_name, gst_number, expense_type, expense_type_flag, \
     date, invoice_number, vendor_name, invoice_amount, purpose, purchased_by, \
     invoice_copy, qrcode, amount_paid_by, payment_type, payment_type_flag, \
     amount_paid, payment_screenshot, submitted_by, created_at, status";

/// Create all tables if they do not exist yet. Idempotent; runs at startup.
pub async fn init_schema(pool: &sqlx::SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            approved BOOLEAN NOT NULL DEFAULT 0,
            role TEXT NOT NULL DEFAULT 'user',
            created_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS admins (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS vendors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    for company in [CompanyId::CompanyA, CompanyId::CompanyB, CompanyId::CompanyC] {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company_name TEXT NOT NULL,
                gst_number TEXT,
                expense_type TEXT NOT NULL,
                expense_type_flag INTEGER NOT NULL DEFAULT 0,
                date TEXT NOT NULL,
                invoice_number TEXT,
                vendor_name TEXT,
                invoice_amount TEXT,
                purpose TEXT,
                purchased_by TEXT,
                invoice_copy TEXT,
                qrcode TEXT,
                amount_paid_by TEXT,
                payment_type TEXT,
                payment_type_flag INTEGER,
                amount_paid TEXT,
                payment_screenshot TEXT,
                submitted_by TEXT,
                created_at TEXT NOT NULL,
                status TEXT DEFAULT 'Pending'
            )",
            company.table()
        );
        sqlx::query(&ddl).execute(pool).await?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Users & admins
// ---------------------------------------------------------------------------

pub async fn get_user_by_email(state: &AppState, email: &str) -> Result<Option<User>, sqlx::Error> {
    let pool = state.db_pool.clone();
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(&pool)
        .await
}

pub async fn get_admin_by_email(
    state: &AppState,
    email: &str,
) -> Result<Option<Admin>, sqlx::Error> {
    let pool = state.db_pool.clone();
    sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE email = $1")
        .bind(email)
        .fetch_optional(&pool)
        .await
}

/// Insert a new user. Always unapproved and role "user"; approval is an
/// admin action and role never comes from the client.
pub async fn create_user(
    state: &AppState,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, AppError> {
    let created_at = chrono::Utc::now().to_string();
    let pool = state.db_pool.clone();
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email, password_hash, approved, role, created_at)
         VALUES ($1, $2, $3, 0, 'user', $4) RETURNING *",
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(&created_at)
    .fetch_one(&pool)
    .await?;
    log::info!("User registered: {}", user.email);
    Ok(user)
}

pub async fn create_admin(
    state: &AppState,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<Admin, AppError> {
    let created_at = chrono::Utc::now().to_string();
    let pool = state.db_pool.clone();
    let admin = sqlx::query_as::<_, Admin>(
        "INSERT INTO admins (username, email, password_hash, created_at)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(&created_at)
    .fetch_one(&pool)
    .await?;
    log::info!("Admin created: {}", admin.email);
    Ok(admin)
}

pub async fn get_all_users(state: &AppState) -> Result<Vec<User>, sqlx::Error> {
    let pool = state.db_pool.clone();
    sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC, id DESC")
        .fetch_all(&pool)
        .await
}

pub async fn approve_user(state: &AppState, id: i64) -> Result<bool, sqlx::Error> {
    let pool = state.db_pool.clone();
    let result = sqlx::query("UPDATE users SET approved = 1 WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_user(state: &AppState, id: i64) -> Result<bool, sqlx::Error> {
    let pool = state.db_pool.clone();
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;
    if result.rows_affected() > 0 {
        log::info!("User with id {} deleted", id);
        Ok(true)
    } else {
        Ok(false)
    }
}

// ---------------------------------------------------------------------------
// Vendors
// ---------------------------------------------------------------------------

pub async fn get_all_vendors(state: &AppState) -> Result<Vec<Vendor>, sqlx::Error> {
    let pool = state.db_pool.clone();
    sqlx::query_as::<_, Vendor>("SELECT * FROM vendors ORDER BY name")
        .fetch_all(&pool)
        .await
}

pub async fn get_vendor_by_name(
    state: &AppState,
    name: &str,
) -> Result<Option<Vendor>, sqlx::Error> {
    let pool = state.db_pool.clone();
    sqlx::query_as::<_, Vendor>("SELECT * FROM vendors WHERE name = $1")
        .bind(name)
        .fetch_optional(&pool)
        .await
}

pub async fn create_vendor(state: &AppState, name: &str) -> Result<Vendor, AppError> {
    let created_at = chrono::Utc::now().to_string();
    let pool = state.db_pool.clone();
    let vendor = sqlx::query_as::<_, Vendor>(
        "INSERT INTO vendors (name, created_at) VALUES ($1, $2) RETURNING *",
    )
    .bind(name)
    .bind(&created_at)
    .fetch_one(&pool)
    .await?;
    log::info!("Vendor created: {}", vendor.name);
    Ok(vendor)
}

// ---------------------------------------------------------------------------
// Expenses, dispatched by company
// ---------------------------------------------------------------------------

pub async fn create_expense(
    state: &AppState,
    company: CompanyId,
    new: NewExpense,
) -> Result<Expense, AppError> {
    let created_at = chrono::Utc::now().to_string();
    let status = new.status.unwrap_or_else(|| "Pending".to_string());
    let query = format!(
        "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, \
         $11, $12, $13, $14, $15, $16, $17, $18, $19, $20) RETURNING *",
        company.table(),
        EXPENSE_COLUMNS
    );
    let pool = state.db_pool.clone();
    let expense = sqlx::query_as::<_, Expense>(&query)
        .bind(&new.company_name)
        .bind(&new.gst_number)
        .bind(&new.expense_type)
        .bind(new.expense_type_flag)
        .bind(&new.date)
        .bind(&new.invoice_number)
        .bind(&new.vendor_name)
        .bind(&new.invoice_amount)
        .bind(&new.purpose)
        .bind(&new.purchased_by)
        .bind(&new.invoice_copy)
        .bind(&new.qrcode)
        .bind(&new.amount_paid_by)
        .bind(&new.payment_type)
        .bind(new.payment_type_flag)
        .bind(&new.amount_paid)
        .bind(&new.payment_screenshot)
        .bind(&new.submitted_by)
        .bind(&created_at)
        .bind(&status)
        .fetch_one(&pool)
        .await?;
    log::info!(
        "Expense {} created in {} by {:?}",
        expense.id,
        company.table(),
        expense.submitted_by
    );
    Ok(expense)
}

pub async fn list_expenses(
    state: &AppState,
    company: CompanyId,
    limit: i64,
    skip: i64,
) -> Result<Vec<Expense>, sqlx::Error> {
    let query = format!(
        "SELECT * FROM {} ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
        company.table()
    );
    let pool = state.db_pool.clone();
    sqlx::query_as::<_, Expense>(&query)
        .bind(limit)
        .bind(skip)
        .fetch_all(&pool)
        .await
}

pub async fn get_expense(
    state: &AppState,
    company: CompanyId,
    id: i64,
) -> Result<Option<Expense>, sqlx::Error> {
    let query = format!("SELECT * FROM {} WHERE id = $1", company.table());
    let pool = state.db_pool.clone();
    sqlx::query_as::<_, Expense>(&query)
        .bind(id)
        .fetch_optional(&pool)
        .await
}

enum Bind {
    Text(String),
    Int(i64),
}

fn push_set(sets: &mut Vec<String>, args: &mut Vec<Bind>, column: &str, value: Bind) {
    args.push(value);
    sets.push(format!("{} = ${}", column, args.len()));
}

/// Apply a partial patch to one expense row. Only present fields are
/// written; derived flags arrive pre-paired with their string value.
/// `None` when the row does not exist.
pub async fn update_expense(
    state: &AppState,
    company: CompanyId,
    id: i64,
    patch: ExpensePatch,
) -> Result<Option<Expense>, AppError> {
    let mut sets: Vec<String> = Vec::new();
    let mut args: Vec<Bind> = Vec::new();

    if let Some(v) = patch.gst_number {
        push_set(&mut sets, &mut args, "gst_number", Bind::Text(v));
    }
    if let Some((value, flag)) = patch.expense_type {
        push_set(&mut sets, &mut args, "expense_type", Bind::Text(value));
        push_set(&mut sets, &mut args, "expense_type_flag", Bind::Int(flag));
    }
    if let Some(v) = patch.date {
        push_set(&mut sets, &mut args, "date", Bind::Text(v));
    }
    if let Some(v) = patch.invoice_number {
        push_set(&mut sets, &mut args, "invoice_number", Bind::Text(v));
    }
    if let Some(v) = patch.vendor_name {
        push_set(&mut sets, &mut args, "vendor_name", Bind::Text(v));
    }
    if let Some(v) = patch.invoice_amount {
        push_set(&mut sets, &mut args, "invoice_amount", Bind::Text(v));
    }
    if let Some(v) = patch.purpose {
        push_set(&mut sets, &mut args, "purpose", Bind::Text(v));
    }
    if let Some(v) = patch.purchased_by {
        push_set(&mut sets, &mut args, "purchased_by", Bind::Text(v));
    }
    if let Some(v) = patch.invoice_copy {
        push_set(&mut sets, &mut args, "invoice_copy", Bind::Text(v));
    }
    if let Some(v) = patch.qrcode {
        push_set(&mut sets, &mut args, "qrcode", Bind::Text(v));
    }
    if let Some(v) = patch.amount_paid_by {
        push_set(&mut sets, &mut args, "amount_paid_by", Bind::Text(v));
    }
    if let Some((value, flag)) = patch.payment_type {
        push_set(&mut sets, &mut args, "payment_type", Bind::Text(value));
        push_set(&mut sets, &mut args, "payment_type_flag", Bind::Int(flag));
    }
    if let Some(v) = patch.amount_paid {
        push_set(&mut sets, &mut args, "amount_paid", Bind::Text(v));
    }
    if let Some(v) = patch.payment_screenshot {
        push_set(&mut sets, &mut args, "payment_screenshot", Bind::Text(v));
    }
    if let Some(v) = patch.submitted_by {
        push_set(&mut sets, &mut args, "submitted_by", Bind::Text(v));
    }
    if let Some(v) = patch.status {
        push_set(&mut sets, &mut args, "status", Bind::Text(v));
    }

    if sets.is_empty() {
        return Ok(get_expense(state, company, id).await?);
    }

    let query = format!(
        "UPDATE {} SET {} WHERE id = ${} RETURNING *",
        company.table(),
        sets.join(", "),
        args.len() + 1
    );

    let mut q = sqlx::query_as::<_, Expense>(&query);
    for arg in args {
        q = match arg {
            Bind::Text(v) => q.bind(v),
            Bind::Int(v) => q.bind(v),
        };
    }
    q = q.bind(id);

    let pool = state.db_pool.clone();
    let expense = q.fetch_optional(&pool).await?;
    if expense.is_some() {
        log::info!("Expense {} updated in {}", id, company.table());
    }
    Ok(expense)
}

pub async fn delete_expense(
    state: &AppState,
    company: CompanyId,
    id: i64,
) -> Result<bool, sqlx::Error> {
    let query = format!("DELETE FROM {} WHERE id = $1", company.table());
    let pool = state.db_pool.clone();
    let result = sqlx::query(&query).bind(id).execute(&pool).await?;
    if result.rows_affected() > 0 {
        log::info!("Expense {} deleted from {}", id, company.table());
        Ok(true)
    } else {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use jsonwebtoken::Algorithm;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_state() -> AppState {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        init_schema(&pool).await.expect("schema");
        AppState {
            db_pool: pool,
            config: Config {
                database_url: String::new(),
                bind_addr: String::new(),
                jwt_secret: "test-secret".into(),
                jwt_algorithm: Algorithm::HS256,
                token_ttl_minutes: 60,
                upload_dir: "uploads".into(),
            },
        }
    }

    fn sample_expense(company_name: &str) -> NewExpense {
        NewExpense {
            company_name: company_name.to_string(),
            expense_type: "Purchase".to_string(),
            expense_type_flag: 0,
            date: "2024-01-15".to_string(),
            submitted_by: Some("tester".to_string()),
            ..NewExpense::default()
        }
    }

    #[tokio::test]
    async fn registered_users_start_unapproved() {
        let state = test_state().await;
        let user = create_user(&state, "alice", "alice@example.com", "hash")
            .await
            .unwrap();
        assert!(!user.approved);
        assert_eq!(user.role, "user");

        assert!(approve_user(&state, user.id).await.unwrap());
        let approved = get_user_by_email(&state, "alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(approved.approved);

        assert!(!approve_user(&state, 9999).await.unwrap());
    }

    #[tokio::test]
    async fn expense_create_defaults_status_to_pending() {
        let state = test_state().await;
        let expense = create_expense(&state, CompanyId::CompanyA, sample_expense("company_a"))
            .await
            .unwrap();
        assert_eq!(expense.status.as_deref(), Some("Pending"));
        assert_eq!(expense.expense_type_flag, 0);
        assert_eq!(expense.invoice_copy, None);
        assert_eq!(expense.payment_type_flag, None);
    }

    #[tokio::test]
    async fn expenses_are_scoped_to_their_company_table() {
        let state = test_state().await;
        let created = create_expense(&state, CompanyId::CompanyA, sample_expense("company_a"))
            .await
            .unwrap();

        assert!(get_expense(&state, CompanyId::CompanyA, created.id)
            .await
            .unwrap()
            .is_some());
        assert!(get_expense(&state, CompanyId::CompanyB, created.id)
            .await
            .unwrap()
            .is_none());
        assert!(list_expenses(&state, CompanyId::CompanyB, 100, 0)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn patch_touches_only_present_fields() {
        let state = test_state().await;
        let created = create_expense(&state, CompanyId::CompanyC, sample_expense("company_c"))
            .await
            .unwrap();

        let patch = ExpensePatch {
            expense_type: Some(("Others".to_string(), 1)),
            status: Some("Completed".to_string()),
            ..ExpensePatch::default()
        };
        let updated = update_expense(&state, CompanyId::CompanyC, created.id, patch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.expense_type, "Others");
        assert_eq!(updated.expense_type_flag, 1);
        assert_eq!(updated.status.as_deref(), Some("Completed"));
        // untouched fields survive
        assert_eq!(updated.date, "2024-01-15");
        assert_eq!(updated.submitted_by.as_deref(), Some("tester"));

        let missing = update_expense(
            &state,
            CompanyId::CompanyC,
            9999,
            ExpensePatch {
                status: Some("Completed".to_string()),
                ..ExpensePatch::default()
            },
        )
        .await
        .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_went_away() {
        let state = test_state().await;
        let created = create_expense(&state, CompanyId::CompanyB, sample_expense("company_b"))
            .await
            .unwrap();
        assert!(delete_expense(&state, CompanyId::CompanyB, created.id)
            .await
            .unwrap());
        assert!(!delete_expense(&state, CompanyId::CompanyB, created.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn vendors_are_unique_and_name_ordered() {
        let state = test_state().await;
        create_vendor(&state, "Zeta Supplies").await.unwrap();
        create_vendor(&state, "Acme Traders").await.unwrap();

        assert!(get_vendor_by_name(&state, "Acme Traders")
            .await
            .unwrap()
            .is_some());
        assert!(get_vendor_by_name(&state, "Nobody").await.unwrap().is_none());

        let vendors = get_all_vendors(&state).await.unwrap();
        let names: Vec<&str> = vendors.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Acme Traders", "Zeta Supplies"]);
    }
}
