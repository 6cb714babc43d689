use actix_multipart::form::{tempfile::TempFile, text::Text, MultipartForm};
use actix_web::{
    delete, get, post, put,
    web::{self, Data},
    HttpRequest, HttpResponse, Responder,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth, db,
    errors::AppError,
    structs::{CompanyId, Expense, ExpensePatch, NewExpense},
    uploads::{self, Category},
    utils, AppState,
};

#[get("/")]
pub async fn root_handler() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "message": "Backend running successfully!" }))
}

// ---------------------------------------------------------------------------
// /auth
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Self-registration. The account starts unapproved with role "user" no
/// matter what the client sends.
#[post("/register")]
pub async fn register_handler(
    web::Json(body): web::Json<RegisterRequest>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    if db::get_user_by_email(&state, &body.email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".into()));
    }
    let hashed = auth::hash_password(&body.password)?;
    let user = db::create_user(&state, &body.username, &body.email, &hashed).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// OAuth2-style password form: `username` carries the email address.
#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
    role: &'static str,
}

/// The admins table is consulted first; an email present in both tables
/// logs in as admin.
#[post("/login")]
pub async fn login_handler(
    web::Form(form): web::Form<LoginForm>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    if let Some(admin) = db::get_admin_by_email(&state, &form.username).await? {
        if auth::verify_password(&form.password, &admin.password_hash)? {
            let token = auth::issue_token(&admin.email, "admin", &state.config)?;
            return Ok(HttpResponse::Ok().json(TokenResponse {
                access_token: token,
                token_type: "bearer",
                role: "admin",
            }));
        }
    }

    let user = db::get_user_by_email(&state, &form.username)
        .await?
        .ok_or_else(|| AppError::InvalidInput("Invalid credentials".into()))?;
    if !auth::verify_password(&form.password, &user.password_hash)? {
        return Err(AppError::InvalidInput("Invalid credentials".into()));
    }
    if !user.approved {
        return Err(AppError::Forbidden("User not approved by admin".into()));
    }

    let token = auth::issue_token(&user.email, "user", &state.config)?;
    Ok(HttpResponse::Ok().json(TokenResponse {
        access_token: token,
        token_type: "bearer",
        role: "user",
    }))
}

// ---------------------------------------------------------------------------
// /admin
// ---------------------------------------------------------------------------

#[get("/users")]
pub async fn list_users_handler(
    state: Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    auth::current_admin(&state, &request).await?;
    let users = db::get_all_users(&state).await?;
    Ok(HttpResponse::Ok().json(users))
}

#[post("/approve/{user_id}")]
pub async fn approve_user_handler(
    path: web::Path<i64>,
    state: Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    auth::current_admin(&state, &request).await?;
    if !db::approve_user(&state, path.into_inner()).await? {
        return Err(AppError::NotFound("User".into()));
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({ "detail": "User approved" })))
}

#[delete("/user/{user_id}")]
pub async fn delete_user_handler(
    path: web::Path<i64>,
    state: Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    auth::current_admin(&state, &request).await?;
    if !db::delete_user(&state, path.into_inner()).await? {
        return Err(AppError::NotFound("User".into()));
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({ "detail": "User deleted" })))
}

// ---------------------------------------------------------------------------
// /user
// ---------------------------------------------------------------------------

#[get("/me")]
pub async fn me_handler(
    state: Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    let user = auth::current_user(&state, &request).await?;
    Ok(HttpResponse::Ok().json(user))
}

// ---------------------------------------------------------------------------
// /expenses
// ---------------------------------------------------------------------------

#[derive(Debug, MultipartForm)]
pub struct CreateExpenseForm {
    pub company_name: Text<String>,
    pub gst_number: Option<Text<String>>,
    pub expense_type: Text<String>,
    pub date: Text<String>,
    pub invoice_number: Option<Text<String>>,
    pub vendor_name: Option<Text<String>>,
    pub invoice_amount: Option<Text<String>>,
    pub purpose: Option<Text<String>>,
    pub purchased_by: Option<Text<String>>,
    pub amount_paid_by: Option<Text<String>>,
    pub payment_type: Option<Text<String>>,
    pub amount_paid: Option<Text<String>>,
    pub status: Option<Text<String>>,
    pub invoice_copy: Option<TempFile>,
    pub qrcode: Option<TempFile>,
    pub payment_screenshot: Option<TempFile>,
}

fn text(value: Option<Text<String>>) -> Option<String> {
    value.map(|t| t.into_inner())
}

#[post("/create")]
pub async fn create_expense_handler(
    MultipartForm(form): MultipartForm<CreateExpenseForm>,
    state: Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    let principal = auth::current_principal(&state, &request).await?;

    let company_name = form.company_name.into_inner();
    let company = CompanyId::from_name(&company_name)
        .ok_or_else(|| AppError::InvalidInput("Unknown company".into()))?;

    let (expense_type, expense_type_flag) = utils::normalize_expense_type(&form.expense_type);
    let payment = form
        .payment_type
        .as_deref()
        .and_then(|raw| utils::normalize_payment_type(raw));
    let (payment_type, payment_type_flag) = match payment {
        Some((value, flag)) => (Some(value), Some(flag)),
        None => (None, None),
    };
    let date = utils::parse_expense_date(&form.date)?;

    let upload_dir = &state.config.upload_dir;
    let invoice_copy = uploads::save_upload(form.invoice_copy.as_ref(), upload_dir, Category::Invoice)?;
    let qrcode = uploads::save_upload(form.qrcode.as_ref(), upload_dir, Category::Qrcode)?;
    let payment_screenshot =
        uploads::save_upload(form.payment_screenshot.as_ref(), upload_dir, Category::Screenshot)?;

    let new = NewExpense {
        company_name,
        gst_number: text(form.gst_number),
        expense_type,
        expense_type_flag,
        date,
        invoice_number: text(form.invoice_number),
        vendor_name: text(form.vendor_name),
        invoice_amount: text(form.invoice_amount),
        purpose: text(form.purpose),
        purchased_by: text(form.purchased_by),
        invoice_copy,
        qrcode,
        amount_paid_by: text(form.amount_paid_by),
        payment_type,
        payment_type_flag,
        amount_paid: text(form.amount_paid),
        payment_screenshot,
        submitted_by: Some(principal.username().to_string()),
        status: text(form.status),
    };

    let expense = db::create_expense(&state, company, new).await?;
    Ok(HttpResponse::Ok().json(expense))
}

fn default_limit() -> i64 {
    100
}

#[derive(Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Listing under an unknown company answers an empty list, not an error.
#[get("/company/{company_name}")]
pub async fn list_company_expenses_handler(
    path: web::Path<String>,
    params: web::Query<ListParams>,
    state: Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    auth::current_principal(&state, &request).await?;
    let expenses = match CompanyId::from_name(&path) {
        Some(company) => db::list_expenses(&state, company, params.limit, params.skip).await?,
        None => Vec::new(),
    };
    Ok(HttpResponse::Ok().json(expenses))
}

async fn find_expense(
    state: &AppState,
    company_name: &str,
    id: i64,
) -> Result<(CompanyId, Expense), AppError> {
    // an unknown company and a missing row answer identically
    let company = CompanyId::from_name(company_name)
        .ok_or_else(|| AppError::NotFound("Expense".into()))?;
    let expense = db::get_expense(state, company, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Expense".into()))?;
    Ok((company, expense))
}

#[get("/{company_name}/{expense_id}")]
pub async fn get_expense_handler(
    path: web::Path<(String, i64)>,
    state: Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    auth::current_principal(&state, &request).await?;
    let (company_name, id) = path.into_inner();
    let (_, expense) = find_expense(&state, &company_name, id).await?;
    Ok(HttpResponse::Ok().json(expense))
}

#[derive(Debug, MultipartForm)]
pub struct UpdateExpenseForm {
    pub gst_number: Option<Text<String>>,
    pub expense_type: Option<Text<String>>,
    pub date: Option<Text<String>>,
    pub invoice_number: Option<Text<String>>,
    pub vendor_name: Option<Text<String>>,
    pub invoice_amount: Option<Text<String>>,
    pub purpose: Option<Text<String>>,
    pub purchased_by: Option<Text<String>>,
    pub amount_paid_by: Option<Text<String>>,
    pub payment_type: Option<Text<String>>,
    pub amount_paid: Option<Text<String>>,
    pub status: Option<Text<String>>,
    #[multipart(rename = "allOk")]
    pub all_ok: Option<Text<bool>>,
    pub invoice_copy: Option<TempFile>,
    pub qrcode: Option<TempFile>,
    pub payment_screenshot: Option<TempFile>,
}

/// Partial update, admin capability required. `allOk` wins over an explicit
/// `status` field: true maps to Completed, false back to Pending.
#[put("/{company_name}/{expense_id}")]
pub async fn update_expense_handler(
    path: web::Path<(String, i64)>,
    MultipartForm(form): MultipartForm<UpdateExpenseForm>,
    state: Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    let principal = auth::current_principal(&state, &request).await?;
    if !principal.can_manage_expenses() {
        return Err(AppError::Forbidden("Admin privileges required".into()));
    }

    let (company_name, id) = path.into_inner();
    let (company, _) = find_expense(&state, &company_name, id).await?;

    let mut patch = ExpensePatch {
        gst_number: text(form.gst_number),
        invoice_number: text(form.invoice_number),
        vendor_name: text(form.vendor_name),
        invoice_amount: text(form.invoice_amount),
        purpose: text(form.purpose),
        purchased_by: text(form.purchased_by),
        amount_paid_by: text(form.amount_paid_by),
        amount_paid: text(form.amount_paid),
        submitted_by: Some(principal.username().to_string()),
        ..ExpensePatch::default()
    };

    if let Some(raw) = form.expense_type.as_deref() {
        patch.expense_type = Some(utils::normalize_expense_type(raw));
    }
    if let Some(raw) = form.date.as_deref() {
        patch.date = Some(utils::parse_expense_date(raw)?);
    }
    if let Some(raw) = form.payment_type.as_deref() {
        // on update anything that is not cash counts as UPI
        patch.payment_type =
            Some(utils::normalize_payment_type(raw).unwrap_or(("UPI".to_string(), 1)));
    }

    let upload_dir = &state.config.upload_dir;
    patch.invoice_copy = uploads::save_upload(form.invoice_copy.as_ref(), upload_dir, Category::Invoice)?;
    patch.qrcode = uploads::save_upload(form.qrcode.as_ref(), upload_dir, Category::Qrcode)?;
    patch.payment_screenshot =
        uploads::save_upload(form.payment_screenshot.as_ref(), upload_dir, Category::Screenshot)?;

    if let Some(all_ok) = form.all_ok {
        patch.status = Some(if *all_ok { "Completed" } else { "Pending" }.to_string());
    } else if let Some(status) = text(form.status) {
        patch.status = Some(status);
    }

    let updated = db::update_expense(&state, company, id, patch)
        .await?
        .ok_or(AppError::InternalServerError)?;
    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/{company_name}/{expense_id}")]
pub async fn delete_expense_handler(
    path: web::Path<(String, i64)>,
    state: Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    let principal = auth::current_principal(&state, &request).await?;
    if !principal.can_manage_expenses() {
        return Err(AppError::Forbidden("Admin privileges required".into()));
    }

    let (company_name, id) = path.into_inner();
    let deleted = match CompanyId::from_name(&company_name) {
        Some(company) => db::delete_expense(&state, company, id).await?,
        None => false,
    };
    if !deleted {
        return Err(AppError::NotFound("Expense".into()));
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({ "detail": "Expense deleted" })))
}

#[derive(Deserialize)]
pub struct VendorCreate {
    pub name: String,
}

#[post("/vendor")]
pub async fn add_vendor_handler(
    web::Json(body): web::Json<VendorCreate>,
    state: Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    auth::current_principal(&state, &request).await?;
    if db::get_vendor_by_name(&state, &body.name).await?.is_some() {
        return Err(AppError::Conflict("Vendor already exists".into()));
    }
    let vendor = db::create_vendor(&state, &body.name).await?;
    Ok(HttpResponse::Ok().json(vendor))
}

#[get("/vendor")]
pub async fn list_vendors_handler(
    state: Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    auth::current_principal(&state, &request).await?;
    let vendors = db::get_all_vendors(&state).await?;
    Ok(HttpResponse::Ok().json(vendors))
}

#[get("/{company_name}/{expense_id}/files")]
pub async fn expense_files_handler(
    path: web::Path<(String, i64)>,
    state: Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    auth::current_principal(&state, &request).await?;
    let (company_name, id) = path.into_inner();
    let (_, expense) = find_expense(&state, &company_name, id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "invoice_copy": expense.invoice_copy,
        "qrcode": expense.qrcode,
        "payment_screenshot": expense.payment_screenshot,
    })))
}

/// Registers every route; shared between the server binary and the tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(root_handler)
        .service(
            web::scope("/auth")
                .service(register_handler)
                .service(login_handler),
        )
        .service(
            web::scope("/admin")
                .service(list_users_handler)
                .service(approve_user_handler)
                .service(delete_user_handler),
        )
        .service(web::scope("/user").service(me_handler))
        .service(
            web::scope("/expenses")
                .service(create_expense_handler)
                .service(list_company_expenses_handler)
                .service(list_vendors_handler)
                .service(add_vendor_handler)
                .service(expense_files_handler)
                .service(get_expense_handler)
                .service(update_expense_handler)
                .service(delete_expense_handler),
        );
}
