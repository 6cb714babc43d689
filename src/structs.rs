use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub approved: bool,
    pub role: String,
    pub created_at: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct Vendor {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

/// A single expense row. All three company tables share this shape; which
/// table a row lives in is decided by [`CompanyId`] alone.
#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct Expense {
    pub id: i64,
    pub company_name: String,
    pub gst_number: Option<String>,
    pub expense_type: String,
    pub expense_type_flag: i64,
    pub date: String,
    pub invoice_number: Option<String>,
    pub vendor_name: Option<String>,
    pub invoice_amount: Option<String>,
    pub purpose: Option<String>,
    pub purchased_by: Option<String>,
    pub invoice_copy: Option<String>,
    pub qrcode: Option<String>,
    pub amount_paid_by: Option<String>,
    pub payment_type: Option<String>,
    pub payment_type_flag: Option<i64>,
    pub amount_paid: Option<String>,
    pub payment_screenshot: Option<String>,
    pub submitted_by: Option<String>,
    pub created_at: String,
    pub status: Option<String>,
}

/// The three fixed companies. Each maps to its own expense table; rows are
/// never read or written across company boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanyId {
    CompanyA,
    CompanyB,
    CompanyC,
}

impl CompanyId {
    /// Exact-string lookup, no case folding or fuzzy matching.
    pub fn from_name(name: &str) -> Option<CompanyId> {
        match name {
            "company_a" => Some(CompanyId::CompanyA),
            "company_b" => Some(CompanyId::CompanyB),
            "company_c" => Some(CompanyId::CompanyC),
            _ => None,
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            CompanyId::CompanyA => "expense_company_a",
            CompanyId::CompanyB => "expense_company_b",
            CompanyId::CompanyC => "expense_company_c",
        }
    }
}

/// An authenticated identity. Admins live in their own table and carry no
/// approval state; capability checks go through this enum rather than
/// probing record shape.
#[derive(Debug, Clone)]
pub enum Principal {
    User(User),
    Admin(Admin),
}

impl Principal {
    pub fn username(&self) -> &str {
        match self {
            Principal::User(u) => &u.username,
            Principal::Admin(a) => &a.username,
        }
    }

    /// Only admins may update or delete expense rows.
    pub fn can_manage_expenses(&self) -> bool {
        matches!(self, Principal::Admin(_))
    }
}

/// Field values for a new expense row, flags already derived and the date
/// already normalized to ISO.
#[derive(Debug, Clone, Default)]
pub struct NewExpense {
    pub company_name: String,
    pub gst_number: Option<String>,
    pub expense_type: String,
    pub expense_type_flag: i64,
    pub date: String,
    pub invoice_number: Option<String>,
    pub vendor_name: Option<String>,
    pub invoice_amount: Option<String>,
    pub purpose: Option<String>,
    pub purchased_by: Option<String>,
    pub invoice_copy: Option<String>,
    pub qrcode: Option<String>,
    pub amount_paid_by: Option<String>,
    pub payment_type: Option<String>,
    pub payment_type_flag: Option<i64>,
    pub amount_paid: Option<String>,
    pub payment_screenshot: Option<String>,
    pub submitted_by: Option<String>,
    pub status: Option<String>,
}

/// Partial update for an expense row. Only `Some` fields are written;
/// derived flags travel together with their source string.
#[derive(Debug, Clone, Default)]
pub struct ExpensePatch {
    pub gst_number: Option<String>,
    pub expense_type: Option<(String, i64)>,
    pub date: Option<String>,
    pub invoice_number: Option<String>,
    pub vendor_name: Option<String>,
    pub invoice_amount: Option<String>,
    pub purpose: Option<String>,
    pub purchased_by: Option<String>,
    pub invoice_copy: Option<String>,
    pub qrcode: Option<String>,
    pub amount_paid_by: Option<String>,
    pub payment_type: Option<(String, i64)>,
    pub amount_paid: Option<String>,
    pub payment_screenshot: Option<String>,
    pub submitted_by: Option<String>,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_lookup_is_exact() {
        assert_eq!(CompanyId::from_name("company_a"), Some(CompanyId::CompanyA));
        assert_eq!(CompanyId::from_name("company_b"), Some(CompanyId::CompanyB));
        assert_eq!(CompanyId::from_name("company_c"), Some(CompanyId::CompanyC));
        assert_eq!(CompanyId::from_name("Company_A"), None);
        assert_eq!(CompanyId::from_name("company_d"), None);
        assert_eq!(CompanyId::from_name(""), None);
    }

    #[test]
    fn each_company_has_its_own_table() {
        assert_eq!(CompanyId::CompanyA.table(), "expense_company_a");
        assert_eq!(CompanyId::CompanyB.table(), "expense_company_b");
        assert_eq!(CompanyId::CompanyC.table(), "expense_company_c");
    }

    #[test]
    fn only_admins_manage_expenses() {
        let user = Principal::User(User {
            id: 1,
            username: "u".into(),
            email: "u@example.com".into(),
            password_hash: String::new(),
            approved: true,
            role: "user".into(),
            created_at: String::new(),
        });
        let admin = Principal::Admin(Admin {
            id: 1,
            username: "a".into(),
            email: "a@example.com".into(),
            password_hash: String::new(),
            created_at: String::new(),
        });
        assert!(!user.can_manage_expenses());
        assert!(admin.can_manage_expenses());
    }
}
