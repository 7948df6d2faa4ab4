//! Request and response bodies for the HTTP API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use stockline_ledger::ValidationReport;
use stockline_types::{Block, NewEntry};

use crate::error::ApiError;

/// Body of `POST /ledger`.
#[derive(Debug, Default, Deserialize)]
pub struct AppendRequest {
    pub product: Option<String>,
    /// A JSON integer or an integer-valued string.
    pub change: Option<Value>,
    pub note: Option<String>,
    pub user: Option<String>,
}

impl AppendRequest {
    /// Validate the body and build the ledger entry.
    ///
    /// `user` falls back to `caller` when absent or blank.
    pub fn into_entry(self, caller: &str) -> Result<NewEntry, ApiError> {
        let product = self
            .product
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ApiError::Validation("Product and change are required".into()))?;
        let change = self
            .change
            .filter(|c| !c.is_null())
            .ok_or_else(|| ApiError::Validation("Product and change are required".into()))?;
        let delta = parse_change(&change)
            .ok_or_else(|| ApiError::Validation(format!("change must be an integer, got {change}")))?;

        let user = self
            .user
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| caller.to_string());

        Ok(NewEntry::new(product, delta)
            .with_note(self.note.unwrap_or_default())
            .submitted_by(user))
    }
}

fn parse_change(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Body of `POST /ledger/{index}/status`.
#[derive(Debug, Default, Deserialize)]
pub struct StatusRequest {
    pub status: Option<String>,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub message: &'static str,
    pub genesis: Block,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    pub length: u64,
    pub first_invalid_index: Option<u64>,
    pub reason: Option<String>,
}

impl From<&ValidationReport> for VerifyResponse {
    fn from(report: &ValidationReport) -> Self {
        let first = report
            .violations
            .iter()
            .min_by_key(|v| v.index);
        Self {
            valid: report.is_valid(),
            length: report.block_count,
            first_invalid_index: first.map(|v| v.index),
            reason: first.map(|v| v.description.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(body: Value) -> AppendRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn change_accepts_integers_and_integer_strings() {
        assert_eq!(parse_change(&json!(-100)), Some(-100));
        assert_eq!(parse_change(&json!(" 42 ")), Some(42));
        assert_eq!(parse_change(&json!(7.0)), Some(7));
        assert_eq!(parse_change(&json!(7.5)), None);
        assert_eq!(parse_change(&json!("ten")), None);
        assert_eq!(parse_change(&json!(true)), None);
    }

    #[test]
    fn entry_defaults() {
        let entry = request(json!({"product": "Toys", "change": -100}))
            .into_entry("alice")
            .unwrap();
        assert_eq!(entry.product, "Toys");
        assert_eq!(entry.quantity_delta, -100);
        assert_eq!(entry.note, "");
        assert_eq!(entry.submitted_by, "alice");
    }

    #[test]
    fn explicit_user_is_kept() {
        let entry = request(json!({"product": "Toys", "change": "5", "note": "restock", "user": "bob"}))
            .into_entry("alice")
            .unwrap();
        assert_eq!(entry.submitted_by, "bob");
        assert_eq!(entry.note, "restock");
        assert_eq!(entry.quantity_delta, 5);
    }

    #[test]
    fn missing_fields_are_validation_errors() {
        for body in [
            json!({"change": 1}),
            json!({"product": "", "change": 1}),
            json!({"product": "Toys"}),
            json!({"product": "Toys", "change": null}),
            json!({"product": "Toys", "change": "1.5"}),
        ] {
            assert!(matches!(
                request(body).into_entry("alice"),
                Err(ApiError::Validation(_))
            ));
        }
    }

    #[test]
    fn zero_change_is_allowed() {
        assert!(request(json!({"product": "Toys", "change": 0}))
            .into_entry("alice")
            .is_ok());
    }
}
