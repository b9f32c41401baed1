//! Action-dispatched ledger service
//!
//! Implements the two actions the endpoint understands:
//! - `check`: linear scan for a (normalized email, month id) match
//! - `append`: unconditional append in fixed column order
//!
//! The ledger never deduplicates; clients are expected to check first.
//! [`Ledger::dispatch`] never fails: every error becomes a
//! `{"success": false, "error": ...}` payload.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{LedgerServerError, Result};
use crate::store::{LedgerRow, RowStore, HEADER};

/// Rows echoed back in check debug output
const DEBUG_ROWS: usize = 3;

/// Where a row matched, by sheet row number
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowRef {
    pub row: u64,
    pub email: String,
    pub month_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchedKey {
    pub email: String,
    pub month_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckDebug {
    pub search_email: String,
    pub search_month_id: String,
    pub first_few_rows: Vec<RowRef>,
}

/// Reply to a `check` action
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReply {
    pub success: bool,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub searched: Option<SearchedKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub found_rows: Vec<RowRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<CheckDebug>,
}

/// Reply to an `append` action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppendReply {
    pub success: bool,
    pub message: String,
    pub row: u64,
}

/// Append payload. Every field is optional; missing values get defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendData {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub completion: Option<f64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub bugs: Option<i64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub satisfaction: Option<f64>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub month_id: Option<String>,
    #[serde(default)]
    pub month_name: Option<String>,
}

impl AppendData {
    fn into_row(self) -> LedgerRow {
        LedgerRow {
            email: self.email.unwrap_or_default(),
            completion: self.completion.unwrap_or(0.0),
            bugs: self.bugs.unwrap_or(0),
            satisfaction: self.satisfaction.unwrap_or(0.0),
            comments: self.comments.unwrap_or_default(),
            timestamp: self
                .timestamp
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
            month_id: self.month_id.unwrap_or_default(),
            month_name: self.month_name.unwrap_or_default(),
        }
    }
}

/// Numeric column as sent by clients: a JSON number or a numeric string
#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<Numeric>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(Numeric::Number(n)) => n,
        Some(Numeric::Text(text)) if text.trim().is_empty() => return Ok(None),
        Some(Numeric::Text(text)) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| D::Error::custom(format!("not a number: {:?}", text)))?,
    };
    if !value.is_finite() {
        return Err(D::Error::custom(format!("not a finite number: {}", value)));
    }
    Ok(Some(value))
}

fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f64(deserializer)?.map(|n| n.round() as i64))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn normalize_month_id(month_id: &str) -> String {
    month_id.trim().to_string()
}

fn failure(error: impl Into<String>, received: Option<Value>) -> Value {
    let mut payload = json!({ "success": false, "error": error.into() });
    if let Some(received) = received {
        payload["received"] = received;
    }
    payload
}

/// Ledger service over a row store
pub struct Ledger {
    store: Arc<dyn RowStore>,
    sheet: String,
}

impl Ledger {
    pub fn new(store: Arc<dyn RowStore>, sheet: impl Into<String>) -> Self {
        Self {
            store,
            sheet: sheet.into(),
        }
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet
    }

    /// Look for a row matching (email, month id) after normalization.
    /// The first match wins.
    pub fn check(&self, email: &str, month_id: &str) -> Result<CheckReply> {
        let rows = if self.store.sheet_exists(&self.sheet)? {
            self.store.data_rows(&self.sheet)?
        } else {
            Vec::new()
        };

        if rows.is_empty() {
            debug!(sheet = %self.sheet, "Sheet is empty or has no data");
            return Ok(CheckReply {
                success: true,
                exists: false,
                reason: Some("Sheet is empty or has no data".to_string()),
                searched: None,
                total_rows: None,
                found_rows: Vec::new(),
                debug: None,
            });
        }

        let search_email = normalize_email(email);
        let search_month_id = normalize_month_id(month_id);

        let mut found_rows = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            let row_num = index as u64 + 2;
            let row_email = normalize_email(&row.email);
            let row_month_id = normalize_month_id(&row.month_id);

            let email_match = row_email == search_email;
            let month_match = row_month_id == search_month_id;

            if email_match && month_match {
                debug!(row = row_num, "Match found");
                found_rows.push(RowRef {
                    row: row_num,
                    email: row_email,
                    month_id: row_month_id,
                });
                break;
            } else if email_match {
                debug!(
                    row = row_num,
                    searched = %search_month_id,
                    found = %row_month_id,
                    "Email matches but month id differs"
                );
            } else if month_match {
                debug!(
                    row = row_num,
                    searched = %search_email,
                    found = %row_email,
                    "Month id matches but email differs"
                );
            }
        }

        let exists = !found_rows.is_empty();
        info!(
            email = %search_email,
            month_id = %search_month_id,
            exists,
            total_rows = rows.len(),
            "Check complete"
        );

        let first_few_rows = rows
            .iter()
            .take(DEBUG_ROWS)
            .enumerate()
            .map(|(index, row)| RowRef {
                row: index as u64 + 2,
                email: row.email.trim().to_string(),
                month_id: normalize_month_id(&row.month_id),
            })
            .collect();

        Ok(CheckReply {
            success: true,
            exists,
            reason: None,
            searched: Some(SearchedKey {
                email: search_email.clone(),
                month_id: search_month_id.clone(),
            }),
            total_rows: Some(rows.len()),
            found_rows,
            debug: Some(CheckDebug {
                search_email,
                search_month_id,
                first_few_rows,
            }),
        })
    }

    /// Append a row, creating the sheet and header first when needed.
    pub fn append(&self, data: AppendData) -> Result<AppendReply> {
        if !self.store.sheet_exists(&self.sheet)? {
            info!(sheet = %self.sheet, "Creating sheet");
            self.store.create_sheet(&self.sheet)?;
        }

        let has_header = matches!(
            self.store.header(&self.sheet)?,
            Some(ref header) if header.first().map(String::as_str) == Some(HEADER[0])
        );
        if !has_header {
            debug!(sheet = %self.sheet, "Writing header row");
            self.store.write_header(&self.sheet, &HEADER)?;
        }

        let row = self.store.append_row(&self.sheet, &data.into_row())?;
        info!(sheet = %self.sheet, row, "Row appended");

        Ok(AppendReply {
            success: true,
            message: "Data appended successfully".to_string(),
            row,
        })
    }

    /// Dispatch a parsed request body by its `action` field.
    pub fn dispatch(&self, request: Value) -> Value {
        let action = request
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        let result = match action.as_str() {
            "append" => {
                let Some(data) = request.get("data").filter(|d| d.is_object()).cloned() else {
                    return self.invalid_action(&action, request);
                };
                match serde_json::from_value::<AppendData>(data) {
                    Ok(data) => self.append(data).and_then(to_value),
                    Err(e) => Err(LedgerServerError::Validation(format!(
                        "Invalid append data: {}",
                        e
                    ))),
                }
            }
            "check" => {
                let email = non_empty_string(&request, "email");
                let month_id = non_empty_string(&request, "monthId");
                let (Some(email), Some(month_id)) = (email, month_id) else {
                    warn!("Missing email or monthId for check action");
                    return failure("Missing email or monthId", Some(request));
                };
                self.check(&email, &month_id).and_then(to_value)
            }
            _ => return self.invalid_action(&action, request),
        };

        result.unwrap_or_else(|e| {
            error!(action = %action, error = %e, "Ledger action failed");
            failure(e.to_string(), None)
        })
    }

    /// Dispatch GET query parameters.
    ///
    /// Only `action=check` with both fields is an action; anything else gets
    /// a status payload echoing the parameters.
    pub fn dispatch_query(&self, params: &HashMap<String, String>) -> Value {
        let action = params.get("action").filter(|v| !v.is_empty());
        let email = params.get("email").filter(|v| !v.is_empty());
        let month_id = params.get("monthId").filter(|v| !v.is_empty());

        if let (Some("check"), Some(email), Some(month_id)) =
            (action.map(String::as_str), email, month_id)
        {
            return self
                .check(email, month_id)
                .and_then(to_value)
                .unwrap_or_else(|e| {
                    error!(error = %e, "Check failed");
                    failure(e.to_string(), None)
                });
        }

        json!({
            "success": true,
            "message": "Ledger is running",
            "receivedParams": params,
            "action": action,
            "email": email,
            "monthId": month_id,
            "note": "Use action=check&email=xxx&monthId=YYYY-MM to check if a response exists"
        })
    }

    fn invalid_action(&self, action: &str, request: Value) -> Value {
        warn!(action, "Invalid action or missing parameters");
        failure("Invalid action or missing parameters", Some(request))
    }
}

fn non_empty_string(request: &Value, field: &str) -> Option<String> {
    request
        .get(field)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn to_value<T: Serialize>(reply: T) -> Result<Value> {
    Ok(serde_json::to_value(reply)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn ledger() -> (Arc<MemoryStore>, Ledger) {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::new(store.clone(), "Responses");
        (store, ledger)
    }

    fn data(email: &str, month_id: &str) -> AppendData {
        AppendData {
            email: Some(email.to_string()),
            completion: Some(80.0),
            bugs: Some(1),
            satisfaction: Some(5.0),
            month_id: Some(month_id.to_string()),
            month_name: Some("May 2024".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_check_on_missing_sheet() {
        let (store, ledger) = ledger();
        let reply = ledger.check("user@x.com", "2024-05").unwrap();
        assert!(reply.success);
        assert!(!reply.exists);
        assert!(reply.reason.is_some());
        // Checking never creates the sheet
        assert!(!store.sheet_exists("Responses").unwrap());
    }

    #[test]
    fn test_append_bootstraps_sheet_and_header() {
        let (store, ledger) = ledger();
        let reply = ledger.append(data("user@x.com", "2024-05")).unwrap();
        assert_eq!(reply.row, 2);

        let header = store.header("Responses").unwrap().unwrap();
        assert_eq!(header.len(), 8);
        assert_eq!(header, HEADER.iter().map(|h| h.to_string()).collect::<Vec<_>>());
    }

    #[test]
    fn test_append_replaces_foreign_header() {
        let (store, ledger) = ledger();
        store.create_sheet("Responses").unwrap();
        store.write_header("Responses", &["Name", "Score"]).unwrap();

        ledger.append(data("user@x.com", "2024-05")).unwrap();
        assert_eq!(store.header("Responses").unwrap().unwrap()[0], "Email");
    }

    #[test]
    fn test_check_normalizes_both_sides() {
        let (_, ledger) = ledger();
        ledger.append(data("  User@X.com ", " 2024-05")).unwrap();

        let reply = ledger.check("USER@x.COM", "2024-05 ").unwrap();
        assert!(reply.exists);
        assert_eq!(reply.total_rows, Some(1));
        assert_eq!(reply.found_rows[0].row, 2);
        assert_eq!(reply.found_rows[0].email, "user@x.com");

        assert!(!ledger.check("user@x.com", "2024-06").unwrap().exists);
        assert!(!ledger.check("other@x.com", "2024-05").unwrap().exists);
    }

    #[test]
    fn test_first_match_wins() {
        let (_, ledger) = ledger();
        ledger.append(data("a@x.com", "2024-04")).unwrap();
        ledger.append(data("a@x.com", "2024-05")).unwrap();
        ledger.append(data("a@x.com", "2024-05")).unwrap();

        let reply = ledger.check("a@x.com", "2024-05").unwrap();
        assert_eq!(reply.found_rows.len(), 1);
        assert_eq!(reply.found_rows[0].row, 3);
        assert_eq!(reply.debug.unwrap().first_few_rows.len(), 3);
    }

    #[test]
    fn test_duplicate_appends_are_kept() {
        let (store, ledger) = ledger();
        assert_eq!(ledger.append(data("a@x.com", "2024-05")).unwrap().row, 2);
        assert_eq!(ledger.append(data("a@x.com", "2024-05")).unwrap().row, 3);
        assert_eq!(store.data_rows("Responses").unwrap().len(), 2);
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let (store, ledger) = ledger();
        ledger.append(AppendData::default()).unwrap();

        let row = &store.data_rows("Responses").unwrap()[0];
        assert_eq!(row.email, "");
        assert_eq!(row.bugs, 0);
        assert_eq!(row.completion, 0.0);
        assert!(!row.timestamp.is_empty());
    }

    #[test]
    fn test_numeric_fields_accept_strings_and_floats() {
        let (store, ledger) = ledger();

        let appended = ledger.dispatch(json!({
            "action": "append",
            "data": {
                "email": "user@x.com",
                "monthId": "2024-05",
                "completion": "80",
                "bugs": 2.0,
                "satisfaction": " 4.5 ",
            }
        }));
        assert_eq!(appended["success"], true);

        let blank = ledger.dispatch(json!({
            "action": "append",
            "data": {"email": "user@x.com", "bugs": "", "completion": null}
        }));
        assert_eq!(blank["success"], true);

        let rows = store.data_rows("Responses").unwrap();
        assert_eq!(rows[0].completion, 80.0);
        assert_eq!(rows[0].bugs, 2);
        assert_eq!(rows[0].satisfaction, 4.5);
        assert_eq!(rows[1].bugs, 0);
        assert_eq!(rows[1].completion, 0.0);
    }

    #[test]
    fn test_dispatch_actions() {
        let (_, ledger) = ledger();

        let appended = ledger.dispatch(json!({
            "action": "append",
            "data": {"email": "user@x.com", "monthId": "2024-05", "bugs": 1, "selfEvaluation": "ok"}
        }));
        assert_eq!(appended["success"], true);
        assert_eq!(appended["row"], 2);

        let checked = ledger.dispatch(json!({"action": "check", "email": "USER@x.com", "monthId": "2024-05"}));
        assert_eq!(checked["success"], true);
        assert_eq!(checked["exists"], true);
        assert_eq!(checked["searched"]["monthId"], "2024-05");
        assert_eq!(checked["totalRows"], 1);
    }

    #[test]
    fn test_dispatch_validation_failures() {
        let (_, ledger) = ledger();

        let missing = ledger.dispatch(json!({"action": "check", "email": "user@x.com"}));
        assert_eq!(missing["success"], false);
        assert_eq!(missing["error"], "Missing email or monthId");
        assert_eq!(missing["received"]["email"], "user@x.com");

        let unknown = ledger.dispatch(json!({"action": "delete"}));
        assert_eq!(unknown["success"], false);
        assert_eq!(unknown["error"], "Invalid action or missing parameters");

        let no_data = ledger.dispatch(json!({"action": "append"}));
        assert_eq!(no_data["success"], false);

        let bad_data = ledger.dispatch(json!({"action": "append", "data": {"bugs": "many"}}));
        assert_eq!(bad_data["success"], false);
        assert!(bad_data["error"].as_str().unwrap().starts_with("Validation error"));
    }

    #[test]
    fn test_dispatch_query() {
        let (_, ledger) = ledger();
        ledger.append(data("user@x.com", "2024-05")).unwrap();

        let mut params = HashMap::new();
        params.insert("action".to_string(), "check".to_string());
        params.insert("email".to_string(), "user@x.com".to_string());
        params.insert("monthId".to_string(), "2024-05".to_string());
        assert_eq!(ledger.dispatch_query(&params)["exists"], true);

        params.remove("monthId");
        let status = ledger.dispatch_query(&params);
        assert_eq!(status["success"], true);
        assert_eq!(status["message"], "Ledger is running");
        assert!(status.get("exists").is_none());
        assert_eq!(status["receivedParams"]["action"], "check");
    }
}
