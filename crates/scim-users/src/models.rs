//! SCIM user models and request/response payloads.

use chrono::{DateTime, Utc};
use scim_core::query::QueryParams;
use scim_core::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Schema URI of the SCIM core user resource.
pub const SCHEMA_USER: &str = "urn:ietf:params:scim:schemas:core:2.0:User";

/// Schema URI of a SCIM PATCH request.
pub const SCHEMA_PATCH_OP: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// Number of users requested per list call; the server caps pages at this size.
pub const PAGE_SIZE: u64 = 100;

/// Role (`userType`) of a platform account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    /// Regular member.
    Registered,
    /// Moderator.
    Moderator,
    /// Administrator.
    Admin,
}

impl UserRole {
    /// All roles the platform accepts through SCIM.
    pub const ALL: [Self; 3] = [Self::Registered, Self::Moderator, Self::Admin];

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "Registered",
            Self::Moderator => "Moderator",
            Self::Admin => "Admin",
        }
    }

    /// Comma separated list of accepted role names, for diagnostics.
    #[must_use]
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|role| role.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| {
                Error::ValidationError(format!(
                    "Invalid role: {value}. Valid roles are: {}",
                    Self::valid_names()
                ))
            })
    }
}

/// Structured name of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Name {
    /// Given (first) name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    /// Family (last) name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
}

/// Email entry of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    /// Address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Whether this is the primary address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
    /// Address kind (`work`, `home`, ...).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Audit metadata attached to a resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    /// Creation timestamp as sent by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    /// Canonical resource URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Attributes not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Meta {
    /// Creation timestamp, if the server sent it in RFC 3339 form.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created
            .as_deref()
            .and_then(|created| DateTime::parse_from_rfc3339(created).ok())
            .map(|created| created.with_timezone(&Utc))
    }
}

/// SCIM user resource exactly as returned by the platform.
///
/// The record is the JSON document the server sent and serializes back to it unchanged,
/// nulls and unknown attributes included. The accessors are a typed view over it: an
/// attribute that is missing or has an unexpected shape reads as `None` instead of
/// rejecting the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScimUser(Value);

impl ScimUser {
    /// Wrap a JSON document.
    #[must_use]
    pub const fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// The record as received.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwrap the JSON document.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Raw attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    fn str_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Value::as_str)
    }

    fn typed_attribute<'a, T: Deserialize<'a>>(&'a self, name: &str) -> Option<T> {
        self.attribute(name).and_then(|value| T::deserialize(value).ok())
    }

    /// Server-assigned account ID.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.str_attribute("id")
    }

    /// Identifier assigned by the identity provider.
    #[must_use]
    pub fn external_id(&self) -> Option<&str> {
        self.str_attribute("externalId")
    }

    /// Login name, usually an email address.
    #[must_use]
    pub fn user_name(&self) -> Option<&str> {
        self.str_attribute("userName")
    }

    /// Display name.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.str_attribute("displayName")
    }

    /// Role as reported by the server.
    #[must_use]
    pub fn user_type(&self) -> Option<&str> {
        self.str_attribute("userType")
    }

    /// Profile page URL.
    #[must_use]
    pub fn profile_url(&self) -> Option<&str> {
        self.str_attribute("profileUrl")
    }

    /// The `active` flag, if present.
    #[must_use]
    pub fn active(&self) -> Option<bool> {
        self.attribute("active").and_then(Value::as_bool)
    }

    /// Schema URIs.
    #[must_use]
    pub fn schemas(&self) -> Vec<&str> {
        self.attribute("schemas")
            .and_then(Value::as_array)
            .map(|schemas| schemas.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Structured name.
    #[must_use]
    pub fn name(&self) -> Option<Name> {
        self.typed_attribute("name")
    }

    /// Email entries. Entries that are not objects are skipped.
    #[must_use]
    pub fn emails(&self) -> Vec<Email> {
        self.attribute("emails")
            .and_then(Value::as_array)
            .map(|emails| {
                emails
                    .iter()
                    .filter_map(|email| Email::deserialize(email).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Audit metadata.
    #[must_use]
    pub fn meta(&self) -> Option<Meta> {
        self.typed_attribute("meta")
    }

    /// Parsed role, if the server reported one of the known values.
    #[must_use]
    pub fn role(&self) -> Option<UserRole> {
        self.user_type().and_then(|value| value.parse().ok())
    }

    /// Primary email address, falling back to the first listed one.
    #[must_use]
    pub fn primary_email(&self) -> Option<&str> {
        let emails = self.attribute("emails")?.as_array()?;
        emails
            .iter()
            .find(|email| email.get("primary").and_then(Value::as_bool) == Some(true))
            .and_then(email_address)
            .or_else(|| emails.iter().find_map(email_address))
    }

    /// Whether the account is active. Accounts without the attribute count as inactive.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active().unwrap_or(false)
    }
}

impl From<Value> for ScimUser {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

fn email_address(email: &Value) -> Option<&str> {
    email.get("value").and_then(Value::as_str)
}

/// SCIM list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    /// Schema URIs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<String>,
    /// Total number of users on the server.
    pub total_results: u64,
    /// 1-based index of the first resource in this page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<u64>,
    /// Number of resources in this page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_per_page: Option<u64>,
    /// Users in this page, each kept as sent.
    #[serde(rename = "Resources", default)]
    pub resources: Vec<ScimUser>,
}

/// Pagination cursor for list requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Page size.
    pub count: u64,
    /// 1-based index of the first requested resource.
    pub start_index: u64,
}

impl PageRequest {
    /// First page.
    #[must_use]
    pub const fn first() -> Self {
        Self {
            count: PAGE_SIZE,
            start_index: 1,
        }
    }

    /// Cursor for the page following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self {
            count: self.count,
            start_index: self.start_index.saturating_add(self.count),
        }
    }

    /// Query pairs for the list call.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryParams::new();
        params.push("count", self.count);
        params.push("startIndex", self.start_index);
        params.into_pairs()
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// Single operation of a PATCH request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    /// Operation kind.
    pub op: String,
    /// Target attribute.
    pub path: String,
    /// New value.
    pub value: Value,
}

impl PatchOperation {
    /// Replace `path` with `value`.
    #[must_use]
    pub fn replace(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            op: "replace".to_string(),
            path: path.into(),
            value: value.into(),
        }
    }
}

/// SCIM PATCH request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchRequest {
    /// Schema URIs.
    pub schemas: Vec<String>,
    /// Operations, applied in order.
    #[serde(rename = "Operations")]
    pub operations: Vec<PatchOperation>,
}

impl PatchRequest {
    /// Wrap operations in a PatchOp message.
    #[must_use]
    pub fn new(operations: Vec<PatchOperation>) -> Self {
        Self {
            schemas: vec![SCHEMA_PATCH_OP.to_string()],
            operations,
        }
    }

    /// Body for an account update. Omitted arguments produce no operation.
    #[must_use]
    pub fn account_update(active: Option<bool>, role: Option<UserRole>) -> Self {
        let mut operations = Vec::new();
        if let Some(active) = active {
            operations.push(PatchOperation::replace("active", active));
        }
        if let Some(role) = role {
            operations.push(PatchOperation::replace("userType", role.as_str()));
        }
        Self::new(operations)
    }
}

/// Error payload returned by the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScimErrorBody {
    /// Platform error message.
    #[serde(rename = "ErrorMessage", default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Standard SCIM error detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ScimErrorBody {
    /// Best available human-readable message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.error_message.as_deref().or(self.detail.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_parsing_is_exact() {
        assert_eq!("Admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!(
            "Registered".parse::<UserRole>().unwrap(),
            UserRole::Registered
        );
        assert!("admin".parse::<UserRole>().is_err());

        let err = "Hulk".parse::<UserRole>().unwrap_err();
        assert_eq!(
            err,
            Error::ValidationError(
                "Invalid role: Hulk. Valid roles are: Registered, Moderator, Admin".to_string()
            )
        );
    }

    #[test]
    fn account_update_orders_operations() {
        let request = PatchRequest::account_update(Some(false), Some(UserRole::Moderator));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "schemas": [SCHEMA_PATCH_OP],
                "Operations": [
                    {"op": "replace", "path": "active", "value": false},
                    {"op": "replace", "path": "userType", "value": "Moderator"}
                ]
            })
        );
    }

    #[test]
    fn account_update_without_arguments_is_empty() {
        let request = PatchRequest::account_update(None, None);
        assert!(request.operations.is_empty());
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"schemas": [SCHEMA_PATCH_OP], "Operations": []})
        );
    }

    #[test]
    fn page_cursor_advances_by_page_size() {
        let page = PageRequest::first();
        assert_eq!(page.start_index, 1);
        assert_eq!(page.next().start_index, 101);
        assert_eq!(page.next().next().start_index, 201);
        assert_eq!(
            page.to_pairs(),
            vec![("count", "100".to_string()), ("startIndex", "1".to_string())]
        );
    }

    #[test]
    fn user_helpers() {
        let user: ScimUser = serde_json::from_value(json!({
            "id": "8",
            "active": true,
            "userType": "Moderator",
            "emails": [
                {"primary": false, "value": "old@company.com"},
                {"primary": true, "value": "bbanner@company.com"}
            ]
        }))
        .unwrap();

        assert_eq!(user.role(), Some(UserRole::Moderator));
        assert_eq!(user.primary_email(), Some("bbanner@company.com"));
        assert!(user.is_active());
    }

    #[test]
    fn unknown_attributes_are_kept() {
        let body = json!({
            "id": "9",
            "userName": "tstark@company.com",
            "urn:custom:extension": {"team": "avengers"},
            "meta": {"created": "2020-01-02T03:04:05Z", "resourceType": "User"}
        });
        let user: ScimUser = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(
            user.attribute("urn:custom:extension"),
            Some(&json!({"team": "avengers"}))
        );
        let meta = user.meta().unwrap();
        assert_eq!(meta.extra.get("resourceType"), Some(&json!("User")));
        assert!(meta.created_at().is_some());
        assert_eq!(serde_json::to_value(&user).unwrap(), body);
    }

    #[test]
    fn irregular_attributes_do_not_reject_the_record() {
        let body = json!({
            "id": "9",
            "externalId": null,
            "active": "yes",
            "emails": [{"primary": true}, "bogus", {"value": "tstark@company.com"}],
            "meta": {"created": "2017-05-30 21:45:30"}
        });
        let user: ScimUser = serde_json::from_value(body.clone()).unwrap();

        assert_eq!(user.id(), Some("9"));
        assert_eq!(user.external_id(), None);
        assert_eq!(user.active(), None);
        assert!(!user.is_active());
        assert_eq!(user.emails().len(), 2);
        assert_eq!(user.primary_email(), Some("tstark@company.com"));

        let meta = user.meta().unwrap();
        assert_eq!(meta.created.as_deref(), Some("2017-05-30 21:45:30"));
        assert!(meta.created_at().is_none());

        assert_eq!(serde_json::to_value(&user).unwrap(), body);
    }

    #[test]
    fn page_cursor_saturates() {
        let page = PageRequest {
            count: PAGE_SIZE,
            start_index: u64::MAX - 10,
        };
        assert_eq!(page.next().start_index, u64::MAX);
    }

    #[test]
    fn list_response_without_resources() {
        let list: ListResponse =
            serde_json::from_value(json!({"totalResults": 0, "itemsPerPage": 0})).unwrap();
        assert_eq!(list.total_results, 0);
        assert!(list.resources.is_empty());
    }

    #[test]
    fn error_body_message() {
        let body: ScimErrorBody = serde_json::from_value(json!({
            "ErrorMessage": "You cannot delete or destroy System Accounts."
        }))
        .unwrap();
        assert_eq!(
            body.message(),
            Some("You cannot delete or destroy System Accounts.")
        );

        let body: ScimErrorBody =
            serde_json::from_value(json!({"detail": "unknown user"})).unwrap();
        assert_eq!(body.message(), Some("unknown user"));
    }
}
