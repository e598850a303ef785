//! # Option Records
//!
//! The wire shape of a stored option and of a write request. Field names
//! serialize in camelCase and are the stable contract for any data-access
//! layer built on top of the store; unset value columns serialize as
//! `null` so readers that predate a new column keep working.

use opts_core::{OptionId, OwnerId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A persisted option.
///
/// Exactly one of `reference_id`, `string_value`, `number_value`,
/// `boolean_value` and `json_value` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionRecord {
    /// Record id.
    pub id: OptionId,
    /// Option key.
    pub key: String,
    /// Owning entity, `None` for global options.
    pub owner_id: Option<OwnerId>,
    /// User who wrote the option.
    pub user_id: Option<UserId>,
    /// Foreign id, for reference keys.
    pub reference_id: Option<Uuid>,
    /// String value.
    pub string_value: Option<String>,
    /// Numeric value.
    pub number_value: Option<f64>,
    /// Boolean value.
    pub boolean_value: Option<bool>,
    /// Arbitrary JSON value.
    pub json_value: Option<Value>,
    /// First write.
    pub created_at: Timestamp,
    /// Latest write.
    pub updated_at: Timestamp,
}

impl OptionRecord {
    pub(crate) fn from_value(
        id: OptionId,
        key: String,
        owner_id: Option<OwnerId>,
        user_id: Option<UserId>,
        value: OptionValue,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        let mut record = Self {
            id,
            key,
            owner_id,
            user_id,
            reference_id: None,
            string_value: None,
            number_value: None,
            boolean_value: None,
            json_value: None,
            created_at,
            updated_at,
        };
        match value {
            OptionValue::Reference(id) => record.reference_id = Some(id),
            OptionValue::String(s) => record.string_value = Some(s),
            OptionValue::Number(n) => record.number_value = Some(n),
            OptionValue::Boolean(b) => record.boolean_value = Some(b),
            OptionValue::Json(v) => record.json_value = Some(v),
        }
        record
    }

    /// The single value this record holds.
    pub fn value(&self) -> Option<OptionValue> {
        value_fields(
            self.reference_id,
            &self.string_value,
            self.number_value,
            self.boolean_value,
            &self.json_value,
        )
        .into_iter()
        .next()
    }
}

/// A write request. Set `id` to update an existing record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionInput {
    /// Record to update; a fresh id is assigned when `None`.
    pub id: Option<OptionId>,
    /// Option key.
    pub key: String,
    /// Owning entity, `None` for global options.
    pub owner_id: Option<OwnerId>,
    /// Author; defaults to the caller's user.
    pub user_id: Option<UserId>,
    /// Foreign id, for reference keys.
    pub reference_id: Option<Uuid>,
    /// String value.
    pub string_value: Option<String>,
    /// Numeric value.
    pub number_value: Option<f64>,
    /// Boolean value.
    pub boolean_value: Option<bool>,
    /// Arbitrary JSON value.
    pub json_value: Option<Value>,
}

impl OptionInput {
    /// A request for `key` with no owner and no value.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// Update the record with this id instead of inserting.
    pub fn with_id(mut self, id: OptionId) -> Self {
        self.id = Some(id);
        self
    }

    /// Attach to an owner.
    pub fn owner(mut self, owner: OwnerId) -> Self {
        self.owner_id = Some(owner);
        self
    }

    /// Attribute to a user.
    pub fn user(mut self, user: UserId) -> Self {
        self.user_id = Some(user);
        self
    }

    pub fn reference(mut self, id: Uuid) -> Self {
        self.reference_id = Some(id);
        self
    }

    pub fn string(mut self, value: impl Into<String>) -> Self {
        self.string_value = Some(value.into());
        self
    }

    pub fn number(mut self, value: f64) -> Self {
        self.number_value = Some(value);
        self
    }

    pub fn boolean(mut self, value: bool) -> Self {
        self.boolean_value = Some(value);
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.json_value = Some(value);
        self
    }

    /// Every value field that is set, reference first. A `jsonValue` of
    /// JSON `null` counts as unset.
    pub fn value_fields(&self) -> Vec<OptionValue> {
        value_fields(
            self.reference_id,
            &self.string_value,
            self.number_value,
            self.boolean_value,
            &self.json_value,
        )
    }
}

fn value_fields(
    reference_id: Option<Uuid>,
    string_value: &Option<String>,
    number_value: Option<f64>,
    boolean_value: Option<bool>,
    json_value: &Option<Value>,
) -> Vec<OptionValue> {
    let mut fields = Vec::new();
    if let Some(id) = reference_id {
        fields.push(OptionValue::Reference(id));
    }
    if let Some(s) = string_value {
        fields.push(OptionValue::String(s.clone()));
    }
    if let Some(n) = number_value {
        fields.push(OptionValue::Number(n));
    }
    if let Some(b) = boolean_value {
        fields.push(OptionValue::Boolean(b));
    }
    match json_value {
        Some(Value::Null) | None => {}
        Some(v) => fields.push(OptionValue::Json(v.clone())),
    }
    fields
}

/// Typed view of the one value field an option holds.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Reference(Uuid),
    String(String),
    Number(f64),
    Boolean(bool),
    Json(Value),
}

impl OptionValue {
    /// Wire name of the column holding this value.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Reference(_) => "referenceId",
            Self::String(_) => "stringValue",
            Self::Number(_) => "numberValue",
            Self::Boolean(_) => "booleanValue",
            Self::Json(_) => "jsonValue",
        }
    }

    /// The JSON value the rule interpreter sees. References become their
    /// id string. `None` for a non-finite number.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Self::Reference(id) => Some(Value::String(id.to_string())),
            Self::String(s) => Some(Value::String(s.clone())),
            Self::Number(n) => serde_json::Number::from_f64(*n).map(Value::Number),
            Self::Boolean(b) => Some(Value::Bool(*b)),
            Self::Json(v) => Some(v.clone()),
        }
    }
}
