//! Case parameters.
//!
//! A case is an ordered dictionary of [`ParamValue`]s. Keys starting with `_`
//! are private: they reach the test body but take no part in case identity.

mod builder;
mod identity;

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use crate::{Error, Result};

pub use builder::{params, pbool, poptions, CaseIter, ParamsBuilder};
pub use identity::{
    check_duplicate_cases, is_valid_name_part, params_equals, params_supersets, percent_decode,
    public_params_equals, stringify_public_params, stringify_single_param, validate_name_part,
    validate_public_params, BAD_PARAM_VALUE_CHARS,
};

/// Ordered mapping of param keys to values.
pub type CaseParams = IndexMap<String, ParamValue>;

/// Prefix marking a param as private.
pub const PRIVATE_PARAM_PREFIX: char = '_';

/// The closed set of values a case param may take.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Absent value, encoded as `undefined`
    Undefined,
    Number(f64),
    String(String),
    Bool(bool),
    NumberArray(Vec<f64>),
}

// JSON has no integer/float split; print integral numbers without a fraction.
fn number_to_json(n: f64) -> Value {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

impl ParamValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, ParamValue::Undefined)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number_array(&self) -> Option<&[f64]> {
        match self {
            ParamValue::NumberArray(v) => Some(v),
            _ => None,
        }
    }

    /// JSON form used in result logs. `Undefined` becomes `null`.
    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Undefined => Value::Null,
            ParamValue::Number(n) => number_to_json(*n),
            ParamValue::String(s) => Value::String(s.clone()),
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::NumberArray(v) => {
                Value::Array(v.iter().map(|n| number_to_json(*n)).collect())
            }
        }
    }

    /// Query-string encoding: a JSON literal, or `undefined`.
    pub fn encode(&self) -> String {
        match self {
            ParamValue::Undefined => "undefined".to_string(),
            other => other.to_json().to_string(),
        }
    }

    /// Inverse of [`ParamValue::encode`].
    pub fn decode(key: &str, text: &str) -> Result<Self> {
        if text == "undefined" {
            return Ok(ParamValue::Undefined);
        }
        let value: Value = serde_json::from_str(text).map_err(|e| Error::InvalidParamValue {
            key: key.to_string(),
            reason: format!("`{}` is not a JSON literal ({})", text, e),
        })?;
        Self::from_json(key, &value)
    }

    /// Convert a JSON value, rejecting shapes outside the value domain.
    pub fn from_json(key: &str, value: &Value) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidParamValue {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        match value {
            Value::Bool(b) => Ok(ParamValue::Bool(*b)),
            Value::String(s) => Ok(ParamValue::String(s.clone())),
            Value::Number(n) => n
                .as_f64()
                .map(ParamValue::Number)
                .ok_or_else(|| invalid("number out of range")),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_f64().ok_or_else(|| invalid("arrays may only hold numbers")))
                .collect::<Result<Vec<_>>>()
                .map(ParamValue::NumberArray),
            Value::Null => Err(invalid("null is not a param value (use undefined)")),
            Value::Object(_) => Err(invalid("objects are not param values")),
        }
    }

    /// Reject values that cannot be encoded faithfully.
    pub fn validate(&self, key: &str) -> Result<()> {
        let finite = match self {
            ParamValue::Number(n) => n.is_finite(),
            ParamValue::NumberArray(v) => v.iter().all(|n| n.is_finite()),
            _ => true,
        };
        if finite {
            Ok(())
        } else {
            Err(Error::InvalidParamValue {
                key: key.to_string(),
                reason: "numbers must be finite".to_string(),
            })
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        ParamValue::Number(n)
    }
}

impl From<i32> for ParamValue {
    fn from(n: i32) -> Self {
        ParamValue::Number(f64::from(n))
    }
}

impl From<u32> for ParamValue {
    fn from(n: u32) -> Self {
        ParamValue::Number(f64::from(n))
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::String(s)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(v: Vec<f64>) -> Self {
        ParamValue::NumberArray(v)
    }
}

impl From<Vec<i32>> for ParamValue {
    fn from(v: Vec<i32>) -> Self {
        ParamValue::NumberArray(v.into_iter().map(f64::from).collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ParamValue::Undefined, Into::into)
    }
}

pub fn param_key_is_public(key: &str) -> bool {
    !key.starts_with(PRIVATE_PARAM_PREFIX)
}

/// The public projection of a case: the part that identifies it.
pub fn extract_public_params(params: &CaseParams) -> CaseParams {
    params
        .iter()
        .filter(|(k, _)| param_key_is_public(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// JSON object for display; undefined values are omitted.
pub fn params_to_json(params: &CaseParams) -> Value {
    Value::Object(
        params
            .iter()
            .filter(|(_, v)| !v.is_undefined())
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

/// Build [`CaseParams`] in insertion order.
///
/// ```ignore
/// let p = case_params! { "format" => "rgba8unorm", "layers" => 6 };
/// ```
#[macro_export]
macro_rules! case_params {
    () => {
        $crate::params::CaseParams::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut params = $crate::params::CaseParams::new();
        $(
            params.insert(
                ::std::string::String::from($key),
                $crate::params::ParamValue::from($value),
            );
        )+
        params
    }};
}
