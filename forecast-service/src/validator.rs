//! Structural checks on provider payloads.
//!
//! Forecasts are walked against a declarative schema, failing on the first
//! problem with the dotted path of the offending key. Leaf values are only
//! checked for presence; their concrete type is not enforced.

use common::errors::AppError;
use common::models::AddressSuggestion;
use serde_json::{Map, Value};
use tracing::warn;

/// What a schema field requires of its value.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Present and not null.
    Required,
    /// A nested object matching the given fields.
    Object(&'static [Field]),
    /// An array whose every element is an object matching the given fields.
    Array(&'static [Field]),
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub key: &'static str,
    pub rule: Rule,
}

const fn required(key: &'static str) -> Field {
    Field {
        key,
        rule: Rule::Required,
    }
}

const fn object(key: &'static str, fields: &'static [Field]) -> Field {
    Field {
        key,
        rule: Rule::Object(fields),
    }
}

const fn array(key: &'static str, fields: &'static [Field]) -> Field {
    Field {
        key,
        rule: Rule::Array(fields),
    }
}

const CONDITION: &[Field] = &[required("text"), required("icon")];

const LOCATION: &[Field] = &[required("name"), required("country")];

const CURRENT: &[Field] = &[
    required("temp_c"),
    required("is_day"),
    required("wind_kph"),
    required("wind_dir"),
    required("humidity"),
    required("feelslike_c"),
    object("condition", CONDITION),
];

/// One entry of the `forecast` array.
pub const FORECAST_DAY: &[Field] = &[
    required("date"),
    object("condition", CONDITION),
    required("maxtemp_c"),
    required("mintemp_c"),
    required("avghumidity"),
    required("maxwind_kph"),
];

/// A complete normalized forecast.
pub const FORECAST: &[Field] = &[
    object("location", LOCATION),
    object("current", CURRENT),
    array("forecast", FORECAST_DAY),
];

/// Check a forecast against [`FORECAST`].
pub fn validate_forecast(forecast: &Value) -> Result<(), AppError> {
    let result = match forecast {
        Value::Null => Err(AppError::format("Forecast cannot be null")),
        Value::Object(map) => validate_fields(map, FORECAST, ""),
        _ => Err(AppError::format("Forecast must be an object")),
    };

    if let Err(e) = &result {
        warn!(error = %e, "Forecast failed validation");
    }
    result
}

/// Walk `fields` over `data`, prefixing reported paths with `prefix`.
pub fn validate_fields(
    data: &Map<String, Value>,
    fields: &[Field],
    prefix: &str,
) -> Result<(), AppError> {
    for field in fields {
        let path = format!("{}{}", prefix, field.key);
        let value = match data.get(field.key) {
            None | Some(Value::Null) => return Err(AppError::missing_key(path)),
            Some(value) => value,
        };

        match (field.rule, value) {
            (Rule::Object(nested), Value::Object(map)) => {
                validate_fields(map, nested, &format!("{}.", path))?;
            }
            (Rule::Object(_), _) => return Err(AppError::type_mismatch("Object", path)),
            (Rule::Array(element), Value::Array(items)) => {
                let element_prefix = format!("{}.", path);
                for item in items {
                    let Value::Object(map) = item else {
                        return Err(AppError::type_mismatch("Object", path));
                    };
                    validate_fields(map, element, &element_prefix)?;
                }
            }
            (Rule::Array(_), _) => return Err(AppError::type_mismatch("Array", path)),
            (Rule::Required, Value::Object(_)) => {
                return Err(AppError::format(format!(
                    "Invalid forecast format: unexpected object at {}",
                    path
                )));
            }
            (Rule::Required, _) => {}
        }
    }
    Ok(())
}

/// Check a provider's suggestion list and convert it.
///
/// Every element must carry string `label`, `coordinates` and `country_code`;
/// other fields are tolerated and dropped. An empty list is valid.
pub fn validate_suggestions(results: &Value) -> Result<Vec<AddressSuggestion>, AppError> {
    let invalid = || {
        warn!(results = %results, "Suggestions failed validation");
        AppError::invalid_response(format!(
            "Invalid response format from address provider. Results: {}",
            results
        ))
    };

    let Value::Array(items) = results else {
        return Err(invalid());
    };

    items
        .iter()
        .map(|item| {
            let field = |key: &str| item.get(key).and_then(Value::as_str).map(str::to_string);
            match (field("label"), field("coordinates"), field("country_code")) {
                (Some(label), Some(coordinates), Some(country_code)) => Ok(AddressSuggestion {
                    label,
                    coordinates,
                    country_code,
                }),
                _ => Err(invalid()),
            }
        })
        .collect()
}
