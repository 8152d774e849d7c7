//! Naming helpers shared by models and relations.
//!
//! Table names and default foreign keys are derived from model names:
//! `Company` → `companies`, `company_id`.

use heck::{ToLowerCamelCase, ToSnakeCase};

/// Underscore a model name: `EmployeeAddress` → `employee_address`.
pub fn underscore(name: &str) -> String {
    name.to_snake_case()
}

/// Table name for a model name: underscored, then pluralized on the last word.
///
/// ```
/// use tidepool::utils::tableize;
///
/// assert_eq!(tableize("Company"), "companies");
/// assert_eq!(tableize("EmployeeAddress"), "employee_addresses");
/// ```
pub fn tableize(name: &str) -> String {
    let snake = underscore(name);
    match snake.rsplit_once('_') {
        Some((head, last)) => format!("{head}_{}", pluralizer::pluralize(last, 2, false)),
        None => pluralizer::pluralize(&snake, 2, false),
    }
}

/// Default foreign key pointing at rows of the named model.
pub fn foreign_key(model_name: &str) -> String {
    format!("{}_id", underscore(model_name))
}

/// `birth_date` → `birthDate`
pub fn camelize(key: &str) -> String {
    key.to_lower_camel_case()
}

/// Case of the keys an instance is serialized with.
///
/// Props are always stored under their column names; this only affects
/// `to_json` and `Serialize` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyCase {
    /// Column names as returned by the database
    #[default]
    Column,
    /// lowerCamelCase
    Camel,
}

impl KeyCase {
    pub fn apply(self, key: &str) -> String {
        match self {
            Self::Column => key.to_string(),
            Self::Camel => camelize(key),
        }
    }
}
