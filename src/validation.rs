//! Input validation for contact queries and mutations
//!
//! Pure checks, no I/O. Every function fails fast on the first violation and
//! the `Display` text of each error is stable: callers match on it.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::contact::{Contact, DeleteRequest, ExtraProperty};

const BIRTHDAY_PATTERN: &str = r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("extraProperties must be an array")]
    ExtraPropertiesNotArray,
    #[error("properties in extraProperties must be one of {}", ExtraProperty::allow_list())]
    UnknownExtraProperty(String),
    #[error("contact must be a non-empty object")]
    EmptyContact,
    #[error("{0} must be a string")]
    NotAString(&'static str),
    #[error("birthday must use YYYY-MM-DD format")]
    BirthdayFormat,
    #[error("{0} must be an array")]
    NotAnArray(&'static str),
    #[error("selector must be an object")]
    SelectorNotObject,
    #[error("name or identifier must be provided")]
    MissingSelector,
}

/// Options for [`validate_contact`]
#[derive(Debug, Clone, Copy)]
pub struct ContactRules {
    pub require_non_empty: bool,
}

impl Default for ContactRules {
    fn default() -> Self {
        Self { require_non_empty: true }
    }
}

fn birthday_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(BIRTHDAY_PATTERN).expect("birthday pattern compiles"))
}

/// Format-only check; calendar validity is left to the store.
pub fn is_valid_birthday(birthday: &str) -> bool {
    birthday_regex().is_match(birthday)
}

/// Absent (or null) means no extras. Duplicates are collapsed, first wins.
pub fn validate_extra_properties(
    value: Option<&Value>,
) -> Result<Vec<ExtraProperty>, ValidationError> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ValidationError::ExtraPropertiesNotArray),
    };

    let mut seen = HashSet::new();
    let mut properties = Vec::with_capacity(items.len());
    for item in items {
        let property = item
            .as_str()
            .and_then(|s| s.parse::<ExtraProperty>().ok())
            .ok_or_else(|| ValidationError::UnknownExtraProperty(item.to_string()))?;
        if seen.insert(property) {
            properties.push(property);
        }
    }
    Ok(properties)
}

/// Present means the key exists with a non-null value
fn present<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|v| !v.is_null())
}

fn string_field(
    object: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<String>, ValidationError> {
    match present(object, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::NotAString(key)),
    }
}

fn array_field(
    object: &Map<String, Value>,
    key: &'static str,
) -> Result<Vec<String>, ValidationError> {
    match present(object, key) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => {
            let strings: Vec<String> = items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect();
            if strings.len() != items.len() {
                tracing::warn!(
                    field = key,
                    dropped = items.len() - strings.len(),
                    "Dropping non-string entries"
                );
            }
            Ok(strings)
        }
        Some(_) => Err(ValidationError::NotAnArray(key)),
    }
}

/// Check a contact mutation and build the typed [`Contact`] from it.
///
/// Order: emptiness, firstName, lastName, nickname, birthday, phoneNumbers,
/// emailAddresses, identifier.
pub fn validate_contact(value: &Value, rules: ContactRules) -> Result<Contact, ValidationError> {
    let object = value.as_object().ok_or(ValidationError::EmptyContact)?;
    if rules.require_non_empty && object.is_empty() {
        return Err(ValidationError::EmptyContact);
    }

    let first_name = string_field(object, "firstName")?;
    let last_name = string_field(object, "lastName")?;
    let nickname = string_field(object, "nickname")?;

    let birthday = string_field(object, "birthday")?;
    if let Some(birthday) = &birthday {
        if !is_valid_birthday(birthday) {
            return Err(ValidationError::BirthdayFormat);
        }
    }

    let phone_numbers = array_field(object, "phoneNumbers")?;
    let email_addresses = array_field(object, "emailAddresses")?;
    let identifier = string_field(object, "identifier")?;

    let mut contact = Contact {
        identifier,
        first_name,
        last_name,
        nickname,
        birthday,
        phone_numbers,
        email_addresses,
        ..Default::default()
    };
    for property in ExtraProperty::ALL {
        contact.set_extra(property, present(object, property.as_str()).cloned());
    }
    Ok(contact)
}

pub fn validate_name(value: &Value) -> Result<String, ValidationError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or(ValidationError::NotAString("name"))
}

/// Validate a `{ name, identifier }` selector. Name is checked first.
pub fn validate_name_or_identifier(value: &Value) -> Result<DeleteRequest, ValidationError> {
    let object = value.as_object().ok_or(ValidationError::SelectorNotObject)?;
    Ok(DeleteRequest {
        name: string_field(object, "name")?,
        identifier: string_field(object, "identifier")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ALLOW_LIST_MESSAGE: &str = "properties in extraProperties must be one of jobTitle, \
        departmentName, organizationName, middleName, note, contactImage, contactThumbnailImage, \
        instantMessageAddresses, socialProfiles, urlAddresses";

    fn contact_error(value: Value) -> String {
        validate_contact(&value, ContactRules::default())
            .unwrap_err()
            .to_string()
    }

    #[test]
    fn test_extra_properties_absent_is_empty() {
        assert!(validate_extra_properties(None).unwrap().is_empty());
        assert!(validate_extra_properties(Some(&Value::Null)).unwrap().is_empty());
        assert!(validate_extra_properties(Some(&json!([]))).unwrap().is_empty());
    }

    #[test]
    fn test_extra_properties_must_be_array() {
        for value in [json!("tsk-bad-array"), json!(12345), json!({"a": 1}), json!(true)] {
            let err = validate_extra_properties(Some(&value)).unwrap_err();
            assert_eq!(err.to_string(), "extraProperties must be an array");
        }
    }

    #[test]
    fn test_extra_properties_rejects_unknown_names() {
        for value in [json!(["bad-property"]), json!(["jobTitle", "JobTitle"]), json!([1])] {
            let err = validate_extra_properties(Some(&value)).unwrap_err();
            assert_eq!(err.to_string(), ALLOW_LIST_MESSAGE);
        }
    }

    #[test]
    fn test_extra_properties_parses_and_dedupes() {
        let props = validate_extra_properties(Some(&json!(["note", "jobTitle", "note"]))).unwrap();
        assert_eq!(props, vec![ExtraProperty::Note, ExtraProperty::JobTitle]);
    }

    #[test]
    fn test_contact_must_be_non_empty_object() {
        assert_eq!(contact_error(json!(1)), "contact must be a non-empty object");
        assert_eq!(contact_error(json!({})), "contact must be a non-empty object");
        assert_eq!(contact_error(json!("Sherlock")), "contact must be a non-empty object");
        assert_eq!(contact_error(json!([1, 2])), "contact must be a non-empty object");
    }

    #[test]
    fn test_empty_object_allowed_when_not_required() {
        let rules = ContactRules { require_non_empty: false };
        assert_eq!(validate_contact(&json!({}), rules).unwrap(), Contact::default());
        assert!(validate_contact(&json!(1), rules).is_err());
    }

    #[test]
    fn test_name_fields_must_be_strings() {
        assert_eq!(contact_error(json!({"firstName": 1})), "firstName must be a string");
        assert_eq!(contact_error(json!({"lastName": 1})), "lastName must be a string");
        assert_eq!(contact_error(json!({"nickname": 1})), "nickname must be a string");
    }

    #[test]
    fn test_birthday_rules() {
        assert_eq!(contact_error(json!({"birthday": 1})), "birthday must be a string");
        assert_eq!(
            contact_error(json!({"birthday": "01-01-1970"})),
            "birthday must use YYYY-MM-DD format"
        );
        assert_eq!(
            contact_error(json!({"birthday": "1990-09-09T00:00"})),
            "birthday must use YYYY-MM-DD format"
        );

        let contact = validate_contact(&json!({"birthday": "1990-09-09"}), ContactRules::default())
            .unwrap();
        assert_eq!(contact.birthday.as_deref(), Some("1990-09-09"));
    }

    #[test]
    fn test_birthday_format_only() {
        assert!(is_valid_birthday("1854-01-06"));
        assert!(is_valid_birthday("2023-13-45"));
        assert!(!is_valid_birthday("854-01-06"));
        assert!(!is_valid_birthday("1854/01/06"));
        // Only ASCII digits count
        assert!(!is_valid_birthday("١٩٩٠-٠٩-٠٩"));
        assert!(!is_valid_birthday("１９９０-０９-０９"));
        assert!(!is_valid_birthday("١٩٩٠-09-09"));
    }

    #[test]
    fn test_list_fields_must_be_arrays() {
        assert_eq!(contact_error(json!({"phoneNumbers": 1})), "phoneNumbers must be an array");
        assert_eq!(
            contact_error(json!({"emailAddresses": "a@b.c"})),
            "emailAddresses must be an array"
        );
    }

    #[test]
    fn test_first_violation_wins() {
        let err = contact_error(json!({
            "emailAddresses": 1,
            "birthday": "bad",
            "lastName": 2,
        }));
        assert_eq!(err, "lastName must be a string");
    }

    #[test]
    fn test_identifier_must_be_string() {
        assert_eq!(contact_error(json!({"identifier": 7})), "identifier must be a string");
    }

    #[test]
    fn test_null_fields_treated_as_absent() {
        let contact = validate_contact(
            &json!({"firstName": "Irene", "nickname": null, "phoneNumbers": null}),
            ContactRules::default(),
        )
        .unwrap();
        assert_eq!(contact.nickname, None);
        assert!(contact.phone_numbers.is_empty());
    }

    #[test]
    fn test_builds_full_contact() {
        let contact = validate_contact(
            &json!({
                "firstName": "William",
                "lastName": "Grapeseed",
                "nickname": "Billy",
                "birthday": "1990-09-09",
                "phoneNumbers": ["+1234567890", 42],
                "emailAddresses": ["billy@grapeseed.com"],
                "jobTitle": "Farmer",
                "socialProfiles": [{"service": "x", "username": "billy"}]
            }),
            ContactRules::default(),
        )
        .unwrap();

        assert_eq!(contact.first_name.as_deref(), Some("William"));
        assert_eq!(contact.phone_numbers, vec!["+1234567890".to_string()]);
        assert_eq!(contact.email_addresses, vec!["billy@grapeseed.com".to_string()]);
        assert_eq!(contact.job_title, Some(json!("Farmer")));
        assert_eq!(contact.social_profiles, Some(json!([{"service": "x", "username": "billy"}])));
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name(&json!("jim-bob")).unwrap(), "jim-bob");
        assert_eq!(
            validate_name(&json!(12345)).unwrap_err().to_string(),
            "name must be a string"
        );
    }

    #[test]
    fn test_validate_name_or_identifier() {
        assert_eq!(
            validate_name_or_identifier(&json!({"name": 12345})).unwrap_err().to_string(),
            "name must be a string"
        );
        assert_eq!(
            validate_name_or_identifier(&json!({"identifier": 12345}))
                .unwrap_err()
                .to_string(),
            "identifier must be a string"
        );
        assert_eq!(
            validate_name_or_identifier(&json!({"name": 1, "identifier": 2}))
                .unwrap_err()
                .to_string(),
            "name must be a string"
        );

        let request = validate_name_or_identifier(&json!({"identifier": "abc"})).unwrap();
        assert_eq!(request.identifier.as_deref(), Some("abc"));
        assert_eq!(request.name, None);
    }
}
