//! Contact value types shared by the client, validation, and stores

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::traits::ContactSelector;

/// Extended contact fields a read may request beyond the default projection.
///
/// Declaration order is the canonical order used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtraProperty {
    JobTitle,
    DepartmentName,
    OrganizationName,
    MiddleName,
    Note,
    ContactImage,
    ContactThumbnailImage,
    InstantMessageAddresses,
    SocialProfiles,
    UrlAddresses,
}

impl ExtraProperty {
    pub const ALL: [ExtraProperty; 10] = [
        ExtraProperty::JobTitle,
        ExtraProperty::DepartmentName,
        ExtraProperty::OrganizationName,
        ExtraProperty::MiddleName,
        ExtraProperty::Note,
        ExtraProperty::ContactImage,
        ExtraProperty::ContactThumbnailImage,
        ExtraProperty::InstantMessageAddresses,
        ExtraProperty::SocialProfiles,
        ExtraProperty::UrlAddresses,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtraProperty::JobTitle => "jobTitle",
            ExtraProperty::DepartmentName => "departmentName",
            ExtraProperty::OrganizationName => "organizationName",
            ExtraProperty::MiddleName => "middleName",
            ExtraProperty::Note => "note",
            ExtraProperty::ContactImage => "contactImage",
            ExtraProperty::ContactThumbnailImage => "contactThumbnailImage",
            ExtraProperty::InstantMessageAddresses => "instantMessageAddresses",
            ExtraProperty::SocialProfiles => "socialProfiles",
            ExtraProperty::UrlAddresses => "urlAddresses",
        }
    }

    /// Comma-separated allow-list, e.g. for error messages
    pub fn allow_list() -> String {
        Self::ALL
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ExtraProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProperty(pub String);

impl FromStr for ExtraProperty {
    type Err = UnknownProperty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownProperty(s.to_string()))
    }
}

/// A single address-book record.
///
/// Extended fields are opaque to this crate and only ever passed through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(default)]
    pub phone_numbers: Vec<String>,
    #[serde(default)]
    pub email_addresses: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_image: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_thumbnail_image: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instant_message_addresses: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_profiles: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_addresses: Option<Value>,
}

impl Contact {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
            ..Default::default()
        }
    }

    pub fn extra(&self, property: ExtraProperty) -> Option<&Value> {
        self.extra_slot(property).as_ref()
    }

    pub fn set_extra(&mut self, property: ExtraProperty, value: Option<Value>) {
        *self.extra_slot_mut(property) = value;
    }

    fn extra_slot(&self, property: ExtraProperty) -> &Option<Value> {
        match property {
            ExtraProperty::JobTitle => &self.job_title,
            ExtraProperty::DepartmentName => &self.department_name,
            ExtraProperty::OrganizationName => &self.organization_name,
            ExtraProperty::MiddleName => &self.middle_name,
            ExtraProperty::Note => &self.note,
            ExtraProperty::ContactImage => &self.contact_image,
            ExtraProperty::ContactThumbnailImage => &self.contact_thumbnail_image,
            ExtraProperty::InstantMessageAddresses => &self.instant_message_addresses,
            ExtraProperty::SocialProfiles => &self.social_profiles,
            ExtraProperty::UrlAddresses => &self.url_addresses,
        }
    }

    fn extra_slot_mut(&mut self, property: ExtraProperty) -> &mut Option<Value> {
        match property {
            ExtraProperty::JobTitle => &mut self.job_title,
            ExtraProperty::DepartmentName => &mut self.department_name,
            ExtraProperty::OrganizationName => &mut self.organization_name,
            ExtraProperty::MiddleName => &mut self.middle_name,
            ExtraProperty::Note => &mut self.note,
            ExtraProperty::ContactImage => &mut self.contact_image,
            ExtraProperty::ContactThumbnailImage => &mut self.contact_thumbnail_image,
            ExtraProperty::InstantMessageAddresses => &mut self.instant_message_addresses,
            ExtraProperty::SocialProfiles => &mut self.social_profiles,
            ExtraProperty::UrlAddresses => &mut self.url_addresses,
        }
    }

    /// Copy of this contact with the base fields plus only the requested extras
    pub fn project(&self, extra: &[ExtraProperty]) -> Contact {
        let mut projected = Contact {
            identifier: self.identifier.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            nickname: self.nickname.clone(),
            birthday: self.birthday.clone(),
            phone_numbers: self.phone_numbers.clone(),
            email_addresses: self.email_addresses.clone(),
            ..Default::default()
        };
        for property in extra {
            projected.set_extra(*property, self.extra(*property).cloned());
        }
        projected
    }

    /// "First Last", skipping missing parts
    pub fn full_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// How an update target is named in "not found" errors
    pub fn describe_target(&self) -> String {
        if let Some(id) = &self.identifier {
            return id.clone();
        }
        let name = self.full_name();
        if name.is_empty() {
            "<no identifier or name>".to_string()
        } else {
            name
        }
    }

    /// Every whitespace-separated fragment of `query` must appear (ignoring
    /// case) in the first name, last name, or nickname.
    pub fn matches_name(&self, query: &str) -> bool {
        let fields: Vec<String> = [&self.first_name, &self.last_name, &self.nickname]
            .into_iter()
            .flatten()
            .map(|s| s.to_lowercase())
            .collect();

        let mut fragments = query.split_whitespace().peekable();
        if fragments.peek().is_none() {
            return false;
        }

        fragments.all(|fragment| {
            let fragment = fragment.to_lowercase();
            fields.iter().any(|field| field.contains(&fragment))
        })
    }
}

impl Contact {
    /// Overwrite fields that are set on `update`. Unset fields and empty
    /// lists leave the stored value alone; the identifier never changes.
    pub fn apply_update(&mut self, update: &Contact) {
        fn take(target: &mut Option<String>, source: &Option<String>) {
            if source.is_some() {
                target.clone_from(source);
            }
        }
        take(&mut self.first_name, &update.first_name);
        take(&mut self.last_name, &update.last_name);
        take(&mut self.nickname, &update.nickname);
        take(&mut self.birthday, &update.birthday);
        if !update.phone_numbers.is_empty() {
            self.phone_numbers.clone_from(&update.phone_numbers);
        }
        if !update.email_addresses.is_empty() {
            self.email_addresses.clone_from(&update.email_addresses);
        }
        for property in ExtraProperty::ALL {
            if let Some(value) = update.extra(property) {
                self.set_extra(property, Some(value.clone()));
            }
        }
    }
}

/// Index of the record an update applies to: by identifier when given,
/// otherwise the first record with the same first and last name.
pub fn position_for_update(contacts: &[Contact], update: &Contact) -> Option<usize> {
    if let Some(id) = &update.identifier {
        return contacts.iter().position(|c| c.identifier.as_ref() == Some(id));
    }
    if update.first_name.is_none() && update.last_name.is_none() {
        return None;
    }
    let wanted = update.full_name().to_lowercase();
    contacts
        .iter()
        .position(|c| c.full_name().to_lowercase() == wanted)
}

/// Index of the record a delete selector resolves to
pub fn position_for_selector(contacts: &[Contact], selector: &ContactSelector) -> Option<usize> {
    match selector {
        ContactSelector::Identifier(id) => contacts
            .iter()
            .position(|c| c.identifier.as_deref() == Some(id.as_str())),
        ContactSelector::Name(name) => contacts.iter().position(|c| c.matches_name(name)),
    }
}

/// Validated `{ name, identifier }` selector for deletes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteRequest {
    pub name: Option<String>,
    pub identifier: Option<String>,
}

impl DeleteRequest {
    /// Identifier wins over name when both are present
    pub fn selector(&self) -> Option<ContactSelector> {
        match (&self.identifier, &self.name) {
            (Some(id), _) => Some(ContactSelector::Identifier(id.clone())),
            (None, Some(name)) => Some(ContactSelector::Name(name.clone())),
            (None, None) => None,
        }
    }
}
