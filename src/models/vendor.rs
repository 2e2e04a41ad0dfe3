use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when registering a vendor.
#[derive(Debug, Clone, Default)]
pub struct NewVendor {
    pub name: String,
    pub email: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category: Option<String>,
    pub notes: Option<String>,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct VendorChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category: Option<String>,
    pub notes: Option<String>,
}

impl VendorChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.contact_person.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.category.is_none()
            && self.notes.is_none()
    }

    pub fn apply(self, vendor: &mut Vendor) {
        if let Some(name) = self.name {
            vendor.name = name;
        }
        if let Some(email) = self.email {
            vendor.email = email;
        }
        if self.contact_person.is_some() {
            vendor.contact_person = self.contact_person;
        }
        if self.phone.is_some() {
            vendor.phone = self.phone;
        }
        if self.address.is_some() {
            vendor.address = self.address;
        }
        if self.category.is_some() {
            vendor.category = self.category;
        }
        if self.notes.is_some() {
            vendor.notes = self.notes;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_only_touches_provided_fields() {
        let now = Utc::now();
        let mut vendor = Vendor {
            id: Uuid::new_v4(),
            name: "Acme".into(),
            email: "sales@acme.test".into(),
            contact_person: Some("Wile".into()),
            phone: None,
            address: None,
            category: Some("hardware".into()),
            notes: None,
            created_at: now,
            updated_at: now,
        };

        VendorChanges {
            phone: Some("555-0100".into()),
            ..Default::default()
        }
        .apply(&mut vendor);

        assert_eq!(vendor.name, "Acme");
        assert_eq!(vendor.contact_person.as_deref(), Some("Wile"));
        assert_eq!(vendor.phone.as_deref(), Some("555-0100"));
        assert_eq!(vendor.category.as_deref(), Some("hardware"));
    }

    #[test]
    fn empty_changes_detected() {
        assert!(VendorChanges::default().is_empty());
        let changes = VendorChanges {
            notes: Some("prefers email".into()),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }
}
