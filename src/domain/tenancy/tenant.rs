//! Tenant aggregate entity.
//!
//! A tenant is one store on the platform, reachable by subdomain or custom
//! domain. The `is_active` flag gates storefront traffic and is mutated only
//! by the subscription lifecycle and the administrator override; during the
//! grace window a CANCELLED-but-not-EXPIRED tenant keeps `is_active = true`.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{TenantId, Timestamp, UserId, ValidationError};

/// Tenant aggregate - one store instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Unique identifier for this tenant.
    pub id: TenantId,

    /// Display name of the store.
    pub name: String,

    /// Platform subdomain, unique, e.g. `acme` in `acme.storeforge.app`.
    pub subdomain: String,

    /// Optional custom domain, unique when set.
    pub custom_domain: Option<String>,

    /// Store owner.
    pub owner_id: UserId,

    /// Whether the storefront serves traffic.
    pub is_active: bool,

    /// When the tenant was created.
    pub created_at: Timestamp,

    /// When the tenant was last updated.
    pub updated_at: Timestamp,
}

impl Tenant {
    /// Creates a new, inactive tenant. Activation happens when the first
    /// setup-fee payment succeeds.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty name or a malformed subdomain.
    pub fn new(
        id: TenantId,
        name: impl Into<String>,
        subdomain: impl Into<String>,
        owner_id: UserId,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        let subdomain = subdomain.into().to_lowercase();
        validate_subdomain(&subdomain)?;

        Ok(Self {
            id,
            name,
            subdomain,
            custom_domain: None,
            owner_id,
            is_active: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Marks the tenant active. Called by the subscription lifecycle.
    pub fn activate(&mut self, now: Timestamp) {
        self.is_active = true;
        self.updated_at = now;
    }

    /// Marks the tenant inactive. Called by the subscription lifecycle on
    /// expiry.
    pub fn deactivate(&mut self, now: Timestamp) {
        self.is_active = false;
        self.updated_at = now;
    }

    /// Administrator override of the activation flag.
    pub fn set_active(&mut self, active: bool, now: Timestamp) {
        self.is_active = active;
        self.updated_at = now;
    }

    /// Returns true if the given user owns this tenant.
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.owner_id == user_id
    }
}

fn validate_subdomain(subdomain: &str) -> Result<(), ValidationError> {
    if subdomain.is_empty() {
        return Err(ValidationError::empty_field("subdomain"));
    }
    let valid_chars = subdomain
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid_chars || subdomain.starts_with('-') || subdomain.ends_with('-') {
        return Err(ValidationError::invalid_format(
            "subdomain",
            "must be lowercase alphanumeric with inner hyphens",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> UserId {
        UserId::new("owner-1").unwrap()
    }

    #[test]
    fn new_tenant_starts_inactive() {
        let tenant =
            Tenant::new(TenantId::new(), "Acme Goods", "acme", owner(), Timestamp::now()).unwrap();

        assert!(!tenant.is_active);
        assert_eq!(tenant.subdomain, "acme");
        assert!(tenant.custom_domain.is_none());
    }

    #[test]
    fn subdomain_is_lowercased() {
        let tenant =
            Tenant::new(TenantId::new(), "Acme", "AcMe", owner(), Timestamp::now()).unwrap();
        assert_eq!(tenant.subdomain, "acme");
    }

    #[test]
    fn rejects_empty_name() {
        let result = Tenant::new(TenantId::new(), "  ", "acme", owner(), Timestamp::now());
        assert!(result.is_err());
    }

    #[test]
    fn rejects_malformed_subdomain() {
        for bad in ["", "-acme", "acme-", "ac me", "acm\u{00e9}"] {
            let result = Tenant::new(TenantId::new(), "Acme", bad, owner(), Timestamp::now());
            assert!(result.is_err(), "subdomain {:?} should be rejected", bad);
        }
    }

    #[test]
    fn accepts_hyphenated_subdomain() {
        let tenant =
            Tenant::new(TenantId::new(), "Acme", "acme-goods-2", owner(), Timestamp::now())
                .unwrap();
        assert_eq!(tenant.subdomain, "acme-goods-2");
    }

    #[test]
    fn activate_and_deactivate_flip_the_flag() {
        let mut tenant =
            Tenant::new(TenantId::new(), "Acme", "acme", owner(), Timestamp::now()).unwrap();

        tenant.activate(Timestamp::now());
        assert!(tenant.is_active);

        tenant.deactivate(Timestamp::now());
        assert!(!tenant.is_active);
    }

    #[test]
    fn admin_override_sets_the_flag_directly() {
        let mut tenant =
            Tenant::new(TenantId::new(), "Acme", "acme", owner(), Timestamp::now()).unwrap();

        tenant.set_active(true, Timestamp::now());
        assert!(tenant.is_active);

        tenant.set_active(false, Timestamp::now());
        assert!(!tenant.is_active);
    }

    #[test]
    fn ownership_check() {
        let tenant =
            Tenant::new(TenantId::new(), "Acme", "acme", owner(), Timestamp::now()).unwrap();

        assert!(tenant.is_owned_by(&owner()));
        assert!(!tenant.is_owned_by(&UserId::new("someone-else").unwrap()));
    }
}
