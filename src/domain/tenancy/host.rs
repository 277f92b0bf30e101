//! Host-header resolution for tenant lookup.
//!
//! Every storefront and admin request arrives on either a platform subdomain
//! (`acme.storeforge.app`) or a tenant's custom domain. This value object
//! classifies the Host header; the repository lookup happens in the gate
//! middleware.

use crate::domain::foundation::ValidationError;

/// A parsed request host identifying which tenant is being addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreHost {
    /// A subdomain of the platform base domain.
    Subdomain(String),
    /// Any other host, treated as a candidate custom domain.
    CustomDomain(String),
}

impl StoreHost {
    /// Parses a Host header value against the platform base domain.
    ///
    /// Strips any port, lowercases, and classifies. The bare base domain and
    /// `www.<base>` are not tenant hosts and are rejected.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty header, a bare platform
    /// domain, or a nested subdomain.
    pub fn parse(host_header: &str, base_domain: &str) -> Result<Self, ValidationError> {
        let host = host_header
            .split(':')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        if host.is_empty() {
            return Err(ValidationError::empty_field("host"));
        }

        let base = base_domain.to_lowercase();
        if host == base || host == format!("www.{}", base) {
            return Err(ValidationError::invalid_format(
                "host",
                "platform domain does not address a store",
            ));
        }

        match host.strip_suffix(&format!(".{}", base)) {
            Some(label) => {
                if label.is_empty() || label.contains('.') {
                    return Err(ValidationError::invalid_format(
                        "host",
                        "expected a single subdomain label",
                    ));
                }
                Ok(StoreHost::Subdomain(label.to_string()))
            }
            None => Ok(StoreHost::CustomDomain(host)),
        }
    }
}
