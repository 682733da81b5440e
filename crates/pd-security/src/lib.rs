//! Security policy, certificate failure descriptions and trust overrides.

use pd_core::BrowserError;
use pd_core::BrowserResult;
use std::borrow::Cow;
use std::collections::BTreeMap;

const CERTIFICATE_FAILURE_REASONS: &[(&str, &str)] = &[
    ("unknown-ca", "The signing certificate authority is not known."),
    (
        "bad-identity",
        "The certificate does not match the expected identity of the site that it was retrieved from.",
    ),
    (
        "not-activated",
        "The certificate's activation time is still in the future.",
    ),
    ("expired", "The certificate has expired."),
    ("revoked", "The certificate has been revoked."),
    ("insecure", "The certificate's algorithm is considered insecure."),
    (
        "generic-error",
        "Some other error occurred validating the certificate.",
    ),
];

/// Central security policy for error-page behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityPolicy {
    /// Offer the user a way to trust a certificate that failed validation.
    pub allow_certificate_overrides: bool,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            allow_certificate_overrides: true,
        }
    }
}

/// Opaque peer certificate as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Certificate {
    pem: String,
}

impl Certificate {
    pub fn from_pem(pem: impl Into<String>) -> Self {
        Self { pem: pem.into() }
    }

    pub fn pem(&self) -> &str {
        &self.pem
    }
}

/// Returns the human-readable clause describing one certificate failure flag.
pub fn certificate_failure_reason(flag: &str) -> Cow<'static, str> {
    CERTIFICATE_FAILURE_REASONS
        .iter()
        .find(|(known, _)| *known == flag)
        .map_or_else(
            || Cow::Owned(format!("Unknown error code `{flag}`")),
            |(_, reason)| Cow::Borrowed(*reason),
        )
}

/// Joins the reason clauses for every flag, preserving flag order.
pub fn describe_certificate_failure(flags: &[String]) -> String {
    flags
        .iter()
        .map(|flag| certificate_failure_reason(flag))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Process-lifetime store of certificates the user chose to trust anyway.
#[derive(Debug, Clone, Default)]
pub struct CertificateOverrides {
    allowed: BTreeMap<String, Vec<Certificate>>,
}

impl CertificateOverrides {
    pub fn allow(&mut self, host: &str, certificate: &Certificate) -> BrowserResult<()> {
        let host = normalize_host(host)?;
        let entries = self.allowed.entry(host).or_default();
        if !entries.contains(certificate) {
            entries.push(certificate.clone());
        }
        Ok(())
    }

    pub fn is_allowed(&self, host: &str, certificate: &Certificate) -> bool {
        let Ok(host) = normalize_host(host) else {
            return false;
        };
        self.allowed
            .get(&host)
            .is_some_and(|entries| entries.contains(certificate))
    }
}

fn normalize_host(host: &str) -> BrowserResult<String> {
    let normalized = host.trim().trim_end_matches('.').to_ascii_lowercase();
    if normalized.is_empty() {
        return Err(BrowserError::new(
            "security.override_host_missing",
            "certificate override requires a host",
        ));
    }
    Ok(normalized)
}
