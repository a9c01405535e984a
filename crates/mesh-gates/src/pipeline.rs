//! # Gate Pipeline
//!
//! Bundles the three gates with their registries. The node dispatch path
//! authenticates before duplicate suppression (the authoritative order) and
//! runs schema and authorization after the accept policy; `evaluate` runs
//! all three in order for standalone composition.

use crate::authz::AccessControl;
use crate::errors::{Gate, SecurityError};
use crate::schema::SchemaRegistry;
use mesh_crypto::{sign_bytes, PublicKey, Signature, SignedSubset};
use mesh_types::{Event, Separator, SIGNAL_SUBJECT_PREFIX};
use tracing::debug;

/// The three-gate security pipeline.
pub struct GatePipeline {
    enforce_authentication: bool,
    schemas: SchemaRegistry,
    acl: AccessControl,
}

impl GatePipeline {
    /// Build a pipeline.
    ///
    /// With `enforce_authentication`, unsigned events are rejected; without
    /// it they pass the authentication gate unverified.
    #[must_use]
    pub fn new(enforce_authentication: bool, separator: Separator) -> Self {
        Self {
            enforce_authentication,
            schemas: SchemaRegistry::new(),
            acl: AccessControl::new(separator),
        }
    }

    /// The schema registry (gate 2).
    #[must_use]
    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// The access policy (gate 3).
    #[must_use]
    pub fn acl(&self) -> &AccessControl {
        &self.acl
    }

    /// Gate 1: verify the signature over the canonical sign bytes.
    pub fn authenticate(&self, event: &Event) -> Result<(), SecurityError> {
        let Some(integrity) = &event.context.integrity else {
            if self.enforce_authentication {
                return Err(SecurityError::new(
                    Gate::Authentication,
                    "unsigned event in an authenticated runtime",
                ));
            }
            return Ok(());
        };

        let public_key = PublicKey::from_base64(&integrity.public_key)
            .map_err(|e| SecurityError::new(Gate::Authentication, e.to_string()))?;
        let signature = Signature::from_base64(&integrity.signature)
            .map_err(|e| SecurityError::new(Gate::Authentication, e.to_string()))?;

        let subset = SignedSubset::from(&event.context.causal);
        let bytes = sign_bytes(&event.event_type, &event.payload, &subset)
            .map_err(|e| SecurityError::new(Gate::Authentication, e.to_string()))?;

        public_key
            .verify(&bytes, &signature)
            .map_err(|_| SecurityError::new(Gate::Authentication, "signature mismatch"))
    }

    /// Gate 2: compare the payload fingerprint to the registered schema.
    pub fn check_schema(&self, event: &Event) -> Result<(), SecurityError> {
        let Some(expected) = self.schemas.fingerprint(&event.event_type) else {
            return Ok(());
        };

        match &event.context.causal.hash {
            Some(actual) if *actual == expected => Ok(()),
            Some(_) => Err(SecurityError::new(
                Gate::Schema,
                format!("payload shape does not match schema for `{}`", event.event_type),
            )),
            None => Err(SecurityError::new(
                Gate::Schema,
                format!("event of registered type `{}` carries no hash", event.event_type),
            )),
        }
    }

    /// Gate 3: consult the access policy with the immediate sender as the
    /// principal.
    ///
    /// Completion signals are runtime synthetics correlated by their
    /// pending token; they pass regardless of the rule set so a
    /// restrictive policy cannot sever request/reply.
    pub fn authorize(&self, event: &Event) -> Result<(), SecurityError> {
        if event.event_type.starts_with(SIGNAL_SUBJECT_PREFIX) {
            return Ok(());
        }
        let principal = event.sender().as_str();
        if self.acl.permits(principal, &event.event_type) {
            Ok(())
        } else {
            Err(SecurityError::new(
                Gate::Authorization,
                format!("`{principal}` may not deliver `{}`", event.event_type),
            ))
        }
    }

    /// Run all three gates in order.
    pub fn evaluate(&self, event: &Event) -> Result<(), SecurityError> {
        self.authenticate(event)?;
        self.check_schema(event)?;
        self.authorize(event)?;
        debug!(event_type = %event.event_type, sender = %event.sender(), "Gates passed");
        Ok(())
    }
}
