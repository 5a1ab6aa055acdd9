//! Pricing Package Registry
//!
//! Admin-managed fee packages merchants can be assigned to. A package
//! only participates in fee resolution once it is published, active and
//! not soft-deleted; drafts stay editable but never price a live order.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::FeeError;

/// Pricing package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingPackage {
    /// Package id
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Fixed fee component in paise
    pub fixed_fee_paise: Option<i64>,
    /// Variable fee component in basis points
    pub variable_fee_bps: Option<i64>,
    /// Lifecycle state
    pub lifecycle: PackageLifecycle,
    /// Kill switch, independent of lifecycle
    pub is_active: bool,
    /// Soft-delete timestamp
    pub deleted_at: Option<DateTime<Utc>>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl PricingPackage {
    /// Whether this package may be used for live fee resolution
    pub fn is_resolvable(&self) -> bool {
        self.deleted_at.is_none() && self.lifecycle == PackageLifecycle::Published && self.is_active
    }
}

/// Package lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageLifecycle {
    /// Editable, never applied to live resolution
    Draft,
    /// Frozen and eligible for assignment
    Published,
}

/// Pricing package registry
pub struct PackageRegistry {
    packages: Arc<RwLock<HashMap<Uuid, PricingPackage>>>,
}

impl PackageRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            packages: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a draft package
    pub fn create(
        &self,
        name: &str,
        fixed_fee_paise: Option<i64>,
        variable_fee_bps: Option<i64>,
    ) -> PricingPackage {
        let package = PricingPackage {
            id: Uuid::new_v4(),
            name: name.into(),
            fixed_fee_paise,
            variable_fee_bps,
            lifecycle: PackageLifecycle::Draft,
            is_active: true,
            deleted_at: None,
            created_at: Utc::now(),
        };
        self.packages.write().insert(package.id, package.clone());
        package
    }

    /// Get a package regardless of lifecycle
    pub fn get(&self, id: Uuid) -> Option<PricingPackage> {
        self.packages.read().get(&id).cloned()
    }

    /// Get a package only if eligible for live fee resolution
    pub fn resolvable(&self, id: Uuid) -> Option<PricingPackage> {
        self.packages
            .read()
            .get(&id)
            .filter(|p| p.is_resolvable())
            .cloned()
    }

    /// Update fee fields; drafts only
    pub fn update_fees(
        &self,
        id: Uuid,
        fixed_fee_paise: Option<i64>,
        variable_fee_bps: Option<i64>,
    ) -> Result<PricingPackage, FeeError> {
        let mut packages = self.packages.write();
        let package = packages.get_mut(&id).ok_or(FeeError::PackageNotFound(id))?;
        if package.lifecycle != PackageLifecycle::Draft {
            return Err(FeeError::PackageLocked(id));
        }
        package.fixed_fee_paise = fixed_fee_paise;
        package.variable_fee_bps = variable_fee_bps;
        Ok(package.clone())
    }

    /// Publish a draft
    pub fn publish(&self, id: Uuid) -> Result<PricingPackage, FeeError> {
        let mut packages = self.packages.write();
        let package = packages.get_mut(&id).ok_or(FeeError::PackageNotFound(id))?;
        package.lifecycle = PackageLifecycle::Published;
        Ok(package.clone())
    }

    /// Toggle the active switch
    pub fn set_active(&self, id: Uuid, active: bool) -> Result<(), FeeError> {
        let mut packages = self.packages.write();
        let package = packages.get_mut(&id).ok_or(FeeError::PackageNotFound(id))?;
        package.is_active = active;
        Ok(())
    }

    /// Soft-delete a package
    pub fn soft_delete(&self, id: Uuid) -> Result<(), FeeError> {
        let mut packages = self.packages.write();
        let package = packages.get_mut(&id).ok_or(FeeError::PackageNotFound(id))?;
        package.deleted_at = Some(Utc::now());
        Ok(())
    }

    /// All non-deleted packages
    pub fn list(&self) -> Vec<PricingPackage> {
        self.packages
            .read()
            .values()
            .filter(|p| p.deleted_at.is_none())
            .cloned()
            .collect()
    }
}

impl Default for PackageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_not_resolvable() {
        let registry = PackageRegistry::new();
        let p = registry.create("Starter", Some(300), Some(150));
        assert!(registry.resolvable(p.id).is_none());

        registry.publish(p.id).unwrap();
        assert!(registry.resolvable(p.id).is_some());
    }

    #[test]
    fn test_inactive_and_deleted_not_resolvable() {
        let registry = PackageRegistry::new();
        let p = registry.create("Starter", Some(300), Some(150));
        registry.publish(p.id).unwrap();

        registry.set_active(p.id, false).unwrap();
        assert!(registry.resolvable(p.id).is_none());
        registry.set_active(p.id, true).unwrap();

        registry.soft_delete(p.id).unwrap();
        assert!(registry.resolvable(p.id).is_none());
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_published_package_locked() {
        let registry = PackageRegistry::new();
        let p = registry.create("Starter", Some(300), Some(150));
        registry.update_fees(p.id, Some(400), Some(150)).unwrap();
        registry.publish(p.id).unwrap();

        assert!(matches!(
            registry.update_fees(p.id, Some(500), None),
            Err(FeeError::PackageLocked(_))
        ));
    }
}
