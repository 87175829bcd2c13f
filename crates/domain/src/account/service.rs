//! Account service: registration, address book and vendor onboarding.

use chrono::Utc;
use common::{AddressId, Role, UserId};
use doc_store::{DocumentStore, Filter, StoreError};
use serde::Deserialize;

use super::{AccountError, AddressInput, BusinessInfo, TaxIdClaim, User, VendorInfo};
use crate::actor::Actor;
use crate::error::DomainError;
use crate::repository::Repository;

/// Attempts at claiming a tax id whose holder keeps releasing it.
const MAX_CLAIM_ATTEMPTS: usize = 3;

/// New account details.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    /// Supplied by the authentication provider and stored as-is.
    #[serde(default)]
    pub credential_hash: String,
}

pub struct AccountService<S: DocumentStore> {
    users: Repository<S, User>,
    claims: Repository<S, TaxIdClaim>,
}

impl<S: DocumentStore + Clone> Clone for AccountService<S> {
    fn clone(&self) -> Self {
        Self {
            users: self.users.clone(),
            claims: self.claims.clone(),
        }
    }
}

impl<S: DocumentStore> AccountService<S> {
    pub fn new(store: S) -> Self
    where
        S: Clone,
    {
        Self {
            users: Repository::new(store.clone()),
            claims: Repository::new(store),
        }
    }

    pub fn repository(&self) -> &Repository<S, User> {
        &self.users
    }

    /// Creates a customer account.
    pub async fn register(&self, registration: Registration) -> Result<User, DomainError> {
        self.register_as(registration, Role::Customer).await
    }

    /// Creates an account with an explicit role. Used for seeding staff accounts.
    #[tracing::instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register_as(
        &self,
        registration: Registration,
        role: Role,
    ) -> Result<User, DomainError> {
        let name = registration.name.trim();
        if name.is_empty() {
            return Err(AccountError::MissingName.into());
        }
        let email = registration.email.trim().to_lowercase();
        if !looks_like_email(&email) {
            return Err(AccountError::InvalidEmail(registration.email).into());
        }

        let taken = self
            .users
            .count(self.users.query().filter(Filter::eq("email", email.clone())))
            .await?;
        if taken > 0 {
            return Err(AccountError::EmailTaken.into());
        }

        let user = User {
            id: UserId::new(),
            name: name.to_string(),
            email,
            credential_hash: registration.credential_hash,
            role,
            addresses: Vec::new(),
            vendor_info: None,
            created_at: Utc::now(),
        };
        let stored = self.users.insert(user).await?;
        tracing::info!(user = %stored.entity.id, role = %role, "user registered");
        Ok(stored.into_inner())
    }

    pub async fn get_user(&self, id: UserId) -> Result<User, DomainError> {
        Ok(self.users.require(id).await?.into_inner())
    }

    /// Resolves a user id to the actor performing a request.
    pub async fn actor(&self, id: UserId) -> Result<Option<Actor>, DomainError> {
        Ok(self
            .users
            .load(id)
            .await?
            .map(|stored| Actor::new(stored.entity.id, stored.entity.role, stored.entity.name)))
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn add_address(&self, user: UserId, input: AddressInput) -> Result<User, DomainError> {
        let stored = self
            .users
            .update(user, |u| {
                u.add_address(input.clone())?;
                Ok(())
            })
            .await?;
        Ok(stored.into_inner())
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn update_address(
        &self,
        user: UserId,
        address: AddressId,
        input: AddressInput,
    ) -> Result<User, DomainError> {
        let stored = self
            .users
            .update(user, |u| {
                u.update_address(address, input.clone())?;
                Ok(())
            })
            .await?;
        Ok(stored.into_inner())
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_address(&self, user: UserId, address: AddressId) -> Result<User, DomainError> {
        let stored = self
            .users
            .update(user, |u| {
                u.remove_address(address)?;
                Ok(())
            })
            .await?;
        Ok(stored.into_inner())
    }

    /// Files or overwrites a vendor application for `user`.
    ///
    /// The tax id is claimed before the user document is written; a claim
    /// held by another account is a conflict. Resubmitting with a different
    /// tax id releases the previous claim.
    #[tracing::instrument(skip(self, info), fields(business = %info.business_name))]
    pub async fn apply_as_vendor(
        &self,
        user: UserId,
        info: BusinessInfo,
    ) -> Result<User, DomainError> {
        info.validate()?;
        let applicant = self.users.require(user).await?.into_inner();
        check_eligible(&applicant)?;

        let newly_claimed = self.claim_tax_id(&info.tax_id, user).await?;

        let mut previous_tax_id = None;
        let updated = self
            .users
            .update(user, |u| {
                check_eligible(u)?;
                previous_tax_id = u.vendor_info.as_ref().map(|v| v.tax_id.clone());
                u.vendor_info = Some(VendorInfo::pending(info.clone(), Utc::now()));
                Ok(())
            })
            .await;

        let stored = match updated {
            Ok(stored) => stored,
            Err(e) => {
                if newly_claimed {
                    self.release_tax_id(&info.tax_id, user).await;
                }
                return Err(e);
            }
        };
        if let Some(previous) = previous_tax_id.filter(|previous| *previous != info.tax_id) {
            self.release_tax_id(&previous, user).await;
        }

        metrics::counter!("vendor_applications_total", "outcome" => "submitted").increment(1);
        tracing::info!(user = %user, "vendor application submitted");
        Ok(stored.into_inner())
    }

    /// Approves or rejects the application on file for `user`. Admin only.
    ///
    /// Approval promotes the user to vendor. Rejection discards the
    /// application and its tax id claim so the user may apply again.
    #[tracing::instrument(skip(self), fields(actor = %actor.id))]
    pub async fn decide_vendor_application(
        &self,
        actor: &Actor,
        user: UserId,
        approved: bool,
    ) -> Result<User, DomainError> {
        actor.require_admin()?;

        let mut rejected_tax_id = None;
        let stored = self
            .users
            .update(user, |u| {
                let Some(application) = u.vendor_info.as_mut() else {
                    return Err(AccountError::NoApplication.into());
                };
                if approved {
                    application.is_approved = true;
                    application.approved_date = Some(Utc::now());
                    u.role = Role::Vendor;
                    rejected_tax_id = None;
                } else {
                    rejected_tax_id = u.vendor_info.take().map(|v| v.tax_id);
                }
                Ok(())
            })
            .await?;

        if let Some(tax_id) = rejected_tax_id {
            self.release_tax_id(&tax_id, user).await;
        }

        let outcome = if approved { "approved" } else { "rejected" };
        metrics::counter!("vendor_applications_total", "outcome" => outcome).increment(1);
        tracing::info!(user = %user, outcome, "vendor application decided");
        Ok(stored.into_inner())
    }

    /// Claims `tax_id` for `user`. Returns true if this call created the claim,
    /// false if the user already held it.
    async fn claim_tax_id(&self, tax_id: &str, user: UserId) -> Result<bool, DomainError> {
        for _ in 0..MAX_CLAIM_ATTEMPTS {
            let claim = TaxIdClaim::new(tax_id, user, Utc::now())?;
            let id = claim.id;
            match self.claims.insert(claim).await {
                Ok(_) => return Ok(true),
                Err(DomainError::Store(StoreError::DuplicateId { .. })) => {}
                Err(e) => return Err(e),
            }
            match self.claims.load(id).await? {
                Some(existing) if existing.entity.holder == user => return Ok(false),
                Some(_) => return Err(AccountError::DuplicateTaxId.into()),
                // Released between our insert and read; try again.
                None => continue,
            }
        }
        Err(AccountError::DuplicateTaxId.into())
    }

    /// Drops the claim on `tax_id` if `user` holds it. Failures are logged.
    async fn release_tax_id(&self, tax_id: &str, user: UserId) {
        let Ok(id) = TaxIdClaim::id_for(tax_id) else {
            return;
        };
        let result = match self.claims.load(id).await {
            Ok(Some(claim)) if claim.entity.holder == user => {
                self.claims.delete(id).await.map(|_| ())
            }
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!(user = %user, error = %e, "failed to release tax id claim");
        }
    }

    /// Users with an application awaiting a decision, oldest first.
    pub async fn pending_applications(&self, actor: &Actor) -> Result<Vec<User>, DomainError> {
        actor.require_admin()?;
        self.users
            .find(
                self.users
                    .query()
                    .filter(Filter::eq("vendor_info.is_approved", false)),
            )
            .await
    }

    pub async fn list_vendors(&self, actor: &Actor) -> Result<Vec<User>, DomainError> {
        actor.require_admin()?;
        self.users
            .find(
                self.users
                    .query()
                    .filter(Filter::eq("role", Role::Vendor.as_str())),
            )
            .await
    }
}

/// Only customers may file or refile an application.
fn check_eligible(user: &User) -> Result<(), DomainError> {
    match user.role {
        Role::Customer => Ok(()),
        Role::Vendor => Err(AccountError::AlreadyVendor.into()),
        Role::Admin => Err(AccountError::NotEligible.into()),
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}
