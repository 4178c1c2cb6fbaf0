//! Custom reward negotiation.
//!
//! A child proposes something that is not in the catalog, a parent prices
//! it, then decides. Nothing is debited until approval, and a failed debit
//! leaves the request priced so the parent can adjust or wait.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::{generate_id, CustomRequestStatus, CustomRewardRequest, Decision, StarType};
use crate::error::{Result, StarError};
use crate::ledger::{apply_debit, commit_or_retry, with_retries};
use crate::storage::{HouseholdStore, Versioned, WriteBatch};

/// Id prefix for custom reward requests.
pub const CUSTOM_REQUEST_ID_PREFIX: &str = "cst";

/// What a child asks for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomRewardDraft {
    pub reward_name: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub image_ref: Option<String>,
    /// Defaults to fun stars.
    #[serde(default)]
    pub star_type: Option<StarType>,
}

impl CustomRewardDraft {
    /// A draft with just a name.
    pub fn named(reward_name: impl Into<String>) -> Self {
        Self {
            reward_name: reward_name.into(),
            ..Self::default()
        }
    }
}

/// Custom reward request lifecycle.
#[derive(Debug)]
pub struct CustomRewardNegotiation<'a, S: HouseholdStore + ?Sized> {
    store: &'a S,
    config: &'a Config,
}

impl<'a, S: HouseholdStore + ?Sized> CustomRewardNegotiation<'a, S> {
    /// Create a negotiation over a store.
    pub fn new(store: &'a S, config: &'a Config) -> Self {
        Self { store, config }
    }

    /// Record a child's request. No stars move.
    pub fn submit(
        &self,
        child_id: &str,
        draft: &CustomRewardDraft,
        now: DateTime<Utc>,
    ) -> Result<CustomRewardRequest> {
        let reward_name = draft.reward_name.trim();
        if reward_name.is_empty() {
            return Err(StarError::validation("reward name must not be blank"));
        }

        with_retries("submit_custom_request", self.config.ledger.max_attempts, || {
            let child = self
                .store
                .child(child_id)?
                .ok_or_else(|| StarError::not_found("child", child_id))?;
            let request = CustomRewardRequest {
                id: generate_id(CUSTOM_REQUEST_ID_PREFIX),
                child_id: child_id.to_string(),
                family_id: child.value.family_id,
                reward_name: reward_name.to_string(),
                link: non_blank(draft.link.as_deref()),
                image_ref: non_blank(draft.image_ref.as_deref()),
                star_type: draft.star_type.unwrap_or(StarType::Fun),
                stars_required: None,
                status: CustomRequestStatus::Pending,
                requested_at: now,
                priced_at: None,
                decided_at: None,
            };
            commit_or_retry(
                self.store,
                WriteBatch::new().insert_custom_request(request.clone()),
                request,
            )
        })
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Transition: Pending → StarsSet
    pub fn set_price(&self, id: &str, stars: u32, now: DateTime<Utc>) -> Result<CustomRewardRequest> {
        with_retries("set_custom_price", self.config.ledger.max_attempts, || {
            let current = self.load(id)?;
            match current.value.status {
                CustomRequestStatus::Pending => {}
                status @ (CustomRequestStatus::StarsSet
                | CustomRequestStatus::Approved
                | CustomRequestStatus::Rejected) => {
                    return Err(StarError::already_processed("custom request", id, status));
                }
            }
            if stars == 0 {
                return Err(StarError::validation("price must be at least 1 star"));
            }

            let mut request = current.value;
            request.stars_required = Some(stars);
            request.status = CustomRequestStatus::StarsSet;
            request.priced_at = Some(now);
            commit_or_retry(
                self.store,
                WriteBatch::new().update_custom_request(current.version, request.clone()),
                request,
            )
        })
    }

    /// Transition: StarsSet → Approved | Rejected
    ///
    /// Approval debits `stars_required` in the same commit. If the balance
    /// cannot cover it the request stays `StarsSet` and the error is
    /// returned.
    pub fn decide(
        &self,
        id: &str,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<CustomRewardRequest> {
        with_retries("decide_custom_request", self.config.ledger.max_attempts, || {
            let current = self.load(id)?;
            match current.value.status {
                CustomRequestStatus::StarsSet => {}
                CustomRequestStatus::Pending => {
                    return Err(StarError::validation(format!(
                        "custom request {} has no price set yet",
                        id
                    )));
                }
                status @ (CustomRequestStatus::Approved | CustomRequestStatus::Rejected) => {
                    return Err(StarError::already_processed("custom request", id, status));
                }
            }

            let mut request = current.value;
            request.decided_at = Some(now);
            let batch = match decision {
                Decision::Approve => {
                    let stars = request.stars_required.ok_or_else(|| {
                        StarError::validation(format!("custom request {} has no price set yet", id))
                    })?;
                    let owner = self
                        .store
                        .child(&request.child_id)?
                        .ok_or_else(|| StarError::not_found("child", request.child_id.clone()))?;
                    let mut child = owner.value;
                    apply_debit(&mut child, request.star_type, stars)?;
                    request.status = CustomRequestStatus::Approved;
                    WriteBatch::new()
                        .child(owner.version, child)
                        .update_custom_request(current.version, request.clone())
                }
                Decision::Reject => {
                    request.status = CustomRequestStatus::Rejected;
                    WriteBatch::new().update_custom_request(current.version, request.clone())
                }
            };
            commit_or_retry(self.store, batch, request)
        })
    }

    fn load(&self, id: &str) -> Result<Versioned<CustomRewardRequest>> {
        self.store
            .custom_request(id)?
            .ok_or_else(|| StarError::not_found("custom request", id))
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
