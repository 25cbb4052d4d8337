use tracing::{debug, warn};

use crate::error::OnboardingError;
use crate::models::{Actor, ApprovalStatus, LifecycleAction, SpecialistAccount};
use crate::services::completeness::ProfileCompletenessEvaluator;

/// Where a permitted transition leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    To(ApprovalStatus),
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    ProfileComplete,
    DocumentsFilled,
    DocumentsVerified,
}

#[derive(Debug, Clone, Copy)]
pub struct TransitionRule {
    pub actor: Actor,
    pub action: LifecycleAction,
    pub from: ApprovalStatus,
    pub to: Transition,
    pub preconditions: &'static [Precondition],
}

const RULES: &[TransitionRule] = &[
    TransitionRule {
        actor: Actor::Specialist,
        action: LifecycleAction::CompleteProfile,
        from: ApprovalStatus::ProfileIncomplete,
        to: Transition::To(ApprovalStatus::DocumentsIncomplete),
        preconditions: &[Precondition::ProfileComplete],
    },
    TransitionRule {
        actor: Actor::Specialist,
        action: LifecycleAction::SubmitForApproval,
        from: ApprovalStatus::DocumentsIncomplete,
        to: Transition::To(ApprovalStatus::UnderReview),
        preconditions: &[Precondition::ProfileComplete, Precondition::DocumentsFilled],
    },
    TransitionRule {
        actor: Actor::Admin,
        action: LifecycleAction::Approve,
        from: ApprovalStatus::UnderReview,
        to: Transition::To(ApprovalStatus::Approved),
        preconditions: &[
            Precondition::ProfileComplete,
            Precondition::DocumentsFilled,
            Precondition::DocumentsVerified,
        ],
    },
    TransitionRule {
        actor: Actor::Admin,
        action: LifecycleAction::Reject,
        from: ApprovalStatus::UnderReview,
        to: Transition::To(ApprovalStatus::Rejected),
        preconditions: &[],
    },
    TransitionRule {
        actor: Actor::Admin,
        action: LifecycleAction::Suspend,
        from: ApprovalStatus::Approved,
        to: Transition::To(ApprovalStatus::Suspended),
        preconditions: &[],
    },
    TransitionRule {
        actor: Actor::Admin,
        action: LifecycleAction::Unsuspend,
        from: ApprovalStatus::Suspended,
        to: Transition::To(ApprovalStatus::Approved),
        preconditions: &[],
    },
    TransitionRule {
        actor: Actor::Admin,
        action: LifecycleAction::Delete,
        from: ApprovalStatus::Rejected,
        to: Transition::Remove,
        preconditions: &[],
    },
    TransitionRule {
        actor: Actor::Specialist,
        action: LifecycleAction::Reopen,
        from: ApprovalStatus::Rejected,
        to: Transition::To(ApprovalStatus::ProfileIncomplete),
        preconditions: &[],
    },
];

/// The only component that decides `approval_status` changes.
#[derive(Debug, Clone)]
pub struct TransitionGuard {
    evaluator: ProfileCompletenessEvaluator,
    require_verified_documents: bool,
}

impl TransitionGuard {
    pub fn new(require_verified_documents: bool) -> Self {
        Self {
            evaluator: ProfileCompletenessEvaluator::new(),
            require_verified_documents,
        }
    }

    pub fn rule(
        actor: Actor,
        action: LifecycleAction,
        from: ApprovalStatus,
    ) -> Option<&'static TransitionRule> {
        let from = from.normalized();
        RULES
            .iter()
            .find(|rule| rule.actor == actor && rule.action == action && rule.from == from)
    }

    /// Actions `actor` may request from `status`, preconditions aside.
    pub fn allowed_actions(actor: Actor, status: ApprovalStatus) -> Vec<LifecycleAction> {
        let status = status.normalized();
        RULES
            .iter()
            .filter(|rule| rule.actor == actor && rule.from == status)
            .map(|rule| rule.action)
            .collect()
    }

    /// Checks the table row and its preconditions against the account as it
    /// is now. Returns the target; never mutates.
    pub fn authorize(
        &self,
        actor: Actor,
        action: LifecycleAction,
        account: &SpecialistAccount,
    ) -> Result<Transition, OnboardingError> {
        let from = account.status();
        debug!("Authorizing {:?} {} from {}", actor, action, from);

        let rule = Self::rule(actor, action, from).ok_or_else(|| {
            warn!("Rejected transition: {:?} cannot {} from {}", actor, action, from);
            OnboardingError::InvalidTransition { from, action }
        })?;

        let unmet = self.unmet_preconditions(rule.preconditions, account);
        if !unmet.is_empty() {
            warn!(
                "Preconditions for {} on {} not met: {} issue(s)",
                action,
                account.id,
                unmet.len()
            );
            return Err(OnboardingError::PreconditionFailed(unmet));
        }

        Ok(rule.to)
    }

    pub fn unmet_preconditions(
        &self,
        preconditions: &[Precondition],
        account: &SpecialistAccount,
    ) -> Vec<String> {
        let mut unmet = Vec::new();

        for precondition in preconditions {
            match precondition {
                Precondition::ProfileComplete => {
                    let report = self.evaluator.evaluate(&account.profile);
                    unmet.extend(report.missing.iter().map(|error| format!("profile {}", error)));
                }
                Precondition::DocumentsFilled => {
                    unmet.extend(
                        account
                            .documents
                            .missing()
                            .into_iter()
                            .map(|document_type| format!("document missing: {}", document_type)),
                    );
                }
                Precondition::DocumentsVerified => {
                    if !self.require_verified_documents {
                        continue;
                    }
                    // Empty slots are already reported by `DocumentsFilled`.
                    unmet.extend(
                        account
                            .documents
                            .unverified()
                            .into_iter()
                            .filter(|document_type| account.documents.get(*document_type).is_some())
                            .map(|document_type| format!("document not verified: {}", document_type)),
                    );
                }
            }
        }

        unmet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_one_row_per_actor_action_state() {
        for (i, a) in RULES.iter().enumerate() {
            for b in &RULES[i + 1..] {
                assert!(
                    !(a.actor == b.actor && a.action == b.action && a.from == b.from),
                    "duplicate row for {:?} {} from {}",
                    a.actor,
                    a.action,
                    a.from
                );
            }
        }
    }

    #[test]
    fn no_jump_from_profile_incomplete_to_approved() {
        for rule in RULES.iter().filter(|r| r.from == ApprovalStatus::ProfileIncomplete) {
            assert_ne!(rule.to, Transition::To(ApprovalStatus::Approved));
        }
    }

    #[test]
    fn admin_actions_from_approved() {
        assert_eq!(
            TransitionGuard::allowed_actions(Actor::Admin, ApprovalStatus::Approved),
            vec![LifecycleAction::Suspend]
        );
        assert!(TransitionGuard::allowed_actions(Actor::Specialist, ApprovalStatus::Approved).is_empty());
    }

    #[test]
    fn pending_uses_profile_incomplete_rows() {
        assert!(TransitionGuard::rule(
            Actor::Specialist,
            LifecycleAction::CompleteProfile,
            ApprovalStatus::Pending
        )
        .is_some());
    }

    #[test]
    fn unverified_documents_ignored_when_not_required() {
        let mut account = SpecialistAccount::new(uuid::Uuid::new_v4());
        account.approval_status = ApprovalStatus::UnderReview;

        let strict = TransitionGuard::new(true);
        let lenient = TransitionGuard::new(false);
        let only_verification = [Precondition::DocumentsVerified];

        // All slots empty: verification is not reported twice.
        assert!(strict.unmet_preconditions(&only_verification, &account).is_empty());
        assert!(lenient.unmet_preconditions(&only_verification, &account).is_empty());
    }
}
