//! Precondition checks shared by engine operations. All are read-only.

use crate::error::CaseError;
use tribunal_ledger::DepositLedger;
use tribunal_types::{Case, CaseParams, CaseStatus, ParticipantId, Role};

pub(crate) fn require_status(
    case: &Case,
    allowed: &[CaseStatus],
    action: &'static str,
) -> Result<(), CaseError> {
    if allowed.contains(&case.status) {
        Ok(())
    } else {
        Err(CaseError::InvalidState {
            case: case.id,
            status: case.status,
            action,
        })
    }
}

pub(crate) fn require_distinct_parties(
    complainant: &ParticipantId,
    respondent: &ParticipantId,
) -> Result<(), CaseError> {
    if !complainant.is_valid() || !respondent.is_valid() {
        return Err(CaseError::InvalidParticipant);
    }
    if complainant == respondent {
        return Err(CaseError::SameParty);
    }
    Ok(())
}

/// The principal must hold the class minimum for `role` unfrozen.
pub(crate) fn require_min_unfrozen(
    ledger: &DepositLedger,
    who: &ParticipantId,
    role: Role,
    params: &CaseParams,
) -> Result<(), CaseError> {
    let needed = params.min_deposit(role);
    let available = ledger.unfrozen(who)?;
    if available < needed {
        return Err(CaseError::InsufficientDeposit {
            who: who.clone(),
            needed,
            available,
        });
    }
    Ok(())
}

/// The validator must be registered with enough stake and must not be a party.
pub(crate) fn require_eligible_validator(
    ledger: &DepositLedger,
    case: &Case,
    who: &ParticipantId,
    params: &CaseParams,
) -> Result<(), CaseError> {
    let ineligible = |reason| CaseError::IneligibleValidator {
        who: who.clone(),
        reason,
    };
    if case.is_party(who) {
        return Err(ineligible("party to the case"));
    }
    let row = ledger.account(who).ok_or_else(|| ineligible("no ledger account"))?;
    if row.role != Role::Validator {
        return Err(ineligible("not registered as a validator"));
    }
    if row.staked < params.min_validator_stake {
        return Err(ineligible("stake below minimum"));
    }
    Ok(())
}
