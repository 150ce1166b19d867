//! The catalog of incoming-invoice transitions
//!
//! Each variant fixes its legal from-states and its single to-state. Guards
//! and role assignments override the engine defaults only where a decision
//! depends on the invoice:
//!
//! ```text
//! NEW ──PM──> APPROVED_BY_PROJECT_MANAGER ──┐
//!  └──AM──> APPROVED_BY_ASSET_MANAGER ──────┴─CD─> APPROVED_BY_COUNTRY_DIRECTOR
//!                                                   └─T─> APPROVED_BY_TREASURER ─PAY─> PAID
//! any APPROVED_BY_* ──CANCEL──> CANCELLED
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::state::IncomingInvoiceState;
use super::subject::{IncomingInvoice, InvoiceLookups};
use crate::errors::{Result, WorkflowError};
use crate::state::{create_transition, Role, StateTransitionType, Transition, TransitionRepository};

use IncomingInvoiceState::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncomingInvoiceTransitionType {
    /// Pseudo transition describing entry into the workflow; never applied
    Instantiate,
    ApproveAsProjectManager,
    ApproveAsAssetManager,
    ApproveAsCountryDirector,
    ApproveAsTreasurer,
    Pay,
    Cancel,
}

pub const INVOICE_TRANSITION_TYPES: &[IncomingInvoiceTransitionType] = &[
    IncomingInvoiceTransitionType::Instantiate,
    IncomingInvoiceTransitionType::ApproveAsProjectManager,
    IncomingInvoiceTransitionType::ApproveAsAssetManager,
    IncomingInvoiceTransitionType::ApproveAsCountryDirector,
    IncomingInvoiceTransitionType::ApproveAsTreasurer,
    IncomingInvoiceTransitionType::Pay,
    IncomingInvoiceTransitionType::Cancel,
];

const FROM_NEW: &[IncomingInvoiceState] = &[New];
const FROM_MANAGER_APPROVAL: &[IncomingInvoiceState] =
    &[ApprovedByProjectManager, ApprovedByAssetManager];
const FROM_COUNTRY_DIRECTOR_APPROVAL: &[IncomingInvoiceState] = &[ApprovedByCountryDirector];
const FROM_TREASURER_APPROVAL: &[IncomingInvoiceState] = &[ApprovedByTreasurer];
const FROM_ANY_APPROVAL: &[IncomingInvoiceState] = &[
    ApprovedByProjectManager,
    ApprovedByAssetManager,
    ApprovedByCountryDirector,
    ApprovedByTreasurer,
];

impl StateTransitionType for IncomingInvoiceTransitionType {
    type State = IncomingInvoiceState;
    type Subject = IncomingInvoice;
    type Lookups = dyn InvoiceLookups;

    fn all() -> &'static [Self] {
        INVOICE_TRANSITION_TYPES
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Instantiate => "INSTANTIATE",
            Self::ApproveAsProjectManager => "APPROVE_AS_PROJECT_MANAGER",
            Self::ApproveAsAssetManager => "APPROVE_AS_ASSET_MANAGER",
            Self::ApproveAsCountryDirector => "APPROVE_AS_COUNTRY_DIRECTOR",
            Self::ApproveAsTreasurer => "APPROVE_AS_TREASURER",
            Self::Pay => "PAY",
            Self::Cancel => "CANCEL",
        }
    }

    fn from_states(&self) -> Option<&'static [IncomingInvoiceState]> {
        match self {
            Self::Instantiate => None,
            Self::ApproveAsProjectManager | Self::ApproveAsAssetManager => Some(FROM_NEW),
            Self::ApproveAsCountryDirector => Some(FROM_MANAGER_APPROVAL),
            Self::ApproveAsTreasurer => Some(FROM_COUNTRY_DIRECTOR_APPROVAL),
            Self::Pay => Some(FROM_TREASURER_APPROVAL),
            Self::Cancel => Some(FROM_ANY_APPROVAL),
        }
    }

    fn to_state(&self) -> IncomingInvoiceState {
        match self {
            Self::Instantiate => New,
            Self::ApproveAsProjectManager => ApprovedByProjectManager,
            Self::ApproveAsAssetManager => ApprovedByAssetManager,
            Self::ApproveAsCountryDirector => ApprovedByCountryDirector,
            Self::ApproveAsTreasurer => ApprovedByTreasurer,
            Self::Pay => Paid,
            Self::Cancel => Cancelled,
        }
    }

    fn can_apply(&self, invoice: &IncomingInvoice, lookups: &Self::Lookups) -> bool {
        match self {
            // never offered as a next step
            Self::Instantiate => false,
            Self::ApproveAsProjectManager => lookups.has_project(invoice),
            Self::ApproveAsAssetManager => {
                !lookups.has_project(invoice) && lookups.has_fixed_asset(invoice)
            }
            _ => true,
        }
    }

    fn assign_task_to(&self, _lookups: &Self::Lookups) -> Option<Role> {
        match self {
            Self::ApproveAsProjectManager => Some(Role::ProjectManager),
            Self::ApproveAsAssetManager => Some(Role::AssetManager),
            Self::ApproveAsCountryDirector => Some(Role::CountryDirector),
            Self::ApproveAsTreasurer | Self::Pay => Some(Role::Treasurer),
            Self::Instantiate | Self::Cancel => None,
        }
    }
}

impl IncomingInvoiceTransitionType {
    /// Persist this transition for `invoice` from `from_state`
    pub async fn create_transition<R>(
        &self,
        invoice: &IncomingInvoice,
        lookups: &(dyn InvoiceLookups + 'static),
        from_state: IncomingInvoiceState,
        repository: &R,
    ) -> Result<Transition<Self>>
    where
        R: TransitionRepository<Self> + ?Sized,
    {
        create_transition(*self, invoice, lookups, Some(from_state), repository).await
    }
}

impl fmt::Display for IncomingInvoiceTransitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for IncomingInvoiceTransitionType {
    type Err = WorkflowError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::from_name(&wanted).ok_or_else(|| WorkflowError::UnknownName {
            kind: "transition type",
            name: s.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::subject::LinkedRecords;
    use IncomingInvoiceTransitionType as T;

    fn project_invoice() -> IncomingInvoice {
        IncomingInvoice::new("INV-PRJ").with_project("PRJ-1")
    }

    fn asset_invoice() -> IncomingInvoice {
        IncomingInvoice::new("INV-AST").with_fixed_asset("OXF")
    }

    #[test]
    fn test_every_variant_has_one_destination() {
        let destinations: Vec<_> = INVOICE_TRANSITION_TYPES.iter().map(|t| t.to_state()).collect();
        assert_eq!(
            destinations,
            vec![
                New,
                ApprovedByProjectManager,
                ApprovedByAssetManager,
                ApprovedByCountryDirector,
                ApprovedByTreasurer,
                Paid,
                Cancelled
            ]
        );
    }

    #[test]
    fn test_instantiate_has_no_prior_state_and_never_applies() {
        assert_eq!(T::Instantiate.from_states(), None);
        assert!(!T::Instantiate.can_apply(&project_invoice(), &LinkedRecords));
        assert!(!T::Instantiate.can_apply(&asset_invoice(), &LinkedRecords));
        for state in crate::invoice::INVOICE_STATES {
            assert!(!T::Instantiate.is_legal_from(*state));
        }
    }

    #[test]
    fn test_project_manager_guard() {
        assert!(T::ApproveAsProjectManager.can_apply(&project_invoice(), &LinkedRecords));
        assert!(!T::ApproveAsProjectManager.can_apply(&asset_invoice(), &LinkedRecords));
    }

    #[test]
    fn test_asset_manager_guard_requires_no_project() {
        assert!(T::ApproveAsAssetManager.can_apply(&asset_invoice(), &LinkedRecords));
        assert!(!T::ApproveAsAssetManager.can_apply(&project_invoice(), &LinkedRecords));

        let both = IncomingInvoice::new("INV-BOTH")
            .with_project("PRJ-1")
            .with_fixed_asset("OXF");
        assert!(!T::ApproveAsAssetManager.can_apply(&both, &LinkedRecords));

        let neither = IncomingInvoice::new("INV-NONE");
        assert!(!T::ApproveAsAssetManager.can_apply(&neither, &LinkedRecords));
    }

    #[test]
    fn test_country_director_is_fan_in() {
        assert!(T::ApproveAsCountryDirector.is_legal_from(ApprovedByProjectManager));
        assert!(T::ApproveAsCountryDirector.is_legal_from(ApprovedByAssetManager));
        for state in [New, ApprovedByCountryDirector, ApprovedByTreasurer, Paid, Cancelled] {
            assert!(!T::ApproveAsCountryDirector.is_legal_from(state));
        }
    }

    #[test]
    fn test_cancel_only_from_approved_states() {
        for state in FROM_ANY_APPROVAL {
            assert!(T::Cancel.is_legal_from(*state));
        }
        for state in [New, Paid, Cancelled] {
            assert!(!T::Cancel.is_legal_from(state));
        }
    }

    #[test]
    fn test_terminal_states_are_absorbing() {
        for t in INVOICE_TRANSITION_TYPES {
            assert!(!t.is_legal_from(Paid));
            assert!(!t.is_legal_from(Cancelled));
        }
    }

    #[test]
    fn test_role_assignment() {
        let lookups = LinkedRecords;
        assert_eq!(T::ApproveAsProjectManager.assign_task_to(&lookups), Some(Role::ProjectManager));
        assert_eq!(T::ApproveAsAssetManager.assign_task_to(&lookups), Some(Role::AssetManager));
        assert_eq!(T::ApproveAsCountryDirector.assign_task_to(&lookups), Some(Role::CountryDirector));
        assert_eq!(T::ApproveAsTreasurer.assign_task_to(&lookups), Some(Role::Treasurer));
        assert_eq!(T::Pay.assign_task_to(&lookups), Some(Role::Treasurer));
        assert_eq!(T::Cancel.assign_task_to(&lookups), None);
        assert_eq!(T::Instantiate.assign_task_to(&lookups), None);
    }

    #[test]
    fn test_friendly_names() {
        assert_eq!(T::ApproveAsProjectManager.friendly_name(), "Approve As Project Manager");
        assert_eq!(T::Pay.friendly_name(), "Pay");
    }

    #[test]
    fn test_prepare_transition_copies_role_and_description() {
        let invoice = project_invoice();
        let request = T::ApproveAsProjectManager.prepare_transition(&invoice, &LinkedRecords, Some(New));
        assert_eq!(request.subject.as_str(), "INV-PRJ");
        assert_eq!(request.from_state, Some(New));
        assert_eq!(request.to_state, ApprovedByProjectManager);
        assert_eq!(request.assigned_role, Some(Role::ProjectManager));
        assert_eq!(request.description, "Approve As Project Manager");
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("pay".parse::<T>().unwrap(), T::Pay);
        assert_eq!(
            "approve-as-country-director".parse::<T>().unwrap(),
            T::ApproveAsCountryDirector
        );
        assert!("REFUND".parse::<T>().is_err());
    }
}
