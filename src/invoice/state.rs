//! Approval states of an incoming invoice

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::WorkflowError;
use crate::state::WorkflowState;

/// Where an incoming invoice is in its approval workflow.
///
/// `Paid` and `Cancelled` are terminal: no transition lists them as a
/// from-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncomingInvoiceState {
    New,
    ApprovedByProjectManager,
    ApprovedByAssetManager,
    ApprovedByCountryDirector,
    ApprovedByTreasurer,
    Paid,
    Cancelled,
}

/// The canonical ordering of invoice states
pub const INVOICE_STATES: &[IncomingInvoiceState] = &[
    IncomingInvoiceState::New,
    IncomingInvoiceState::ApprovedByProjectManager,
    IncomingInvoiceState::ApprovedByAssetManager,
    IncomingInvoiceState::ApprovedByCountryDirector,
    IncomingInvoiceState::ApprovedByTreasurer,
    IncomingInvoiceState::Paid,
    IncomingInvoiceState::Cancelled,
];

impl IncomingInvoiceState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, IncomingInvoiceState::Paid | IncomingInvoiceState::Cancelled)
    }
}

impl WorkflowState for IncomingInvoiceState {
    fn initial() -> Self {
        IncomingInvoiceState::New
    }

    fn all() -> &'static [Self] {
        INVOICE_STATES
    }

    fn name(&self) -> &'static str {
        match self {
            IncomingInvoiceState::New => "NEW",
            IncomingInvoiceState::ApprovedByProjectManager => "APPROVED_BY_PROJECT_MANAGER",
            IncomingInvoiceState::ApprovedByAssetManager => "APPROVED_BY_ASSET_MANAGER",
            IncomingInvoiceState::ApprovedByCountryDirector => "APPROVED_BY_COUNTRY_DIRECTOR",
            IncomingInvoiceState::ApprovedByTreasurer => "APPROVED_BY_TREASURER",
            IncomingInvoiceState::Paid => "PAID",
            IncomingInvoiceState::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for IncomingInvoiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for IncomingInvoiceState {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::from_name(&wanted).ok_or_else(|| WorkflowError::UnknownName {
            kind: "invoice state",
            name: s.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_new() {
        assert_eq!(IncomingInvoiceState::initial(), IncomingInvoiceState::New);
        assert_eq!(INVOICE_STATES[0], IncomingInvoiceState::New);
        assert_eq!(INVOICE_STATES.len(), 7);
    }

    #[test]
    fn test_terminal_states() {
        assert!(IncomingInvoiceState::Paid.is_terminal());
        assert!(IncomingInvoiceState::Cancelled.is_terminal());
        assert!(!IncomingInvoiceState::New.is_terminal());
        assert!(!IncomingInvoiceState::ApprovedByTreasurer.is_terminal());
    }

    #[test]
    fn test_names_match_serde() {
        for state in INVOICE_STATES {
            let json = serde_json::to_string(state).unwrap();
            assert_eq!(json, format!("\"{}\"", state.name()));
            assert_eq!(state.name().parse::<IncomingInvoiceState>().unwrap(), *state);
        }
    }

    #[test]
    fn test_parse_is_lenient_about_case() {
        assert_eq!(
            "approved-by-treasurer".parse::<IncomingInvoiceState>().unwrap(),
            IncomingInvoiceState::ApprovedByTreasurer
        );
        assert!("ARCHIVED".parse::<IncomingInvoiceState>().is_err());
    }
}
