// The incoming invoice as seen by the approval workflow, and the read-only
// lookups its guards consult.

use serde::{Deserialize, Serialize};

use crate::state::{SubjectId, WorkflowSubject};

/// An incoming invoice awaiting approval.
///
/// Only the links the approval guards need are modelled here; the financial
/// fields live with the invoice itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingInvoice {
    pub reference: String,
    /// Project the invoice is booked against, if any
    pub project: Option<String>,
    /// Fixed asset (property) the invoice is booked against, if any
    pub fixed_asset: Option<String>,
}

impl IncomingInvoice {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            project: None,
            fixed_asset: None,
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_fixed_asset(mut self, fixed_asset: impl Into<String>) -> Self {
        self.fixed_asset = Some(fixed_asset.into());
        self
    }
}

impl WorkflowSubject for IncomingInvoice {
    fn subject_id(&self) -> SubjectId {
        SubjectId::new(self.reference.clone())
    }
}

/// Read-only questions the invoice transition guards ask
pub trait InvoiceLookups: Send + Sync {
    fn has_project(&self, invoice: &IncomingInvoice) -> bool;

    fn has_fixed_asset(&self, invoice: &IncomingInvoice) -> bool;
}

/// Answers lookups from the links recorded on the invoice itself
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkedRecords;

impl InvoiceLookups for LinkedRecords {
    fn has_project(&self, invoice: &IncomingInvoice) -> bool {
        invoice.project.as_deref().is_some_and(|p| !p.trim().is_empty())
    }

    fn has_fixed_asset(&self, invoice: &IncomingInvoice) -> bool {
        invoice
            .fixed_asset
            .as_deref()
            .is_some_and(|a| !a.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linked_records() {
        let lookups = LinkedRecords;
        let plain = IncomingInvoice::new("INV-1");
        assert!(!lookups.has_project(&plain));
        assert!(!lookups.has_fixed_asset(&plain));

        let linked = IncomingInvoice::new("INV-2")
            .with_project("PRJ-OXF")
            .with_fixed_asset("OXF");
        assert!(lookups.has_project(&linked));
        assert!(lookups.has_fixed_asset(&linked));
    }

    #[test]
    fn test_blank_links_do_not_count() {
        let invoice = IncomingInvoice::new("INV-3").with_project("  ");
        assert!(!LinkedRecords.has_project(&invoice));
    }

    #[test]
    fn test_subject_id_is_reference() {
        let invoice = IncomingInvoice::new("INV-42");
        assert_eq!(invoice.subject_id().as_str(), "INV-42");
    }
}
