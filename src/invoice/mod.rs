//! Incoming-invoice approval workflow
//!
//! Project-manager or asset-manager approval, then country director and
//! treasurer approval, then payment; cancellation is possible from any
//! approved state until the invoice is paid.

mod state;
mod subject;
mod transition_type;


pub use state::{IncomingInvoiceState, INVOICE_STATES};
pub use subject::{IncomingInvoice, InvoiceLookups, LinkedRecords};
pub use transition_type::{IncomingInvoiceTransitionType, INVOICE_TRANSITION_TYPES};

use crate::state::{StateTransitionService, SubjectQueryService, Transition};

pub type IncomingInvoiceTransition = Transition<IncomingInvoiceTransitionType>;

pub type IncomingInvoiceQueryService<R> = SubjectQueryService<IncomingInvoiceTransitionType, R>;

pub type IncomingInvoiceTransitionService<R> =
    StateTransitionService<IncomingInvoiceTransitionType, R>;
