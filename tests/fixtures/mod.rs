// Shared personas and invoice builders for integration tests
#![allow(dead_code)]

use std::sync::Arc;

use invoice_approval::assignment::{PersonRoles, RoleDirectory, TaskAssigner};
use invoice_approval::invoice::{
    IncomingInvoice, IncomingInvoiceTransitionService, IncomingInvoiceTransitionType, LinkedRecords,
};
use invoice_approval::state::Role;
use invoice_approval::store::InMemoryTransitionRepository;

pub type Repository = InMemoryTransitionRepository<IncomingInvoiceTransitionType>;
pub type Service = IncomingInvoiceTransitionService<Repository>;

/// People working for the GB office, one per approval role
pub fn gb_personas() -> Vec<PersonRoles> {
    vec![
        PersonRoles::new("dylan", vec![Role::OfficeAdministrator]),
        PersonRoles::new("peter", vec![Role::ProjectManager]),
        PersonRoles::new("ashley", vec![Role::AssetManager]),
        PersonRoles::new("colin", vec![Role::CountryDirector]),
        PersonRoles::new("tara", vec![Role::Treasurer]),
    ]
}

pub fn lenient_service() -> (Service, Arc<Repository>) {
    let repository = Arc::new(Repository::default());
    (Service::new(Arc::clone(&repository)), repository)
}

pub fn strict_service(people: Vec<PersonRoles>) -> (Service, Arc<Repository>) {
    let assigner = TaskAssigner::new(Arc::new(RoleDirectory::new(people)), true);
    let repository = Arc::new(Repository::new(assigner));
    (Service::new(Arc::clone(&repository)), repository)
}

pub fn project_invoice(reference: &str) -> IncomingInvoice {
    IncomingInvoice::new(reference).with_project("PRJ-GB-01")
}

pub fn asset_invoice(reference: &str) -> IncomingInvoice {
    IncomingInvoice::new(reference).with_fixed_asset("OXF")
}

/// Apply and complete each step in order
pub async fn advance(
    service: &Service,
    invoice: &mut IncomingInvoice,
    steps: &[IncomingInvoiceTransitionType],
) {
    for step in steps {
        service
            .apply(invoice, *step, &LinkedRecords)
            .await
            .unwrap_or_else(|e| panic!("applying {step} failed: {e}"));
        service
            .complete_transition(invoice)
            .await
            .unwrap_or_else(|e| panic!("completing {step} failed: {e}"));
    }
}
