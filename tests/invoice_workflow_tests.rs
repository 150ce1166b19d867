// End-to-end approval scenarios through the public API

mod fixtures;

use fixtures::*;
use invoice_approval::errors::WorkflowError;
use invoice_approval::invoice::{
    IncomingInvoiceState::*, IncomingInvoiceTransitionType as T, LinkedRecords,
};
use invoice_approval::state::{Role, StateTransitionType, TransitionRepository, WorkflowSubject};

#[tokio::test]
async fn test_project_invoice_goes_to_project_manager() {
    let (service, repository) = strict_service(gb_personas());
    let mut invoice = project_invoice("INV-A");

    assert!(T::ApproveAsProjectManager.can_apply(&invoice, &LinkedRecords));
    assert!(!T::ApproveAsAssetManager.can_apply(&invoice, &LinkedRecords));

    let transition = service
        .apply(&mut invoice, T::ApproveAsProjectManager, &LinkedRecords)
        .await
        .unwrap();
    assert_eq!(transition.from_state, Some(New));
    assert_eq!(transition.to_state, ApprovedByProjectManager);
    assert_eq!(transition.assigned_role, Some(Role::ProjectManager));

    let task = repository
        .find_task(&transition.task.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(task.assigned_to, Role::ProjectManager);
    assert_eq!(task.person_assigned_to.as_deref(), Some("peter"));
    assert_eq!(task.transition, transition.id);
}

#[tokio::test]
async fn test_asset_manager_approved_invoice_can_be_cancelled_without_task() {
    let (service, repository) = lenient_service();
    let mut invoice = asset_invoice("INV-B");
    advance(&service, &mut invoice, &[T::ApproveAsAssetManager]).await;

    assert_eq!(
        service.query().current_state_of(&invoice).await.unwrap(),
        ApprovedByAssetManager
    );
    assert_eq!(
        service.applicable_transitions(&invoice, &LinkedRecords).await.unwrap(),
        vec![T::ApproveAsCountryDirector, T::Cancel]
    );

    let open_before = repository.open_tasks(None).await.unwrap().len();
    let cancel = service
        .apply(&mut invoice, T::Cancel, &LinkedRecords)
        .await
        .unwrap();
    assert_eq!(cancel.to_state, Cancelled);
    assert_eq!(cancel.assigned_role, None);
    assert_eq!(cancel.task, None);
    assert_eq!(repository.open_tasks(None).await.unwrap().len(), open_before);
}

#[tokio::test]
async fn test_payment_is_assigned_to_treasurer_and_terminal() {
    let (service, _) = strict_service(gb_personas());
    let mut invoice = project_invoice("INV-C");
    advance(
        &service,
        &mut invoice,
        &[T::ApproveAsProjectManager, T::ApproveAsCountryDirector, T::ApproveAsTreasurer],
    )
    .await;
    assert_eq!(
        service.query().current_state_of(&invoice).await.unwrap(),
        ApprovedByTreasurer
    );

    let pay = service
        .apply(&mut invoice, T::Pay, &LinkedRecords)
        .await
        .unwrap();
    assert_eq!(pay.to_state, Paid);
    assert_eq!(pay.assigned_role, Some(Role::Treasurer));

    let treasurer_tasks = service
        .query()
        .open_tasks_for(Some(Role::Treasurer))
        .await
        .unwrap();
    assert_eq!(treasurer_tasks.len(), 1);
    assert_eq!(treasurer_tasks[0].person_assigned_to.as_deref(), Some("tara"));

    service.complete_task(&treasurer_tasks[0].id).await.unwrap();
    assert_eq!(service.query().current_state_of(&invoice).await.unwrap(), Paid);
    for transition_type in T::all() {
        assert!(!service
            .can_apply(&invoice, *transition_type, &LinkedRecords)
            .await
            .unwrap());
    }
}

#[tokio::test]
async fn test_double_pending_leaves_existing_transition_unchanged() {
    let (service, repository) = lenient_service();
    let mut invoice = project_invoice("INV-D");

    let first = service
        .apply(&mut invoice, T::ApproveAsProjectManager, &LinkedRecords)
        .await
        .unwrap();
    let err = service
        .apply(&mut invoice, T::ApproveAsProjectManager, &LinkedRecords)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::TransitionAlreadyPending { .. }));

    let still_pending = service
        .query()
        .current_transition_of(&invoice)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(still_pending, first);
    assert_eq!(
        repository.find_by_subject(&invoice.subject_id()).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_missing_role_holder_fails_cleanly() {
    let people = gb_personas()
        .into_iter()
        .filter(|person| !person.roles.contains(&Role::CountryDirector))
        .collect();
    let (service, repository) = strict_service(people);
    let mut invoice = project_invoice("INV-E");
    advance(&service, &mut invoice, &[T::ApproveAsProjectManager]).await;

    let err = service
        .apply(&mut invoice, T::ApproveAsCountryDirector, &LinkedRecords)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::TaskAssignment { .. }));

    assert!(repository
        .find_by_incomplete(&invoice.subject_id())
        .await
        .unwrap()
        .is_none());
    assert_eq!(
        service.query().current_state_of(&invoice).await.unwrap(),
        ApprovedByProjectManager
    );
    assert_eq!(
        service.query().history_of(&invoice).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_subjects_progress_independently() {
    let (service, _) = lenient_service();
    let mut first = project_invoice("INV-F1");
    let mut second = asset_invoice("INV-F2");

    service
        .apply(&mut first, T::ApproveAsProjectManager, &LinkedRecords)
        .await
        .unwrap();
    service
        .apply(&mut second, T::ApproveAsAssetManager, &LinkedRecords)
        .await
        .unwrap();

    service.complete_transition(&second).await.unwrap();
    assert_eq!(service.query().current_state_of(&first).await.unwrap(), New);
    assert_eq!(
        service.query().current_state_of(&second).await.unwrap(),
        ApprovedByAssetManager
    );
}

#[tokio::test]
async fn test_concurrent_applies_admit_exactly_one() {
    let (service, repository) = lenient_service();
    let invoice = project_invoice("INV-G");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        let mut invoice = invoice.clone();
        handles.push(tokio::spawn(async move {
            service
                .apply(&mut invoice, T::ApproveAsProjectManager, &LinkedRecords)
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert!(matches!(err, WorkflowError::TransitionAlreadyPending { .. })),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(
        repository.find_by_subject(&invoice.subject_id()).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_delete_all_resets_every_subject() {
    let (service, repository) = lenient_service();
    let mut invoice = project_invoice("INV-H");
    advance(&service, &mut invoice, &[T::ApproveAsProjectManager]).await;

    let removed = repository.delete_all().await.unwrap();
    assert_eq!(removed, 2);
    assert_eq!(service.query().current_state_of(&invoice).await.unwrap(), New);
}
