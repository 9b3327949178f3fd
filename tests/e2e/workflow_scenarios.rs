use mosaic_core::{
    ModuleDescriptor, ModuleGraph, ModuleId, ModuleStatus, Resolution, WizardStatus,
    WorkflowAggregator,
};
use mosaic_e2e_tests::{
    contract_values, fill, session, session_with, signature_values, GatedScoringProvider,
};
use mosaic_wizards::catalog::modules;
use mosaic_wizards::testing::{fake_providers, FakeSignatureProvider};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn contract_wizard_six_steps_to_completion() {
    let mut session = session();
    let mut wizard = session.open(&ModuleId::from(modules::CONTRACT)).unwrap();
    fill(&mut wizard, &contract_values());

    for _ in 0..6 {
        assert!(wizard.next());
    }
    assert_eq!(wizard.status(), WizardStatus::AwaitingAsync);

    let resolution = session.run_stage(&mut wizard).await.unwrap();
    assert!(matches!(resolution, Resolution::Completed(_)));
    assert_eq!(wizard.status(), WizardStatus::Completed);
    for (name, value) in contract_values() {
        assert_eq!(wizard.values().get(name), Some(&value), "field {}", name);
    }
}

#[tokio::test]
async fn scoring_wizard_yields_bounded_score() {
    let mut session = session();
    let mut wizard = session.open(&ModuleId::from(modules::SCORING)).unwrap();
    fill(
        &mut wizard,
        &[
            ("fullName", json!("Иванов Иван")),
            ("passport", json!("1234 567890")),
            ("birthDate", json!("1990-01-01")),
            ("consent", json!(true)),
        ],
    );

    let data = match session.run_to_completion(&mut wizard).await.unwrap() {
        Resolution::Completed(data) => data,
        other => panic!("scoring ended with {:?}", other),
    };
    let score = data["score"].as_u64().unwrap();
    assert!((600..=1000).contains(&score));
    assert!(matches!(data["riskLevel"].as_str(), Some("low" | "medium" | "high")));
    assert_eq!(wizard.status(), WizardStatus::Completed);
}

#[test]
fn module_graph_unlocks_in_dependency_order() {
    let mut graph = ModuleGraph::new(vec![
        ModuleDescriptor::new("A", "A", 100),
        ModuleDescriptor::new("B", "B", 50).depends_on(&["A"]),
        ModuleDescriptor::new("C", "C", 25).depends_on(&["A", "B"]),
    ])
    .unwrap();
    let (a, b, c) = (ModuleId::from("A"), ModuleId::from("B"), ModuleId::from("C"));

    assert_eq!(graph.status_of(&a).unwrap(), ModuleStatus::Available);
    assert_eq!(graph.status_of(&b).unwrap(), ModuleStatus::Locked);
    assert_eq!(graph.status_of(&c).unwrap(), ModuleStatus::Locked);

    graph.complete(&a, json!({})).unwrap();
    assert_eq!(graph.status_of(&b).unwrap(), ModuleStatus::Available);
    assert_eq!(graph.status_of(&c).unwrap(), ModuleStatus::Locked);

    graph.complete(&b, json!({})).unwrap();
    assert_eq!(graph.status_of(&c).unwrap(), ModuleStatus::Available);
}

#[tokio::test]
async fn signature_waits_for_well_formed_code() {
    let mut session = session();
    let mut contract = session.open(&ModuleId::from(modules::CONTRACT)).unwrap();
    fill(&mut contract, &contract_values());
    let number = match session.run_to_completion(&mut contract).await.unwrap() {
        Resolution::Completed(data) => data["contractNumber"].as_str().unwrap().to_string(),
        other => panic!("contract ended with {:?}", other),
    };

    let mut wizard = session.open(&ModuleId::from(modules::SIGNATURE)).unwrap();
    fill(&mut wizard, &signature_values(&number));
    assert_eq!(
        session.run_to_completion(&mut wizard).await.unwrap(),
        Resolution::AwaitingConfirmation
    );

    assert_eq!(session.confirm(&mut wizard, json!("1234")).await.unwrap(), None);
    assert_eq!(wizard.status(), WizardStatus::AwaitingAsync);
    assert!(wizard.awaiting_confirmation());
    assert!(!session
        .aggregator()
        .completed_modules()
        .contains(&ModuleId::from(modules::SIGNATURE)));

    let resolution = session
        .confirm(&mut wizard, json!(FakeSignatureProvider::DEFAULT_CODE))
        .await
        .unwrap();
    assert!(matches!(resolution, Some(Resolution::Completed(_))));
    assert_eq!(wizard.status(), WizardStatus::Completed);
}

#[test]
fn aggregator_counts_repeated_modules_once() {
    let graph = ModuleGraph::new(vec![
        ModuleDescriptor::new("A", "A", 100),
        ModuleDescriptor::new("B", "B", 50),
    ])
    .unwrap();
    let mut aggregator = WorkflowAggregator::new(graph);

    aggregator.record(&"A".into(), json!({})).unwrap();
    aggregator.record(&"B".into(), json!({})).unwrap();
    aggregator.record(&"A".into(), json!({})).unwrap();

    assert_eq!(
        aggregator.completed_modules(),
        &[ModuleId::from("A"), ModuleId::from("B")]
    );
    assert_eq!(aggregator.total_cost(), 150);
}

#[tokio::test]
async fn abort_drops_late_provider_result() {
    let (scoring, release) = GatedScoringProvider::new();
    let mut providers = fake_providers();
    providers.scoring = Arc::new(scoring);
    let mut session = session_with(providers);

    let scoring_id = ModuleId::from(modules::SCORING);
    let mut wizard = session.open(&scoring_id).unwrap();
    fill(
        &mut wizard,
        &[
            ("fullName", json!("Иванов Иван")),
            ("passport", json!("1234 567890")),
            ("birthDate", json!("1990-01-01")),
            ("consent", json!(true)),
        ],
    );
    assert!(wizard.next());
    assert!(wizard.next());
    assert_eq!(wizard.status(), WizardStatus::AwaitingAsync);

    let pending = tokio::spawn(session.dispatch(&mut wizard).unwrap());
    tokio::task::yield_now().await;
    assert!(wizard.abort());

    release.notify_one();
    let outcome = pending.await.unwrap();
    assert_eq!(
        session.settle(&mut wizard, outcome).unwrap(),
        Resolution::Stale
    );

    assert_eq!(wizard.status(), WizardStatus::Aborted);
    assert!(session.aggregator().module_data(&scoring_id).is_none());
    let result = session.finalize();
    assert!(!result.module_data.contains_key(&scoring_id));
    assert_eq!(result.total_cost, 0);
}

#[tokio::test]
async fn full_deal_result() {
    let mut session = session();

    let mut contract = session.open(&ModuleId::from(modules::CONTRACT)).unwrap();
    fill(&mut contract, &contract_values());
    tokio_test::assert_ok!(session.run_to_completion(&mut contract).await);

    let mut signature = session.open(&ModuleId::from(modules::SIGNATURE)).unwrap();
    fill(&mut signature, &signature_values("RC-000001"));
    tokio_test::assert_ok!(session.run_to_completion(&mut signature).await);
    let confirmed = tokio_test::assert_ok!(
        session
            .confirm(&mut signature, json!(FakeSignatureProvider::DEFAULT_CODE))
            .await
    );
    assert!(matches!(confirmed, Some(Resolution::Completed(_))));

    let result = session.finalize();
    assert!(result.is_complete());
    assert_eq!(
        result.completed_modules,
        vec![ModuleId::from(modules::CONTRACT), ModuleId::from(modules::SIGNATURE)]
    );
    assert_eq!(result.total_cost, 1300);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["totalCost"], json!(1300));
    assert_eq!(json["moduleData"]["signature"]["signed"], json!(true));
}
