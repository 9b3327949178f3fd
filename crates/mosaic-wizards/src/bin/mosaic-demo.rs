use anyhow::{bail, Context, Result};
use mosaic_core::{ModuleId, ModuleWizard, MosaicConfig, Resolution, WorkflowSession};
use mosaic_monitoring::{init_logging, log_events, MonitoringConfig};
use mosaic_wizards::catalog::{build_session, modules};
use mosaic_wizards::testing::{fake_providers, FakeSignatureProvider};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = MosaicConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    init_logging(&MonitoringConfig::from(&config)).context("Failed to initialize logging")?;

    let mut session =
        build_session(fake_providers(), &config).context("Failed to build workflow session")?;

    let contract = fill(
        &mut session,
        modules::CONTRACT,
        &[
            ("propertyAddress", json!("Москва, ул. Тверская, 7, кв. 12")),
            ("propertyType", json!("apartment")),
            ("propertyRent", json!(65000)),
            ("landlordName", json!("Сидоров Сергей Петрович")),
            ("landlordPassport", json!("4501 234567")),
            ("tenantName", json!("Иванов Иван Иванович")),
            ("tenantPassport", json!("1234 567890")),
            ("tenantPhone", json!("+7 900 123-45-67")),
            ("startDate", json!("2024-02-01")),
            ("endDate", json!("2025-01-31")),
            ("deposit", json!(65000)),
            ("paymentDay", json!(5)),
            ("utilitiesIncluded", json!(false)),
            ("agreement", json!(true)),
        ],
    )
    .await?;
    let contract_number = contract["contractNumber"].as_str().unwrap_or_default().to_string();

    let mut signing = session.open(&ModuleId::from(modules::SIGNATURE))?;
    for (name, value) in [
        ("documentId", json!(contract_number)),
        ("documentTitle", json!("Договор аренды жилого помещения")),
        ("signerId", json!("tenant-1")),
        ("signerName", json!("Иванов Иван Иванович")),
        ("channel", json!("sms")),
    ] {
        signing.set_field(name, value);
    }
    expect_state(
        session.run_to_completion(&mut signing).await?,
        modules::SIGNATURE,
        |r| matches!(r, Resolution::AwaitingConfirmation),
    )?;
    match session
        .confirm(&mut signing, json!(FakeSignatureProvider::DEFAULT_CODE))
        .await?
    {
        Some(resolution) => expect_state(resolution, modules::SIGNATURE, |r| {
            matches!(r, Resolution::Completed(_))
        })?,
        None => bail!("Verification code was not accepted: {:?}", signing.errors()),
    }
    log_events(&signing.take_events());

    fill(
        &mut session,
        modules::SCORING,
        &[
            ("fullName", json!("Иванов Иван")),
            ("passport", json!("1234 567890")),
            ("birthDate", json!("1990-01-01")),
            ("consent", json!(true)),
        ],
    )
    .await?;

    let result = session.finalize();
    info!(total_cost = result.total_cost, "Demo finished");
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn fill(
    session: &mut WorkflowSession,
    module: &str,
    values: &[(&str, Value)],
) -> Result<Value> {
    let mut wizard: ModuleWizard = session.open(&ModuleId::from(module))?;
    for (name, value) in values {
        wizard.set_field(*name, value.clone());
    }
    let resolution = session
        .run_to_completion(&mut wizard)
        .await
        .with_context(|| format!("Module {} did not validate", module))?;
    log_events(&wizard.take_events());

    match resolution {
        Resolution::Completed(data) => Ok(data),
        other => bail!("Module {} ended with {:?}", module, other),
    }
}

fn expect_state(
    resolution: Resolution,
    module: &str,
    accept: impl Fn(&Resolution) -> bool,
) -> Result<()> {
    if accept(&resolution) {
        Ok(())
    } else {
        bail!("Module {} ended with {:?}", module, resolution)
    }
}
