use mosaic_core::DomainEvent;
use tracing::{debug, info, warn};

/// Write drained wizard events to the log
///
/// Failures and dropped results are logged as warnings so cancellation
/// races stay visible without surfacing to the user.
pub fn log_events(events: &[Box<dyn DomainEvent>]) {
    for event in events {
        let event_type = event.event_type();
        let instance = event.instance_id();
        match event_type {
            "wizard.stage_failed" | "wizard.stale_result_dropped" => {
                warn!(event_type, instance = %instance, at = %event.timestamp(), detail = ?event, "Wizard event");
            }
            "wizard.started" | "wizard.aborted" | "wizard.stage_succeeded" => {
                info!(event_type, instance = %instance, at = %event.timestamp(), "Wizard event");
            }
            _ => {
                debug!(event_type, instance = %instance, at = %event.timestamp(), detail = ?event, "Wizard event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init_test_tracing;
    use mosaic_core::{StepDefinition, WizardDefinition, WizardController, DefaultStepValidator};
    use std::sync::Arc;

    #[test]
    fn test_logs_controller_events() {
        init_test_tracing();
        let definition = Arc::new(WizardDefinition::new(
            "w",
            "W",
            vec![StepDefinition::new("s", "S").required(&["f"])],
        ));
        let mut ctl = WizardController::new(definition, Arc::new(DefaultStepValidator)).unwrap();
        assert!(!ctl.next());
        assert!(ctl.abort());

        let events = ctl.take_events();
        assert_eq!(events.len(), 3);
        log_events(&events);
    }
}
