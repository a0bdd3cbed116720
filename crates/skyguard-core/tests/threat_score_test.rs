//! The threat score is the plain sum of the weights of the checks that fail.

use std::sync::Arc;

use chrono::Utc;
use proptest::prelude::*;
use skyguard_core::{
    Command, CommandPayload, CommandPipeline, CommandSource, MovementParams, SourceType,
    StaticVerifier,
};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn threat_score_is_sum_of_triggered_weights(
        stale in any::<bool>(),
        bad_signature in any::<bool>(),
        bad_parameters in any::<bool>(),
        bad_source in any::<bool>(),
    ) {
        let pipeline = CommandPipeline::default()
            .with_verifier(Arc::new(StaticVerifier(!bad_signature)));

        let altitude = if bad_parameters { 500.0 } else { 50.0 };
        let mut command = Command::new(
            "CMD-PROP",
            "DRONE001",
            CommandPayload::Movement(MovementParams::AltitudeChange { target_altitude_m: altitude }),
            CommandSource::new("op-1", SourceType::User, "USER"),
        )
        .with_signature("signed");
        if stale {
            command = command.with_timestamp(Utc::now().timestamp_millis() - 10_000);
        }
        if bad_source {
            command.source = None;
        }

        let report = runtime().block_on(pipeline.validate(&command)).unwrap();

        let mut expected = 0.0;
        let mut failures = 0;
        for (triggered, weight) in [
            (stale, 0.3),
            (bad_signature, 0.5),
            (bad_parameters, 0.2),
            (bad_source, 0.4),
        ] {
            if triggered {
                expected += weight;
                failures += 1;
            }
        }

        prop_assert!((report.threat_score - expected).abs() < 1e-9);
        prop_assert_eq!(report.errors.len(), failures);
        prop_assert_eq!(report.is_valid(), failures == 0);
    }
}
