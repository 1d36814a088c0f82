//! Custom assertion helpers for integration tests.

use gb_protocol::ipc::Event;
use gb_protocol::pipeline_models::{StepDurations, StepName};

/// Steps reported as completed, in the order their events arrived.
#[allow(dead_code)]
pub fn completed_steps(events: &[Event]) -> Vec<StepName> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::StepCompleted { step, .. } => Some(*step),
            _ => None,
        })
        .collect()
}

#[allow(dead_code)]
pub fn skipped_steps(events: &[Event]) -> Vec<StepName> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::StepSkipped { step, .. } => Some(*step),
            _ => None,
        })
        .collect()
}

/// Assert that events are in the correct sequential order.
///
/// Checks that:
/// 1. PipelineStarted comes first
/// 2. Exactly one terminal event is sent, and it comes last
/// 3. Every event belongs to the same run
#[allow(dead_code)]
pub fn assert_event_sequence(events: &[Event]) {
    let Some(first) = events.first() else {
        panic!("Event sequence is empty");
    };

    assert!(
        matches!(first, Event::PipelineStarted { .. }),
        "First event should be PipelineStarted, got: {first:?}"
    );

    let terminal = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminal, 1, "Expected exactly one terminal event");
    assert!(
        events.last().is_some_and(Event::is_terminal),
        "Last event should be terminal, got: {:?}",
        events.last()
    );

    let run_id = first.run_id();
    assert!(events.iter().all(|e| e.run_id() == run_id));
}

/// Assert that a duration is within `tolerance` seconds of `expected`.
#[allow(dead_code)]
pub fn assert_secs_near(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "Expected {expected}s (±{tolerance}), got {actual}s"
    );
}

/// Assert the recorded durations match `expected` step by step.
#[allow(dead_code)]
pub fn assert_durations(actual: &StepDurations, expected: &[(StepName, Option<f64>)]) {
    for (step, want) in expected {
        match (actual.get(*step), want) {
            (Some(got), Some(want)) => assert_secs_near(got, *want, 0.05),
            (None, None) => {}
            (got, want) => panic!("{step}: expected {want:?}, got {got:?}"),
        }
    }
}
