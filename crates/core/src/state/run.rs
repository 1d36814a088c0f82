//! Pipeline run state machine.
//!
//! These functions own every transition of a [`PipelineRun`] and emit the
//! matching events. The engine calls them while executing; [`apply_event`]
//! replays the same events onto a copy held elsewhere.

use crate::state::error::RunError;
use chrono::Utc;
use gb_protocol::ipc::Event;
use gb_protocol::pipeline_models::{FailedStage, PipelineBranch, StepDurations, StepName};
use gb_protocol::run_models::{PipelineRun, RunStatus};
use tokio::sync::mpsc::Sender;
use uuid::Uuid;

/// Create a new run with Idle status.
pub fn create_run(workspace_id: &str) -> PipelineRun {
    PipelineRun {
        id: Uuid::new_v4(),
        workspace_id: workspace_id.to_string(),
        status: RunStatus::Idle,
        branch: PipelineBranch::Full,
        current_step: None,
        durations: StepDurations::default(),
        started_at: None,
        finished_at: None,
        logs: Vec::new(),
    }
}

/// Transition the run to Running and emit events.
///
/// Emits `PipelineStarted` followed by a status update.
pub async fn start_run(run: &mut PipelineRun, events_tx: &Sender<Event>) {
    run.status = RunStatus::Running;
    run.started_at = Some(Utc::now());
    let _ = events_tx
        .send(Event::PipelineStarted {
            run_id: run.id,
            workspace_id: run.workspace_id.clone(),
        })
        .await;
    send_status(run, events_tx).await;
}

/// Point the run at `step`.
///
/// # Errors
///
/// Returns [`RunError::StepRegression`] when `step` is at or before the
/// current step; the run is left untouched.
pub async fn enter_step(
    run: &mut PipelineRun,
    events_tx: &Sender<Event>,
    step: StepName,
) -> Result<(), RunError> {
    if let Some(current) = run.current_step {
        if step <= current {
            return Err(RunError::StepRegression {
                current,
                requested: step,
            });
        }
    }

    run.current_step = Some(step);
    send_status(run, events_tx).await;
    let _ = events_tx
        .send(Event::StepStarted {
            run_id: run.id,
            step,
        })
        .await;
    Ok(())
}

/// Record the duration of a finished step.
pub async fn record_step(
    run: &mut PipelineRun,
    events_tx: &Sender<Event>,
    step: StepName,
    duration_secs: f64,
) {
    run.durations.set(step, Some(duration_secs));
    let _ = events_tx
        .send(Event::StepCompleted {
            run_id: run.id,
            step,
            duration_secs,
        })
        .await;
}

/// Mark `step` as skipped because the run took the documents-only branch.
pub async fn skip_step(run: &mut PipelineRun, events_tx: &Sender<Event>, step: StepName) {
    run.branch = PipelineBranch::DocumentsOnly;
    run.durations.set(step, None);
    let _ = events_tx
        .send(Event::StepSkipped {
            run_id: run.id,
            step,
            branch: run.branch,
        })
        .await;
}

/// Mark the run as completed and emit events.
pub async fn complete_run(run: &mut PipelineRun, events_tx: &Sender<Event>, total_secs: f64) {
    run.status = RunStatus::Completed;
    run.finished_at = Some(Utc::now());
    send_status(run, events_tx).await;
    let _ = events_tx
        .send(Event::PipelineCompleted {
            run_id: run.id,
            total_secs,
        })
        .await;
}

/// Mark the run as failed and emit the error event.
pub async fn fail_run(
    run: &mut PipelineRun,
    events_tx: &Sender<Event>,
    failed_stage: FailedStage,
    error: String,
) {
    run.status = RunStatus::Failed;
    run.finished_at = Some(Utc::now());
    send_status(run, events_tx).await;
    let _ = events_tx
        .send(Event::PipelineFailed {
            run_id: run.id,
            failed_stage,
            error,
        })
        .await;
}

/// Append a log message to the run and emit it.
pub async fn log_to_run(run: &mut PipelineRun, events_tx: &Sender<Event>, message: String) {
    run.logs.push(message.clone());
    let _ = events_tx
        .send(Event::RunLogChunk {
            run_id: run.id,
            content: message,
        })
        .await;
}

async fn send_status(run: &PipelineRun, events_tx: &Sender<Event>) {
    let _ = events_tx
        .send(Event::RunStatusUpdate {
            run_id: run.id,
            status: run.status,
            step: run.current_step,
        })
        .await;
}

/// Fold an event into a run snapshot.
///
/// Events for other runs are ignored. Replaying the events of a run onto
/// its initial state reproduces the state the engine holds, timestamps
/// aside.
pub fn apply_event(run: &mut PipelineRun, event: &Event) {
    if event.run_id() != run.id {
        return;
    }

    match event {
        Event::PipelineStarted { .. } => {}
        Event::RunStatusUpdate { status, step, .. } => {
            if *status == RunStatus::Running && run.started_at.is_none() {
                run.started_at = Some(Utc::now());
            }
            run.status = *status;
            if step.is_some() && *step > run.current_step {
                run.current_step = *step;
            }
        }
        Event::StepStarted { step, .. } => {
            if Some(*step) > run.current_step {
                run.current_step = Some(*step);
            }
        }
        Event::StepCompleted {
            step,
            duration_secs,
            ..
        } => run.durations.set(*step, Some(*duration_secs)),
        Event::StepSkipped { step, branch, .. } => {
            run.branch = *branch;
            run.durations.set(*step, None);
        }
        Event::RunLogChunk { content, .. } => run.logs.push(content.clone()),
        Event::PipelineCompleted { .. } => {
            run.status = RunStatus::Completed;
            run.finished_at.get_or_insert_with(Utc::now);
        }
        Event::PipelineFailed { .. } => {
            run.status = RunStatus::Failed;
            run.finished_at.get_or_insert_with(Utc::now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_create_run() {
        let run = create_run("page_1");
        assert_eq!(run.workspace_id, "page_1");
        assert_eq!(run.status, RunStatus::Idle);
        assert_eq!(run.branch, PipelineBranch::Full);
        assert!(run.current_step.is_none());
        assert!(run.durations.is_empty());
        assert!(run.logs.is_empty());
    }

    #[tokio::test]
    async fn test_start_run() {
        let mut run = create_run("page_1");
        let (tx, mut rx) = mpsc::channel(10);

        start_run(&mut run, &tx).await;

        assert_eq!(run.status, RunStatus::Running);
        assert!(run.started_at.is_some());
        assert!(matches!(
            rx.recv().await.unwrap(),
            Event::PipelineStarted { workspace_id, .. } if workspace_id == "page_1"
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            Event::RunStatusUpdate {
                status: RunStatus::Running,
                step: None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_enter_step_only_moves_forward() {
        let mut run = create_run("page_1");
        let (tx, mut rx) = mpsc::channel(10);

        enter_step(&mut run, &tx, StepName::Structuring).await.unwrap();
        assert_eq!(run.current_step, Some(StepName::Structuring));
        assert!(matches!(
            rx.recv().await.unwrap(),
            Event::RunStatusUpdate {
                step: Some(StepName::Structuring),
                ..
            }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            Event::StepStarted {
                step: StepName::Structuring,
                ..
            }
        ));

        // Same step again and an earlier step are both rejected
        for step in [StepName::Structuring, StepName::Crawling] {
            let err = enter_step(&mut run, &tx, step).await.unwrap_err();
            assert!(matches!(
                err,
                RunError::StepRegression {
                    current: StepName::Structuring,
                    ..
                }
            ));
        }
        assert_eq!(run.current_step, Some(StepName::Structuring));
        assert!(rx.try_recv().is_err(), "rejected steps emit nothing");

        // Jumping ahead is fine
        enter_step(&mut run, &tx, StepName::Indexing).await.unwrap();
        assert_eq!(run.current_step, Some(StepName::Indexing));
    }

    #[tokio::test]
    async fn test_record_and_skip() {
        let mut run = create_run("page_1");
        let (tx, mut rx) = mpsc::channel(10);

        skip_step(&mut run, &tx, StepName::Structuring).await;
        record_step(&mut run, &tx, StepName::Document, 10.0).await;

        assert_eq!(run.branch, PipelineBranch::DocumentsOnly);
        assert_eq!(run.durations.document, Some(10.0));
        assert!(matches!(
            rx.recv().await.unwrap(),
            Event::StepSkipped {
                step: StepName::Structuring,
                branch: PipelineBranch::DocumentsOnly,
                ..
            }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            Event::StepCompleted {
                step: StepName::Document,
                duration_secs,
                ..
            } if duration_secs == 10.0
        ));
    }

    #[tokio::test]
    async fn test_complete_run() {
        let mut run = create_run("page_1");
        let (tx, mut rx) = mpsc::channel(10);

        complete_run(&mut run, &tx, 48.0).await;

        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.finished_at.is_some());
        assert!(matches!(
            rx.recv().await.unwrap(),
            Event::RunStatusUpdate {
                status: RunStatus::Completed,
                ..
            }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            Event::PipelineCompleted { total_secs, .. } if total_secs == 48.0
        ));
    }

    #[tokio::test]
    async fn test_fail_run() {
        let mut run = create_run("page_1");
        let (tx, mut rx) = mpsc::channel(10);

        fail_run(
            &mut run,
            &tx,
            FailedStage::Step(StepName::Structuring),
            "timeout".to_string(),
        )
        .await;

        assert_eq!(run.status, RunStatus::Failed);
        let _ = rx.recv().await;
        assert!(matches!(
            rx.recv().await.unwrap(),
            Event::PipelineFailed {
                failed_stage: FailedStage::Step(StepName::Structuring),
                error,
                ..
            } if error == "timeout"
        ));
    }

    #[tokio::test]
    async fn test_log_to_run() {
        let mut run = create_run("page_1");
        let (tx, mut rx) = mpsc::channel(10);

        log_to_run(&mut run, &tx, "Crawl finished".to_string()).await;

        assert_eq!(run.logs, vec!["Crawl finished".to_string()]);
        assert!(matches!(
            rx.recv().await.unwrap(),
            Event::RunLogChunk { content, .. } if content == "Crawl finished"
        ));
    }

    #[tokio::test]
    async fn test_apply_event_replays_transitions() {
        let mut run = create_run("page_1");
        let mut mirror = run.clone();
        let (tx, mut rx) = mpsc::channel(32);

        start_run(&mut run, &tx).await;
        enter_step(&mut run, &tx, StepName::Crawling).await.unwrap();
        skip_step(&mut run, &tx, StepName::Structuring).await;
        enter_step(&mut run, &tx, StepName::Document).await.unwrap();
        record_step(&mut run, &tx, StepName::Document, 4.5).await;
        log_to_run(&mut run, &tx, "done".to_string()).await;
        complete_run(&mut run, &tx, 4.5).await;
        drop(tx);

        while let Some(event) = rx.recv().await {
            apply_event(&mut mirror, &event);
        }

        assert_eq!(mirror.status, run.status);
        assert_eq!(mirror.branch, run.branch);
        assert_eq!(mirror.current_step, run.current_step);
        assert_eq!(mirror.durations, run.durations);
        assert_eq!(mirror.logs, run.logs);
        assert!(mirror.finished_at.is_some());
    }

    #[test]
    fn test_apply_event_ignores_other_runs() {
        let mut run = create_run("page_1");
        apply_event(
            &mut run,
            &Event::RunLogChunk {
                run_id: Uuid::new_v4(),
                content: "elsewhere".to_string(),
            },
        );
        assert!(run.logs.is_empty());
    }
}
