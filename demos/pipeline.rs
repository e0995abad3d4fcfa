//! # Pipeline Example
//!
//! Shows a job whose executions pass through two segments:
//! - build: one execution at a time
//! - deploy: one execution at a time
//!
//! Five executions are started in quick succession. The first one builds, the
//! newest one always keeps the waiting seat, and the ones in between are aborted
//! without ever building.
//!
//! ## Run
//! ```bash
//! cargo run --example pipeline --features "logging"
//! ```

use std::{sync::Arc, time::Duration};

use segvisor::{
    CompletionHandle, Gate, GateConfig, LogWriter, Ordinal, SegmentSpec, Subscribe, channel,
};
use tokio_util::sync::CancellationToken;

const JOB: &str = "app";

async fn execution(
    gate: Arc<Gate>,
    done: CompletionHandle,
    ordinal: Ordinal,
    work_ms: u64,
) -> anyhow::Result<()> {
    let stages = [
        SegmentSpec::limited("build", 1)?,
        SegmentSpec::limited("deploy", 1)?,
    ];

    for stage in &stages {
        let (signal, mut parked) = channel(format!("{JOB}#{ordinal}"));
        gate.enter(JOB, ordinal, signal, stage).await?;

        if let Err(cause) = parked.wait().await {
            println!("{:>6}[#{ordinal}] stopped before {}: {cause}", "", stage.name());
            break;
        }

        println!("{:>6}[#{ordinal}] {} started", "", stage.name());
        tokio::time::sleep(Duration::from_millis(work_ms)).await;
        println!("{:>6}[#{ordinal}] {} finished", "", stage.name());
    }

    done.completed(JOB, ordinal).await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let gate = Gate::builder(GateConfig::default())
        .with_subscribers(subs)
        .build();

    let token = CancellationToken::new();
    Arc::clone(&gate).run(token.clone());

    println!("Demo: five executions of {JOB:?} started 100ms apart");
    let mut runs = Vec::new();
    for ordinal in 1..=5 {
        let gate = Arc::clone(&gate);
        let done = gate.handle();
        runs.push(tokio::spawn(execution(gate, done, ordinal, 600)));
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    for run in runs {
        run.await??;
    }
    token.cancel();
    gate.shutdown().await;

    println!();
    println!("Done");
    Ok(())
}
