//! The three harness steps

use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use hyperlog_core::{AppendOutcome, PartialKeypair, SigningKey};
use hyperlog_storage::Session;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Seed of the identity every step opens the log with
pub const TEST_SEED: [u8; 32] = [
    0x9b, 0x2f, 0x41, 0x0c, 0x7e, 0xd3, 0x55, 0x18, 0xa6, 0x3e, 0xf0, 0x62, 0x1d, 0x8c, 0x47, 0xb9,
    0x04, 0xe1, 0x73, 0x2a, 0xcd, 0x96, 0x5f, 0x30, 0x8b, 0x11, 0xfa, 0x6d, 0xc2, 0x49, 0x07, 0xe5,
];

/// The fixed writer identity of the harness
pub fn test_key_pair() -> PartialKeypair {
    PartialKeypair::from_signing_key(SigningKey::from_bytes(&TEST_SEED))
}

/// One harness step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Create, close and reopen the empty log
    One,
    /// Append the first batch
    Two,
    /// Verify the first batch and append more
    Three,
}

impl Step {
    /// All steps in execution order
    pub const ALL: [Step; 3] = [Step::One, Step::Two, Step::Three];

    /// 1-based step number
    pub fn number(self) -> u8 {
        match self {
            Step::One => 1,
            Step::Two => 2,
            Step::Three => 3,
        }
    }
}

/// Totals reported after a step, printed as one JSON line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: u8,
    pub length: u64,
    pub byte_length: u64,
}

/// Run `step` against the log under `root`
#[instrument(skip_all, fields(step = step.number(), root = %root.display()))]
pub async fn run_step(step: Step, root: &Path) -> Result<StepOutcome> {
    let totals = match step {
        Step::One => step1(root).await,
        Step::Two => step2(root).await,
        Step::Three => step3(root).await,
    }
    .with_context(|| format!("step {} failed", step.number()))?;

    info!(
        length = totals.length,
        byte_length = totals.byte_length,
        "Step complete"
    );
    Ok(StepOutcome {
        step: step.number(),
        length: totals.length,
        byte_length: totals.byte_length,
    })
}

/// Run every step in order against the log under `root`
pub async fn run_all(root: &Path) -> Result<Vec<StepOutcome>> {
    let mut outcomes = Vec::with_capacity(Step::ALL.len());
    for step in Step::ALL {
        outcomes.push(run_step(step, root).await?);
    }
    Ok(outcomes)
}

async fn step1(root: &Path) -> Result<AppendOutcome> {
    let session = open(root).await?;
    expect_totals(session.info().await?.into(), 0, 0, "new log")?;
    session.close().await?;

    let session = open(root).await?;
    let totals: AppendOutcome = session.info().await?.into();
    expect_totals(totals, 0, 0, "reopened log")?;
    session.close().await?;
    Ok(totals)
}

async fn step2(root: &Path) -> Result<AppendOutcome> {
    let session = open(root).await?;
    expect_totals(session.info().await?.into(), 0, 0, "log before append")?;

    let outcome = session.append(&["Hello", "World"]).await?;
    expect_totals(outcome, 2, 10, "append")?;
    session.close().await?;
    Ok(outcome)
}

async fn step3(root: &Path) -> Result<AppendOutcome> {
    let session = open(root).await?;
    expect_totals(session.info().await?.into(), 2, 10, "reopened log")?;
    expect_entries(&session, 0..2, &["Hello", "World"]).await?;

    let outcome = session.append_one("first").await?;
    expect_totals(outcome, 3, 15, "single append")?;
    let outcome = session.append(&["second", "third"]).await?;
    expect_totals(outcome, 5, 26, "batch append")?;
    expect_entries(&session, 2..5, &["first", "second", "third"]).await?;

    session.close().await?;
    Ok(outcome)
}

async fn open(root: &Path) -> Result<Session> {
    Session::open_in(root, test_key_pair())
        .await
        .with_context(|| format!("failed to open log under {}", root.display()))
}

fn expect_totals(actual: AppendOutcome, length: u64, byte_length: u64, what: &str) -> Result<()> {
    ensure!(
        actual == AppendOutcome::new(length, byte_length),
        "{what}: expected {length} entries / {byte_length} bytes, found {} / {}",
        actual.length,
        actual.byte_length
    );
    Ok(())
}

async fn expect_entries(session: &Session, range: Range<u64>, expected: &[&str]) -> Result<()> {
    let entries = session.get_batch(range.clone()).await?;
    for (index, (entry, want)) in range.zip(entries.iter().zip(expected)) {
        ensure!(
            &entry[..] == want.as_bytes(),
            "entry {index}: expected {want:?}, found {:?}",
            String::from_utf8_lossy(entry)
        );
    }
    Ok(())
}
