//! `lyta-probe <snapshot.json | ->`
//!
//! Evaluates the navigation described by a snapshot and prints the decision as
//! JSON. Exits 0 when allowed and 2 when denied.

use std::io::Read;
use std::process::ExitCode;

use anyhow::Context;

use lyta_infra::Snapshot;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    lyta_observability::init();

    let source = std::env::args()
        .nth(1)
        .context("usage: lyta-probe <snapshot.json | ->")?;

    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read snapshot from stdin")?;
        buf
    } else {
        std::fs::read_to_string(&source).with_context(|| format!("failed to read {source}"))?
    };

    let snapshot = Snapshot::from_json(&raw).context("invalid snapshot")?;
    let report = snapshot.evaluate().await?;

    tracing::info!(
        host = %report.host,
        path = %report.path,
        allowed = report.decision.allowed,
        "probe evaluated"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(if report.decision.allowed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}
