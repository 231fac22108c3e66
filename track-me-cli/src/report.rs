//! Replay report output (text or JSON lines)

use crate::runner::RunSummary;
use anyhow::Result;
use std::io::Write;
use track_me_engine::DispatchOutcome;

/// Plain-text report: one line per step, then the sink calls
pub fn write_text(out: &mut dyn Write, summary: &RunSummary) -> Result<()> {
    writeln!(out, "Steps")?;
    writeln!(out, "───────────────────────────────────────────────")?;
    for step in &summary.steps {
        let outcomes: Vec<String> = step.outcomes.iter().map(describe_outcome).collect();
        let mut line = format!("{:>3}. {}", step.index, step.description);
        if !outcomes.is_empty() {
            line.push_str(&format!(" -> {}", outcomes.join(", ")));
        }
        if step.prevent_default {
            line.push_str(" [navigation suppressed]");
        }
        writeln!(out, "{}", line)?;
    }

    writeln!(out, "\nSink calls ({})", summary.calls.len())?;
    writeln!(out, "───────────────────────────────────────────────")?;
    for call in &summary.calls {
        writeln!(
            out,
            "  {} | category: {} | action: {} | label: {}",
            call.provider, call.event.category, call.event.action, call.event.label
        )?;
    }

    if !summary.pending.is_empty() {
        writeln!(out, "\nStill waiting for: {}", summary.pending.join(", "))?;
    }
    Ok(())
}

/// One JSON object per sink call
pub fn write_json(out: &mut dyn Write, summary: &RunSummary) -> Result<()> {
    for call in &summary.calls {
        writeln!(out, "{}", serde_json::to_string(call)?)?;
    }
    Ok(())
}

fn describe_outcome(outcome: &DispatchOutcome) -> String {
    match outcome {
        DispatchOutcome::Dispatched(event) => format!("sent ({})", event),
        DispatchOutcome::Armed(event) => format!("waiting for '{}'", event),
        DispatchOutcome::Dropped(reason) => format!("dropped ({:?})", reason),
        DispatchOutcome::Ignored => "ignored".to_string(),
    }
}
