//! CLI output formatting.
//!
//! Every `format_*` function is pure and returns display lines, so the exact
//! output is unit tested; the `print_*` wrappers only write to stdout.
//!
//! # Output Format
//!
//! ## Single crop (`--verbose`)
//!
//! ```text
//! decode    640x480
//! rotate    693x554
//! crop      300x300
//! resample  200x200
//! mask      200x200
//! encode    png, 41233 bytes
//! ```
//!
//! ## Batch
//!
//! ```text
//! Cropping 3 images
//!     ok    team/bob.webp → team/bob.png (18211 bytes)
//!     FAIL  broken.jpg [INVALID_IMAGE] Cannot decode image: ...
//! 2 written, 1 failed
//! ```

use crate::batch::{BatchEvent, BatchReport, FileOutcome};
use crate::dispatch::MethodResponse;
use crate::pipeline::PipelineEvent;
use std::path::Path;

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

// ============================================================================
// Pipeline events
// ============================================================================

/// Format one stage event. Start events are silent; the finish line carries
/// the buffer size that stage produced.
pub fn format_pipeline_event(event: &PipelineEvent) -> Option<String> {
    match event {
        PipelineEvent::StageStarted { .. } => None,
        PipelineEvent::StageFinished {
            stage,
            width,
            height,
        } => Some(format!("{:<9} {}x{}", stage.label(), width, height)),
        PipelineEvent::Encoded { format, bytes } => {
            Some(format!("{:<9} {}, {} bytes", "encode", format, bytes))
        }
    }
}

// ============================================================================
// Batch
// ============================================================================

/// Format a batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent, input_root: &Path, output_root: &Path) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => {
            let noun = if *total == 1 { "image" } else { "images" };
            vec![format!("Cropping {} {}", total, noun)]
        }
        BatchEvent::FileDone(FileOutcome::Written {
            source,
            output,
            bytes,
        }) => vec![format!(
            "    ok    {} \u{2192} {} ({} bytes)",
            display_relative(source, input_root),
            display_relative(output, output_root),
            bytes
        )],
        BatchEvent::FileDone(FileOutcome::Failed {
            source,
            code,
            message,
        }) => vec![format!(
            "    FAIL  {} [{}] {}",
            display_relative(source, input_root),
            code,
            message
        )],
    }
}

/// One-line batch summary.
pub fn format_batch_summary(report: &BatchReport) -> String {
    format!("{} written, {} failed", report.written(), report.failed())
}

// ============================================================================
// Method responses
// ============================================================================

/// JSON rendering of a non-success response, for the `call` command.
///
/// Success carries raw bytes and is written to a file instead, so it is
/// summarised here by size only.
pub fn format_response(response: &MethodResponse) -> serde_json::Value {
    match response {
        MethodResponse::Success(bytes) => serde_json::json!({
            "status": "success",
            "bytes": bytes.len(),
        }),
        MethodResponse::Error { code, message } => serde_json::json!({
            "status": "error",
            "code": code.as_str(),
            "message": message,
        }),
        MethodResponse::NotImplemented { method } => serde_json::json!({
            "status": "notImplemented",
            "method": method,
        }),
    }
}

/// Print a response as pretty JSON to stdout.
pub fn print_response(response: &MethodResponse) {
    let value = format_response(response);
    match serde_json::to_string_pretty(&value) {
        Ok(json) => println!("{}", json),
        Err(_) => println!("{}", value),
    }
}
