//! Progress callbacks for the long-running per-date stages.

use chrono::NaiveDate;

/// Per-date progress for backfill and sync.
pub trait PipelineProgress: Send {
    /// Called once before a stage iterates its dates.
    fn on_stage_start(&self, stage: &str, total: usize);

    /// Called after each date; `error` carries the per-date failure, if any.
    fn on_item(&self, stage: &str, date: NaiveDate, index: usize, total: usize, error: Option<&str>);

    fn on_stage_complete(&self, stage: &str, succeeded: usize, failed: usize);
}

/// Prints `[i/n]` lines to stdout.
pub struct StdoutProgress;

impl PipelineProgress for StdoutProgress {
    fn on_stage_start(&self, stage: &str, total: usize) {
        if total > 0 {
            println!("{stage}: {total} date(s) to process");
        }
    }

    fn on_item(&self, stage: &str, date: NaiveDate, index: usize, total: usize, error: Option<&str>) {
        match error {
            None => println!("[{}/{}] {stage} {date} ok", index + 1, total),
            Some(e) => println!("[{}/{}] {stage} {date} FAILED: {e}", index + 1, total),
        }
    }

    fn on_stage_complete(&self, stage: &str, succeeded: usize, failed: usize) {
        if succeeded + failed > 0 {
            println!("{stage} complete: {succeeded} succeeded, {failed} failed");
        }
    }
}

/// Discards all progress events.
pub struct NoProgress;

impl PipelineProgress for NoProgress {
    fn on_stage_start(&self, _stage: &str, _total: usize) {}
    fn on_item(&self, _: &str, _: NaiveDate, _: usize, _: usize, _: Option<&str>) {}
    fn on_stage_complete(&self, _stage: &str, _succeeded: usize, _failed: usize) {}
}
