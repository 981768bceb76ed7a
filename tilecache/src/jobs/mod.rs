//! Busy/idle tracking.
//!
//! A provider is busy while it has at least one open job. Each in-flight tile
//! page is one job, keyed by a stable string id. [`JobTracker`] reports only
//! the transitions, so a consumer sees exactly one `Busy` when work starts and
//! one `Idle` when the last job ends.

use std::collections::HashSet;

/// A busy/idle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Busy,
    Idle,
}

/// Set of open job ids.
#[derive(Debug, Default)]
pub struct JobTracker {
    jobs: HashSet<String>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a job. Returns [`Activity::Busy`] on the first open job.
    ///
    /// Opening a job that is already open changes nothing.
    pub fn begin(&mut self, job_id: &str) -> Option<Activity> {
        let was_idle = self.jobs.is_empty();
        if self.jobs.insert(job_id.to_string()) && was_idle {
            Some(Activity::Busy)
        } else {
            None
        }
    }

    /// Close a job. Returns [`Activity::Idle`] when the last open job closes.
    ///
    /// Closing an unknown job changes nothing.
    pub fn end(&mut self, job_id: &str) -> Option<Activity> {
        if self.jobs.remove(job_id) && self.jobs.is_empty() {
            Some(Activity::Idle)
        } else {
            None
        }
    }

    /// Close every job. Returns [`Activity::Idle`] if anything was open.
    pub fn clear(&mut self) -> Option<Activity> {
        if self.jobs.is_empty() {
            return None;
        }
        self.jobs.clear();
        Some(Activity::Idle)
    }

    pub fn is_busy(&self) -> bool {
        !self.jobs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_jobs_emit_one_busy_one_idle() {
        let mut tracker = JobTracker::new();
        let events: Vec<Activity> = [
            tracker.begin("a"),
            tracker.begin("b"),
            tracker.end("a"),
            tracker.end("b"),
        ]
        .into_iter()
        .flatten()
        .collect();

        assert_eq!(events, vec![Activity::Busy, Activity::Idle]);
        assert!(!tracker.is_busy());
    }

    #[test]
    fn test_duplicate_begin_and_unknown_end_are_noops() {
        let mut tracker = JobTracker::new();
        assert_eq!(tracker.begin("a"), Some(Activity::Busy));
        assert_eq!(tracker.begin("a"), None);
        assert_eq!(tracker.len(), 1);

        assert_eq!(tracker.end("zzz"), None);
        assert!(tracker.is_busy());

        assert_eq!(tracker.end("a"), Some(Activity::Idle));
        assert_eq!(tracker.end("a"), None);
    }

    #[test]
    fn test_clear() {
        let mut tracker = JobTracker::new();
        assert_eq!(tracker.clear(), None);
        tracker.begin("a");
        tracker.begin("b");
        assert_eq!(tracker.clear(), Some(Activity::Idle));
        assert!(tracker.is_empty());
    }
}
