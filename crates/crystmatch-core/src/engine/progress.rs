use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Delivers progress events to an optional callback and carries the
/// cooperative stop flag shared with long-running searches.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
    stop: Option<&'a AtomicBool>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
            stop: None,
        }
    }

    pub fn with_stop_flag(mut self, stop: &'a AtomicBool) -> Self {
        self.stop = Some(stop);
        self
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    pub fn stop_flag(&self) -> Option<&'a AtomicBool> {
        self.stop
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn callback_receives_events_in_order() {
        let seen = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            seen.lock().unwrap().push(format!("{event:?}"));
        }));
        reporter.report(Progress::TaskStart { total_steps: 2 });
        reporter.report(Progress::TaskIncrement);
        drop(reporter);
        let seen = seen.into_inner().unwrap();
        assert_eq!(seen, vec!["TaskStart { total_steps: 2 }", "TaskIncrement"]);
    }

    #[test]
    fn stop_flag_is_observed() {
        let flag = AtomicBool::new(false);
        let reporter = ProgressReporter::new().with_stop_flag(&flag);
        assert!(!reporter.stop_requested());
        flag.store(true, Ordering::Relaxed);
        assert!(reporter.stop_requested());
        assert!(!ProgressReporter::new().stop_requested());
    }
}
