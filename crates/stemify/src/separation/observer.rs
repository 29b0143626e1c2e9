//! Closure-based progress observer

use stemify_core::ProgressObserver;

type StartFn = Box<dyn Fn() + Send + Sync>;
type ProgressFn = Box<dyn Fn(f32) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&str) + Send + Sync>;

/// Adapts plain closures to [`ProgressObserver`]
///
/// Unset callbacks are ignored.
///
/// ```ignore
/// let observer: Arc<dyn ProgressObserver> = Arc::new(
///     CallbackObserver::new().on_progress(|p| println!("{:.0}%", p * 100.0)),
/// );
/// ```
#[derive(Default)]
pub struct CallbackObserver {
    start: Option<StartFn>,
    progress: Option<ProgressFn>,
    finish: Option<StartFn>,
    error: Option<ErrorFn>,
}

impl CallbackObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.start = Some(Box::new(f));
        self
    }

    pub fn on_progress(mut self, f: impl Fn(f32) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn on_finish(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.finish = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }
}

impl ProgressObserver for CallbackObserver {
    fn on_processing_start(&self) {
        if let Some(f) = &self.start {
            f();
        }
    }

    fn on_progress_update(&self, progress: f32) {
        if let Some(f) = &self.progress {
            f(progress);
        }
    }

    fn on_processing_finish(&self) {
        if let Some(f) = &self.finish {
            f();
        }
    }

    fn on_processing_error(&self, message: &str) {
        if let Some(f) = &self.error {
            f(message);
        }
    }
}

impl std::fmt::Debug for CallbackObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackObserver")
            .field("start", &self.start.is_some())
            .field("progress", &self.progress.is_some())
            .field("finish", &self.finish.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}
