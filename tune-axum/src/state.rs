use std::ops::Deref;
use std::sync::Arc;

/// Router state: the application shared behind an `Arc`.
pub struct TuneAxumState<S>
where
    S: Send + Sync + 'static,
{
    pub app: Arc<S>,
}

impl<S> Clone for TuneAxumState<S>
where
    S: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            app: Arc::clone(&self.app),
        }
    }
}

impl<S> TuneAxumState<S>
where
    S: Send + Sync + 'static,
{
    pub fn new(app: S) -> Self {
        Self { app: Arc::new(app) }
    }

    pub fn from_arc(app: Arc<S>) -> Self {
        Self { app }
    }
}

impl<S> Deref for TuneAxumState<S>
where
    S: Send + Sync + 'static,
{
    type Target = S;

    fn deref(&self) -> &S {
        &self.app
    }
}
