use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{error, info, info_span, Instrument};

pub type BoxFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// A unit of deferred work: a name (for logging) and an execute step.
pub struct Job {
    name: String,
    run: Arc<dyn Fn() -> BoxFuture + Send + Sync>,
}

impl Job {
    pub fn new<F, Fut>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            run: Arc::new(move || Box::pin(run())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Run `job` wrapped in structured begin/end logging and panic isolation.
/// A panic inside the job body is caught and logged; it never propagates.
pub async fn run_isolated(job: &Job) {
    let span = info_span!("job", name = job.name());
    async move {
        info!("job started");
        let result = CatchUnwind::new((job.run)()).await;
        match result {
            Ok(Ok(())) => info!("job finished"),
            Ok(Err(e)) => error!(error = %e, "job failed"),
            Err(panic) => {
                let message = panic_message(&panic);
                error!(panic = %message, "job panicked");
            }
        }
    }
    .instrument(span)
    .await;
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// `catch_unwind` for an already-boxed-and-pinned future. `Pin<Box<F>>` is
/// `Unpin` regardless of `F`, so this needs no unsafe pin projection: the
/// field can be reached through a plain `&mut self` once we're inside `poll`.
struct CatchUnwind {
    inner: BoxFuture,
}

impl CatchUnwind {
    fn new(inner: BoxFuture) -> Self {
        Self { inner }
    }
}

impl Future for CatchUnwind {
    type Output = Result<anyhow::Result<()>, Box<dyn std::any::Any + Send>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let inner = &mut this.inner;
        std::panic::catch_unwind(AssertUnwindSafe(|| inner.as_mut().poll(cx))).map_or_else(
            |payload| Poll::Ready(Err(payload)),
            |poll| poll.map(Ok),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ok_job_runs_to_completion() {
        let job = Job::new("ok", || async { Ok(()) });
        run_isolated(&job).await;
    }

    #[tokio::test]
    async fn failing_job_is_logged_not_propagated() {
        let job = Job::new("fails", || async { Err(anyhow::anyhow!("nope")) });
        run_isolated(&job).await;
    }

    #[tokio::test]
    async fn panicking_job_is_caught() {
        let job = Job::new("panics", || async { panic!("kaboom") });
        run_isolated(&job).await;
    }
}
