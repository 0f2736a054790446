use crate::job::{run_isolated, Job};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Spawn `worker_count` tasks pulling from the shared receiver. The receiver
/// is locked only for the duration of a single `recv()` call, so workers do
/// not serialize on job execution, only on dequeue.
pub fn spawn_workers(
    worker_count: usize,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
) -> Vec<tokio::task::JoinHandle<()>> {
    (0..worker_count)
        .map(|_| {
            let receiver = receiver.clone();
            tokio::spawn(async move {
                loop {
                    let job = {
                        let mut guard = receiver.lock().await;
                        guard.recv().await
                    };
                    match job {
                        Some(job) => run_isolated(&job).await,
                        None => break,
                    }
                }
            })
        })
        .collect()
}
