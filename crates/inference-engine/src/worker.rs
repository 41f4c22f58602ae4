//! Single-owner inference worker
//!
//! For runtimes whose forward pass must not run concurrently: one thread
//! owns the model and drains a bounded queue of requests in arrival order.

use std::sync::Arc;
use std::thread::JoinHandle;

use ndarray::Array4;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::model::Model;
use crate::{InferenceError, ModelLoadError};

struct Job {
    batch: Array4<f32>,
    reply: oneshot::Sender<Result<Vec<f32>, InferenceError>>,
}

/// Serializes forward passes through a dedicated thread
pub struct InferenceWorker {
    sender: Option<mpsc::Sender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl InferenceWorker {
    /// Start the worker thread with a queue of `queue_depth` pending requests
    pub fn spawn(model: Arc<dyn Model>, queue_depth: usize) -> Result<Self, ModelLoadError> {
        let (sender, mut receiver) = mpsc::channel::<Job>(queue_depth.max(1));
        info!(
            "Starting serialized inference worker for {} (queue depth {})",
            model.name(),
            queue_depth.max(1)
        );

        let handle = std::thread::Builder::new()
            .name("inference-worker".to_string())
            .spawn(move || {
                while let Some(job) = receiver.blocking_recv() {
                    // Caller gave up before its turn; skip the forward pass
                    if job.reply.is_closed() {
                        debug!("Dropping abandoned inference request");
                        continue;
                    }
                    let result = model.forward(job.batch);
                    if job.reply.send(result).is_err() {
                        debug!("Inference result discarded, caller went away");
                    }
                }
                info!("Inference worker stopped");
            })
            .map_err(|e| ModelLoadError::Worker(e.to_string()))?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Queue a forward pass and wait for its result
    pub async fn submit(&self, batch: Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let sender = self.sender.as_ref().ok_or(InferenceError::WorkerStopped)?;
        let (reply, response) = oneshot::channel();

        sender
            .send(Job { batch, reply })
            .await
            .map_err(|_| InferenceError::WorkerStopped)?;

        response.await.map_err(|_| InferenceError::WorkerStopped)?
    }

    /// Close the queue and wait for in-flight work to finish
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Inference worker panicked");
            }
        }
    }
}

impl Drop for InferenceWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingModel {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl Model for CountingModel {
        fn forward(&self, _batch: Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(5));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![0.25, 0.75])
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_calls_never_overlap() {
        let model = Arc::new(CountingModel {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        let worker = Arc::new(InferenceWorker::spawn(model.clone(), 4).unwrap());

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let worker = worker.clone();
            tasks.push(tokio::spawn(async move {
                worker.submit(Array4::zeros((1, 2, 2, 3))).await
            }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), vec![0.25, 0.75]);
        }

        assert_eq!(model.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_joins_thread() {
        let model = Arc::new(CountingModel {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        let worker = InferenceWorker::spawn(model, 1).unwrap();
        assert!(worker.submit(Array4::zeros((1, 1, 1, 3))).await.is_ok());
        worker.shutdown();
    }
}
