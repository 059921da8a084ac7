// THEORY:
// The `parallel_pipeline` module runs many frames through one shared
// `DetectionPipeline` at once. Frames are independent (the detector keeps no
// state between them), so there is nothing to reorder or reconcile: each task
// carries its own mask and gets its own reply channel.
//
// A dispatcher task hands incoming frames to a fixed set of workers in
// round-robin order. Every worker holds an `Arc` to the same immutable
// pipeline.

use crate::core_modules::bounding_box::BoundingBox;
use crate::error::{Error, Result};
use crate::pipeline::{DetectionPipeline, PipelineConfig};
use futures::future::try_join_all;
use image::GrayImage;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

/// The detected boxes for one submitted frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBoxes {
    /// Submission index, starting at 0.
    pub frame_id: u64,
    pub boxes: Vec<BoundingBox>,
    /// Time spent inside the detector for this frame.
    pub elapsed: Duration,
}

pub struct FrameTask {
    pub frame_id: u64,
    pub mask: GrayImage,
    pub result_sender: oneshot::Sender<FrameBoxes>,
}

pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<FrameTask>,
    dispatcher: tokio::task::JoinHandle<()>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns the dispatcher and `worker_count` workers (at least one) on the
    /// current Tokio runtime.
    pub fn new(pipeline: Arc<DetectionPipeline>, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<FrameTask>();

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<FrameTask>())
            .unzip();

        let dispatcher = tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                // A closed worker drops the task, and with it the reply sender,
                // so the submitter sees the failure.
                let _ = worker_senders[worker_idx].send(task);
                worker_idx = (worker_idx + 1) % worker_count;
            }
        });

        let workers = worker_receivers
            .into_iter()
            .enumerate()
            .map(|(worker_id, mut worker_receiver)| {
                let pipeline = Arc::clone(&pipeline);
                tokio::spawn(async move {
                    while let Some(task) = worker_receiver.recv().await {
                        let started = Instant::now();
                        let boxes = pipeline.detect(&task.mask);
                        let elapsed = started.elapsed();
                        trace!(worker_id, frame_id = task.frame_id, ?elapsed, "frame processed");

                        let _ = task.result_sender.send(FrameBoxes {
                            frame_id: task.frame_id,
                            boxes,
                            elapsed,
                        });
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        Self {
            task_sender,
            dispatcher,
            workers,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub async fn submit(&self, frame_id: u64, mask: GrayImage) -> Result<FrameBoxes> {
        let (result_sender, result_receiver) = oneshot::channel();

        let task = FrameTask {
            frame_id,
            mask,
            result_sender,
        };

        self.task_sender
            .send(task)
            .map_err(|_| Error::WorkerPool("failed to send task to worker pool"))?;

        result_receiver
            .await
            .map_err(|_| Error::WorkerPool("failed to receive result from worker"))
    }

    /// Closes the task queue and waits for the dispatcher and workers to drain.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        let _ = self.dispatcher.await;
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

pub struct ParallelPipeline {
    worker_pool: WorkerPool,
    frame_counter: AtomicU64,
}

impl ParallelPipeline {
    /// Builds the detector and its worker pool. Must be called from within a
    /// Tokio runtime. `workers == None` uses one worker per CPU.
    pub fn new(config: PipelineConfig, workers: Option<usize>) -> Result<Self> {
        let pipeline = Arc::new(DetectionPipeline::new(config)?);
        let worker_count = workers.unwrap_or_else(num_cpus::get);
        debug!(worker_count, "starting detection worker pool");

        Ok(Self {
            worker_pool: WorkerPool::new(pipeline, worker_count),
            frame_counter: AtomicU64::new(0),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_pool.worker_count()
    }

    /// Detects boxes in one mask. Frame ids follow submission order.
    pub async fn process_frame(&self, mask: GrayImage) -> Result<FrameBoxes> {
        let frame_id = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        self.worker_pool.submit(frame_id, mask).await
    }

    /// Detects boxes in every mask concurrently. Results come back in input order.
    pub async fn process_batch<I>(&self, masks: I) -> Result<Vec<FrameBoxes>>
    where
        I: IntoIterator<Item = GrayImage>,
    {
        let pending: Vec<_> = masks
            .into_iter()
            .map(|mask| {
                let frame_id = self.frame_counter.fetch_add(1, Ordering::Relaxed);
                self.worker_pool.submit(frame_id, mask)
            })
            .collect();
        try_join_all(pending).await
    }

    pub async fn shutdown(self) {
        self.worker_pool.shutdown().await;
    }
}
