// THEORY:
// Segmenting a photo is the only CPU-heavy step in the engine, and every photo
// is independent. The `SegmentationPool` exploits that: a dispatcher task
// round-robins incoming jobs onto a fixed set of workers, each worker runs the
// segmentation on tokio's blocking pool, and the answer travels back through a
// oneshot channel.
//
// Because each job carries its own reply channel, results are matched to their
// inputs by construction; `segment_batch` simply awaits the replies in input
// order. A failed image fails only its own slot.

use crate::config::SegmenterConfig;
use crate::core_modules::segmenter::{AnalysisResult, Segmenter};
use crate::error::DecodeError;
use futures::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

pub type SegmentReply = oneshot::Sender<Result<AnalysisResult, DecodeError>>;

pub struct SegmentTask {
    pub image_bytes: Vec<u8>,
    pub result_sender: SegmentReply,
}

pub struct SegmentationPool {
    task_sender: mpsc::UnboundedSender<SegmentTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl SegmentationPool {
    /// Spawns the dispatcher and `worker_count` workers on the current runtime.
    pub fn new(config: SegmenterConfig, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<SegmentTask>();
        let mut workers = Vec::with_capacity(worker_count + 1);

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<SegmentTask>())
            .unzip();

        workers.push(tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                // A closed worker drops the task, which the caller sees as an aborted reply.
                let _ = worker_senders[worker_idx].send(task);
                worker_idx = (worker_idx + 1) % worker_count;
            }
        }));

        for (id, mut worker_receiver) in worker_receivers.into_iter().enumerate() {
            let segmenter = Segmenter::new(config);
            workers.push(tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    let bytes = task.image_bytes;
                    let result =
                        tokio::task::spawn_blocking(move || segmenter.segment_bytes(&bytes))
                            .await
                            .unwrap_or_else(|e| Err(DecodeError::Aborted(e.to_string())));
                    debug!(worker = id, ok = result.is_ok(), "segmentation task finished");
                    let _ = task.result_sender.send(result);
                }
            }));
        }

        Self { task_sender, workers }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len() - 1
    }

    /// Segments one image on the pool.
    pub async fn segment(&self, image_bytes: Vec<u8>) -> Result<AnalysisResult, DecodeError> {
        let (result_sender, result_receiver) = oneshot::channel();
        self.task_sender
            .send(SegmentTask {
                image_bytes,
                result_sender,
            })
            .map_err(|_| DecodeError::Aborted("segmentation pool is shut down".into()))?;

        result_receiver
            .await
            .map_err(|_| DecodeError::Aborted("segmentation worker dropped the task".into()))?
    }

    /// Segments every image concurrently; results are in input order.
    pub async fn segment_batch(
        &self,
        images: Vec<Vec<u8>>,
    ) -> Vec<Result<AnalysisResult, DecodeError>> {
        join_all(images.into_iter().map(|bytes| self.segment(bytes))).await
    }

    /// Stops accepting work and waits for queued tasks to finish.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    fn png_with_blobs(blobs: u32) -> Vec<u8> {
        let mut img = GrayImage::from_pixel(160, 40, Luma([220]));
        for i in 0..blobs {
            let x0 = i * 8 + 1;
            for y in 5..10 {
                for x in x0..x0 + 4 {
                    img.put_pixel(x, y, Luma([10]));
                }
            }
        }
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn batch_results_keep_input_order() {
        let pool = SegmentationPool::new(SegmenterConfig::default(), 3);
        assert_eq!(pool.worker_count(), 3);

        let counts: Vec<u32> = vec![5, 0, 12, 1, 19, 3, 7];
        let images = counts.iter().map(|&n| png_with_blobs(n)).collect();
        let results = pool.segment_batch(images).await;

        let got: Vec<usize> = results.into_iter().map(|r| r.unwrap().blob_count).collect();
        let expected: Vec<usize> = counts.iter().map(|&n| n as usize).collect();
        assert_eq!(got, expected);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn one_bad_image_fails_alone() {
        let pool = SegmentationPool::new(SegmenterConfig::default(), 2);
        let results = pool
            .segment_batch(vec![png_with_blobs(2), b"garbage".to_vec(), png_with_blobs(4)])
            .await;

        assert_eq!(results[0].as_ref().unwrap().blob_count, 2);
        assert!(matches!(results[1], Err(DecodeError::Image(_))));
        assert_eq!(results[2].as_ref().unwrap().blob_count, 4);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn pool_matches_direct_segmentation() {
        let pool = SegmentationPool::new(SegmenterConfig::default(), 1);
        let bytes = png_with_blobs(9);
        let direct = Segmenter::default().segment_bytes(&bytes).unwrap();
        assert_eq!(pool.segment(bytes).await.unwrap(), direct);
        pool.shutdown().await;
    }
}
