use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use crossbeam_channel::{Sender, TrySendError};
use image::RgbImage;
use parking_lot::Mutex;

use super::types::{Matte, SegmentationModel};

/// Runs a segmentation model on its own thread.
///
/// Frames go in through a bounded(1) channel: while the model is busy,
/// newer frames are dropped rather than queued, so a delivered matte
/// always corresponds to a recent frame (at most one inference of lag).
/// Results land in a latest-matte mailbox that the compositor reads every
/// cycle; a slow or stalled model simply leaves the previous matte in
/// place. This is the latest-wins staleness policy, made explicit.
pub struct SegmentationWorker {
    frame_tx: Option<Sender<RgbImage>>,
    latest: Arc<Mutex<Option<Matte>>>,
    handle: Option<JoinHandle<()>>,
}

impl SegmentationWorker {
    /// Move the model onto a named worker thread and start serving frames.
    pub fn spawn(mut model: Box<dyn SegmentationModel>) -> Result<Self> {
        let latest: Arc<Mutex<Option<Matte>>> = Arc::new(Mutex::new(None));
        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<RgbImage>(1);

        let mailbox = Arc::clone(&latest);
        let handle = std::thread::Builder::new()
            .name("segmentation".to_string())
            .spawn(move || {
                let (net_width, net_height) = model.input_size();
                tracing::info!(
                    "Segmentation worker started ({}x{} network)",
                    net_width,
                    net_height
                );
                while let Ok(frame) = frame_rx.recv() {
                    match model.segment(&frame) {
                        Ok(matte) => {
                            *mailbox.lock() = Some(matte);
                        }
                        Err(e) => {
                            tracing::warn!("Segmentation failed: {e:#}");
                        }
                    }
                }
                tracing::info!("Segmentation worker stopped");
            })
            .context("Failed to spawn segmentation worker")?;

        Ok(Self {
            frame_tx: Some(frame_tx),
            latest,
            handle: Some(handle),
        })
    }

    /// Offer a frame to the model.
    ///
    /// Returns false when the worker is still busy with the previous frame
    /// and this one was dropped, or the worker is gone.
    pub fn submit(&self, frame: RgbImage) -> bool {
        let Some(tx) = &self.frame_tx else {
            return false;
        };
        match tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::debug!("Segmentation busy, dropping frame");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!("Segmentation worker channel disconnected");
                false
            }
        }
    }

    /// Most recently delivered matte, if any has arrived yet.
    pub fn latest(&self) -> Option<Matte> {
        self.latest.lock().clone()
    }
}

impl Drop for SegmentationWorker {
    fn drop(&mut self) {
        // Closing the channel ends the worker's recv loop.
        self.frame_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Segmentation worker panicked during shutdown");
            }
        }
    }
}
