//! Hand-off from a real-time capture callback into the frame queue.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::{Arc, Mutex, PoisonError};

use super::chunker::FrameChunker;
use super::frame::Frame;

type SharedSender = Arc<Mutex<Option<Sender<Frame>>>>;

/// Producer half, owned by the capture callback. Never blocks.
#[derive(Debug)]
pub struct FrameSink {
    chunker: FrameChunker,
    output: SharedSender,
    dropped: u64,
}

/// Closes the queue behind a [`FrameSink`] from another callback, e.g. on a
/// device error.
#[derive(Clone, Debug)]
pub struct SinkCloser {
    output: SharedSender,
}

pub fn frame_sink(frame_size: usize, capacity: usize) -> (FrameSink, SinkCloser, Receiver<Frame>) {
    let (sender, receiver) = bounded(capacity);
    let output = Arc::new(Mutex::new(Some(sender)));
    let sink = FrameSink {
        chunker: FrameChunker::new(frame_size),
        output: Arc::clone(&output),
        dropped: 0,
    };
    (sink, SinkCloser { output }, receiver)
}

impl FrameSink {
    /// Chunks `samples` and offers every complete frame. Frames that find the
    /// queue full are lost. Returns `false` once the queue is closed.
    pub fn push(&mut self, samples: impl IntoIterator<Item = f64>) -> bool {
        let frames = self.chunker.push(samples);

        // Held only while closing.
        let Ok(guard) = self.output.try_lock() else {
            return false;
        };
        let Some(output) = guard.as_ref() else {
            return false;
        };

        for frame in frames {
            match output.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped += 1;
                    if self.dropped.is_power_of_two() {
                        log::debug!("Capture queue full, {} frames lost so far", self.dropped);
                    }
                }
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }
        true
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl SinkCloser {
    /// Drops the sender. Returns `true` only for the call that closed the queue.
    pub fn close(&self) -> bool {
        let mut output = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        output.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwards_complete_frames() {
        let (mut sink, _closer, frames) = frame_sink(4, 2);
        assert!(sink.push([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        assert_eq!(frames.try_recv().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
        assert!(frames.try_recv().is_err());
    }

    #[test]
    fn full_queue_loses_frames() {
        let (mut sink, _closer, frames) = frame_sink(2, 1);
        assert!(sink.push([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        assert_eq!(sink.dropped(), 2);
        assert_eq!(frames.try_recv().unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn closing_ends_the_stream_once() {
        let (mut sink, closer, frames) = frame_sink(2, 4);
        assert!(sink.push([1.0, 2.0]));

        assert!(closer.close());
        assert!(!closer.clone().close());
        assert!(!sink.push([3.0, 4.0]));

        assert_eq!(frames.recv().unwrap(), vec![1.0, 2.0]);
        assert!(frames.recv().is_err());
    }
}
