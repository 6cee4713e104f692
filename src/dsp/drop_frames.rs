use crossbeam_channel::{bounded, Receiver, Select, Sender, TryRecvError, TrySendError};

use super::{recv_or_cancel, send_or_cancel, spawn_stage};
use crate::error::PipelineError;
use crate::pipeline::CancellationToken;

/// Matches the flow rate of the input to the pace of the consumer by
/// dropping frames.
///
/// Only the most recently received frame is ever held. While the output is
/// blocked, newer input frames replace it; once the output has room, the
/// held frame is sent. Frames are never merged.
pub fn drop_frames_dynamically<T: Send + 'static>(
    cancel: &CancellationToken,
    input: Receiver<T>,
) -> Result<Receiver<T>, PipelineError> {
    let (output, receiver) = bounded(1);
    let cancel = cancel.clone();

    spawn_stage("drop_frames", move || {
        let mut held: Option<T> = None;
        let mut dropped: u64 = 0;
        let mut input_closed = false;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let frame = match held.take() {
                Some(frame) => frame,
                None => match recv_or_cancel(&input, &cancel) {
                    Some(frame) => frame,
                    None => break,
                },
            };

            // Whatever is already queued upstream supersedes the held frame.
            let mut latest = frame;
            loop {
                match input.try_recv() {
                    Ok(newer) => {
                        latest = newer;
                        dropped += 1;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        input_closed = true;
                        break;
                    }
                }
            }

            if input_closed {
                send_or_cancel(&output, latest, &cancel);
                break;
            }

            match output.try_send(latest) {
                Ok(()) => {}
                Err(TrySendError::Full(frame)) => {
                    held = Some(frame);
                    if !wait_for_progress(&input, &output, &cancel) {
                        break;
                    }
                }
                Err(TrySendError::Disconnected(_)) => break,
            }
        }

        if dropped > 0 {
            log::debug!("drop_frames: dropped {} frames", dropped);
        }
    })?;

    Ok(receiver)
}

/// Parks until the output has room, a newer input frame is available, or
/// either side disconnects. Returns `false` on cancellation.
fn wait_for_progress<T>(
    input: &Receiver<T>,
    output: &Sender<T>,
    cancel: &CancellationToken,
) -> bool {
    let mut select = Select::new();
    let cancel_index = select.recv(cancel.receiver());
    select.recv(input);
    select.send(output);
    select.ready() != cancel_index
}
