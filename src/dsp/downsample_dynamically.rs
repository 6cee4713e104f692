use crossbeam_channel::{bounded, Receiver, TrySendError};

use super::downsample::FrameAverager;
use super::{recv_or_cancel, send_or_cancel, spawn_stage};
use crate::error::PipelineError;
use crate::math::Sample;
use crate::pipeline::CancellationToken;

/// Averages frames for as long as the output is blocked.
///
/// Every input frame is folded into a running average and offered to the
/// output without blocking. An accepted offer starts a new window; a refused
/// one keeps accumulating, so the reduction rate follows downstream demand
/// and nothing received is lost, only merged.
pub fn downsample_dynamically<T: Sample>(
    cancel: &CancellationToken,
    input: Receiver<Vec<T>>,
    frame_size: usize,
) -> Result<Receiver<Vec<T>>, PipelineError> {
    if frame_size == 0 {
        return Err(PipelineError::InvalidFrameSize(frame_size));
    }

    let (output, receiver) = bounded(1);
    let cancel = cancel.clone();

    spawn_stage("downsample_dynamically", move || {
        let mut averager = FrameAverager::new(frame_size);

        while let Some(frame) = recv_or_cancel(&input, &cancel) {
            averager.fold(&frame);

            let count = averager.count();
            match output.try_send(averager.take()) {
                Ok(()) => {
                    if count > 1 {
                        log::trace!("downsample_dynamically: merged {} frames", count);
                    }
                }
                Err(TrySendError::Full(pending)) => averager.restore(pending, count),
                Err(TrySendError::Disconnected(_)) => return,
            }
        }

        // Input closed: hand over what is still pending. Cancellation discards it.
        if !cancel.is_cancelled() && !averager.is_empty() {
            send_or_cancel(&output, averager.take(), &cancel);
        }
    })?;

    Ok(receiver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Cancellation;

    #[test]
    fn ready_consumer_sees_every_frame() {
        let cancellation = Cancellation::new();
        let (tx, rx) = bounded(0);
        let output = downsample_dynamically(&cancellation.token(), rx, 2).unwrap();

        for k in 0..5 {
            let frame = vec![k as f64, -(k as f64)];
            tx.send(frame.clone()).unwrap();
            assert_eq!(output.recv().unwrap(), frame);
        }
        drop(tx);
        assert!(output.recv().is_err());
    }

    #[test]
    fn blocked_consumer_gets_mean_of_merged_frames() {
        let cancellation = Cancellation::new();
        let (tx, rx) = bounded(0);
        let output = downsample_dynamically(&cancellation.token(), rx, 1).unwrap();

        // Rendezvous input: each send returns once the previous frame has
        // been fully handled. The first frame fills the output slot.
        tx.send(vec![1.0f64]).unwrap();
        tx.send(vec![2.0]).unwrap();
        tx.send(vec![4.0]).unwrap();
        tx.send(vec![9.0]).unwrap();

        assert_eq!(output.recv().unwrap(), vec![1.0]);
        drop(tx);
        assert_eq!(output.recv().unwrap(), vec![5.0]);
        assert!(output.recv().is_err());
    }

    #[test]
    fn conserves_mass_across_windows() {
        let cancellation = Cancellation::new();
        let (tx, rx) = bounded(0);
        let output = downsample_dynamically(&cancellation.token(), rx, 2).unwrap();

        let inputs: Vec<Vec<f64>> = vec![
            vec![3.0, 1.0],
            vec![5.0, 2.0],
            vec![7.0, 4.0],
            vec![11.0, 8.0],
            vec![13.0, 16.0],
            vec![17.0, 32.0],
        ];

        for frame in &inputs {
            tx.send(frame.clone()).unwrap();
        }
        drop(tx);
        let delivered: Vec<Vec<f64>> = output.iter().collect();

        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0], inputs[0]);
        assert!((delivered[1][0] - 10.6).abs() < 1e-9);
        assert!((delivered[1][1] - 12.4).abs() < 1e-9);

        for i in 0..2 {
            let total: f64 = inputs.iter().map(|frame| frame[i]).sum();
            let weighted = delivered[0][i] + 5.0 * delivered[1][i];
            assert!((weighted - total).abs() < 1e-9);
        }
    }

    #[test]
    fn integer_frames_merge_past_the_type_range() {
        let cancellation = Cancellation::new();
        let (tx, rx) = bounded(0);
        let output = downsample_dynamically(&cancellation.token(), rx, 2).unwrap();

        for _ in 0..300 {
            tx.send(vec![1u8, 250]).unwrap();
        }
        drop(tx);
        let delivered: Vec<Vec<u8>> = output.iter().collect();
        assert_eq!(delivered, vec![vec![1, 250], vec![1, 250]]);

        let (tx, rx) = bounded(0);
        let output = downsample_dynamically(&cancellation.token(), rx, 2).unwrap();
        for _ in 0..40_000 {
            tx.send(vec![-3i16, i16::MAX]).unwrap();
        }
        drop(tx);
        let delivered: Vec<Vec<i16>> = output.iter().collect();
        assert_eq!(delivered, vec![vec![-3, i16::MAX], vec![-3, i16::MAX]]);
    }

    #[test]
    fn cancel_discards_pending_average() {
        let cancellation = Cancellation::new();
        let (tx, rx) = bounded(0);
        let output = downsample_dynamically(&cancellation.token(), rx, 1).unwrap();

        tx.send(vec![1.0f64]).unwrap();
        tx.send(vec![2.0]).unwrap();
        tx.send(vec![3.0]).unwrap();
        cancellation.cancel();

        assert_eq!(output.recv().unwrap(), vec![1.0]);
        assert!(output.recv().is_err());
    }
}
