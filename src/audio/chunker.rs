use super::frame::Frame;

/// Re-slices arbitrarily sized sample blocks into fixed-size frames.
#[derive(Debug)]
pub struct FrameChunker {
    frame_size: usize,
    pending: Vec<f64>,
}

impl FrameChunker {
    pub fn new(frame_size: usize) -> Self {
        Self {
            frame_size,
            pending: Vec::with_capacity(frame_size),
        }
    }

    /// Appends samples and returns every frame that became complete.
    pub fn push(&mut self, samples: impl IntoIterator<Item = f64>) -> Vec<Frame> {
        let mut frames = Vec::new();
        for sample in samples {
            self.pending.push(sample);
            if self.pending.len() == self.frame_size {
                let next = Vec::with_capacity(self.frame_size);
                frames.push(std::mem::replace(&mut self.pending, next));
            }
        }
        frames
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Zero-pads and returns the trailing partial frame, if any.
    pub fn finish(&mut self) -> Option<Frame> {
        if self.pending.is_empty() {
            return None;
        }
        let mut last = std::mem::take(&mut self.pending);
        last.resize(self.frame_size, 0.0);
        Some(last)
    }
}

#[cfg(test)]
mod tests {
    use super::FrameChunker;

    #[test]
    fn slices_across_blocks() {
        let mut chunker = FrameChunker::new(4);
        assert!(chunker.push([0.0, 1.0, 2.0]).is_empty());
        let frames = chunker.push([3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(frames, vec![vec![0.0, 1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0, 7.0]]);
        assert_eq!(chunker.pending_len(), 1);
        assert_eq!(chunker.finish(), Some(vec![8.0, 0.0, 0.0, 0.0]));
        assert_eq!(chunker.finish(), None);
    }
}
