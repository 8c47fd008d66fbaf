/// Two-channel sample container with a write cursor.
///
/// Capacity is fixed at construction. The scheduler fills one of these at a
/// time and hands it to the sink by value once it is full.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackBuffer {
    left: Vec<f32>,
    right: Vec<f32>,
    position: usize,
}

impl PlaybackBuffer {
    /// A silent buffer holding `capacity` frames per channel.
    pub fn new(capacity: usize) -> Self {
        Self {
            left: vec![0.0; capacity],
            right: vec![0.0; capacity],
            position: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.left.len()
    }

    /// Frames written so far (`0..=capacity`).
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.capacity() - self.position
    }

    pub fn is_full(&self) -> bool {
        self.position == self.capacity()
    }

    pub fn left(&self) -> &[f32] {
        &self.left
    }

    pub fn right(&self) -> &[f32] {
        &self.right
    }

    /// Borrow the next `frames` unwritten slots of both channels and advance
    /// the cursor past them.
    ///
    /// Panics if `frames` exceeds [`remaining`](Self::remaining); callers size
    /// their writes from `remaining()` first.
    pub(crate) fn claim(&mut self, frames: usize) -> (&mut [f32], &mut [f32]) {
        assert!(frames <= self.remaining(), "claim past end of playback buffer");
        let range = self.position..self.position + frames;
        self.position += frames;
        (&mut self.left[range.clone()], &mut self.right[range])
    }

    /// Iterate `(left, right)` pairs of the written part.
    pub fn frames(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.left[..self.position]
            .iter()
            .copied()
            .zip(self.right[..self.position].iter().copied())
    }
}
