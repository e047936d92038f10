//! Tensor wrappers with explicit allocation accounting.
//!
//! Inference tensors are large buffers that must stay bounded in count across
//! repeated invocations, so every tensor created inside a stylization is
//! registered with a [`TensorTracker`] and decrements the live count the
//! moment it is released. The tracker makes leaks observable in tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ndarray::{Array4, ArrayView4};

/// Counts tensors that are currently alive.
///
/// Cloning yields a handle onto the same counter.
#[derive(Clone, Debug, Default)]
pub struct TensorTracker {
    live: Arc<AtomicUsize>,
}

impl TensorTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked tensors that have not been released yet.
    #[must_use]
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn guard(&self) -> AllocGuard {
        self.live.fetch_add(1, Ordering::SeqCst);
        AllocGuard {
            live: Arc::clone(&self.live),
        }
    }
}

#[derive(Debug)]
struct AllocGuard {
    live: Arc<AtomicUsize>,
}

impl Drop for AllocGuard {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A normalized input tensor, `[1, size, size, 3]` with values in `[0, 1]`.
#[derive(Debug)]
pub struct ImageTensor {
    data: Array4<f32>,
    _guard: AllocGuard,
}

impl ImageTensor {
    pub(crate) fn new(data: Array4<f32>, tracker: &TensorTracker) -> Self {
        Self {
            data,
            _guard: tracker.guard(),
        }
    }

    #[must_use]
    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Release the tensor's buffer. Dropping has the same effect; the method
    /// marks the consumption point.
    pub fn release(self) {}
}

/// The predictor's compact style representation, `[1, 1, 1, D]`.
#[derive(Debug)]
pub struct StyleBottleneck {
    data: Array4<f32>,
    _guard: AllocGuard,
}

impl StyleBottleneck {
    pub(crate) fn new(data: Array4<f32>, tracker: &TensorTracker) -> Self {
        Self {
            data,
            _guard: tracker.guard(),
        }
    }

    /// Total number of coefficients, compared against what the transformer
    /// graph was built for.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    pub fn release(self) {}
}

/// The transformer's output, `[1, h, w, 3]` with values in `[0, 1]`.
#[derive(Debug)]
pub struct StylizedTensor {
    data: Array4<f32>,
    _guard: AllocGuard,
}

impl StylizedTensor {
    pub(crate) fn new(data: Array4<f32>, tracker: &TensorTracker) -> Self {
        Self {
            data,
            _guard: tracker.guard(),
        }
    }

    /// Raster height, read from axis 1.
    #[must_use]
    pub fn height(&self) -> usize {
        self.data.shape()[1]
    }

    /// Raster width, read from axis 2.
    #[must_use]
    pub fn width(&self) -> usize {
        self.data.shape()[2]
    }

    #[must_use]
    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn release(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_counts_live_tensors() {
        let tracker = TensorTracker::new();
        assert_eq!(tracker.live(), 0);

        let a = ImageTensor::new(Array4::zeros((1, 4, 4, 3)), &tracker);
        let b = StyleBottleneck::new(Array4::zeros((1, 1, 1, 8)), &tracker);
        assert_eq!(tracker.live(), 2);

        a.release();
        assert_eq!(tracker.live(), 1);
        drop(b);
        assert_eq!(tracker.live(), 0);
    }

    #[test]
    fn stylized_dimensions_follow_shape() {
        let tracker = TensorTracker::new();
        let tensor = StylizedTensor::new(Array4::zeros((1, 8, 4, 3)), &tracker);
        assert_eq!(tensor.height(), 8);
        assert_eq!(tensor.width(), 4);
    }

    #[test]
    fn cloned_trackers_share_the_counter() {
        let tracker = TensorTracker::new();
        let clone = tracker.clone();
        let tensor = ImageTensor::new(Array4::zeros((1, 2, 2, 3)), &clone);
        assert_eq!(tracker.live(), 1);
        tensor.release();
        assert_eq!(tracker.live(), 0);
    }
}
