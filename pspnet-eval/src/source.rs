//! Sample sources feeding the evaluation driver.
//!
//! A source hands out `(image, label)` pairs one at a time, in a fixed order,
//! and fails with [`EvalError::Exhausted`] once its data is consumed.
//! [`PrefetchSource`] moves loading onto a worker thread and keeps exactly one
//! sample ready ahead of the consumer.

use std::{
    any::Any,
    collections::VecDeque,
    sync::mpsc::{self, Receiver},
    thread,
};

use burn::{data::dataset::Dataset, tensor::TensorData};

use crate::{
    error::{EvalError, EvalResult},
    map::LabelMap,
};

/// One evaluation sample.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Normalized image `[H, W, 3]` in BGR order with the image mean subtracted.
    pub image: TensorData,
    /// Ground-truth labels `[H, W]`.
    pub label: LabelMap,
}

impl Sample {
    pub fn new(image: TensorData, label: LabelMap) -> EvalResult<Self> {
        let shape = image.shape.clone();
        if shape.len() != 3 || shape[2] != 3 || shape[0] != label.height() || shape[1] != label.width()
        {
            return Err(EvalError::shape_mismatch(
                [label.height(), label.width(), 3],
                shape,
            ));
        }
        Ok(Self { image, label })
    }

    /// `[height, width]` of the image and its labels.
    pub const fn dims(&self) -> [usize; 2] {
        self.label.dims()
    }
}

/// Ordered producer of evaluation samples.
pub trait SampleSource {
    /// Next sample in order, or [`EvalError::Exhausted`] once the data is consumed.
    fn next_sample(&mut self) -> EvalResult<Sample>;

    /// Number of samples this source will hand out in total, when known.
    fn len_hint(&self) -> Option<usize> {
        None
    }
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn next_sample(&mut self) -> EvalResult<Sample> {
        (**self).next_sample()
    }

    fn len_hint(&self) -> Option<usize> {
        (**self).len_hint()
    }
}

/// In-memory source over a fixed list of samples.
#[derive(Debug, Default)]
pub struct VecSource {
    samples: VecDeque<Sample>,
    total: usize,
    consumed: usize,
}

impl VecSource {
    pub fn new(samples: Vec<Sample>) -> Self {
        let total = samples.len();
        Self {
            samples: samples.into(),
            total,
            consumed: 0,
        }
    }
}

impl SampleSource for VecSource {
    fn next_sample(&mut self) -> EvalResult<Sample> {
        let sample = self.samples.pop_front().ok_or(EvalError::Exhausted {
            consumed: self.consumed,
        })?;
        self.consumed += 1;
        Ok(sample)
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.total)
    }
}

/// Walks a Burn [`Dataset`] front to back without looping.
pub struct DatasetSource<D> {
    dataset: D,
    position: usize,
}

impl<D: Dataset<Sample>> DatasetSource<D> {
    pub const fn new(dataset: D) -> Self {
        Self {
            dataset,
            position: 0,
        }
    }
}

impl<D: Dataset<Sample>> SampleSource for DatasetSource<D> {
    fn next_sample(&mut self) -> EvalResult<Sample> {
        if self.position >= self.dataset.len() {
            return Err(EvalError::Exhausted {
                consumed: self.position,
            });
        }

        let sample = self.dataset.get(self.position).ok_or_else(|| EvalError::Dataset {
            message: format!("failed to load sample {}", self.position),
        })?;
        self.position += 1;
        Ok(sample)
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.dataset.len())
    }
}

/// Loads samples on a worker thread, one ahead of the consumer.
///
/// The worker stops after handing over the first error, including exhaustion.
/// Order is that of the inner source.
pub struct PrefetchSource {
    rx: Option<Receiver<EvalResult<Sample>>>,
    handle: Option<thread::JoinHandle<()>>,
    len_hint: Option<usize>,
    consumed: usize,
}

impl PrefetchSource {
    pub fn spawn<S>(mut inner: S) -> Self
    where
        S: SampleSource + Send + 'static,
    {
        let len_hint = inner.len_hint();
        // Rendezvous channel: the worker holds at most the one sample it is handing over.
        let (tx, rx) = mpsc::sync_channel(0);
        let handle = thread::spawn(move || loop {
            let next = inner.next_sample();
            let stop = next.is_err();
            if tx.send(next).is_err() || stop {
                return;
            }
        });

        Self {
            rx: Some(rx),
            handle: Some(handle),
            len_hint,
            consumed: 0,
        }
    }

    /// Join the finished worker, turning a panic into a dataset error.
    fn join_worker(&mut self) -> EvalResult<()> {
        self.rx = None;
        match self.handle.take().map(thread::JoinHandle::join) {
            Some(Err(payload)) => Err(EvalError::Dataset {
                message: format!("prefetch worker panicked: {}", panic_message(&*payload)),
            }),
            _ => Ok(()),
        }
    }
}

impl SampleSource for PrefetchSource {
    fn next_sample(&mut self) -> EvalResult<Sample> {
        let received = match self.rx.as_ref() {
            Some(rx) => rx.recv().ok(),
            None => None,
        };

        match received {
            Some(Ok(sample)) => {
                self.consumed += 1;
                Ok(sample)
            }
            Some(Err(err)) => Err(err),
            // The channel closed: either the worker already reported its last
            // result or it died without one.
            None => {
                self.join_worker()?;
                Err(EvalError::Exhausted {
                    consumed: self.consumed,
                })
            }
        }
    }

    fn len_hint(&self) -> Option<usize> {
        self.len_hint
    }
}

impl Drop for PrefetchSource {
    fn drop(&mut self) {
        // Closing the channel first unblocks a worker waiting to send.
        if let Err(err) = self.join_worker() {
            tracing::error!(consumed = self.consumed, error = %err, "prefetch worker failed");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    pub(crate) fn constant_sample(height: usize, width: usize, label: u32) -> Sample {
        Sample::new(
            TensorData::new(vec![0.0f32; height * width * 3], [height, width, 3]),
            LabelMap::filled(height, width, label),
        )
        .unwrap()
    }

    fn labels_of(source: &mut impl SampleSource, count: usize) -> Vec<u32> {
        (0..count)
            .map(|_| source.next_sample().unwrap().label.as_slice()[0])
            .collect()
    }

    struct InMemoryDataset(Vec<Sample>);

    impl Dataset<Sample> for InMemoryDataset {
        fn get(&self, index: usize) -> Option<Sample> {
            self.0.get(index).cloned()
        }

        fn len(&self) -> usize {
            self.0.len()
        }
    }

    #[test]
    fn test_sample_rejects_mismatched_label() {
        let result = Sample::new(
            TensorData::new(vec![0.0f32; 2 * 3 * 3], [2, 3, 3]),
            LabelMap::filled(3, 2, 0),
        );
        assert!(matches!(result, Err(EvalError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_vec_source_order_and_exhaustion() {
        let mut source = VecSource::new((0..3).map(|i| constant_sample(2, 2, i)).collect());

        assert_eq!(source.len_hint(), Some(3));
        assert_eq!(labels_of(&mut source, 3), vec![0, 1, 2]);
        assert!(matches!(
            source.next_sample(),
            Err(EvalError::Exhausted { consumed: 3 })
        ));
    }

    #[test]
    fn test_dataset_source_does_not_loop() {
        let dataset = InMemoryDataset((0..2).map(|i| constant_sample(1, 1, i)).collect());
        let mut source = DatasetSource::new(dataset);

        assert_eq!(source.len_hint(), Some(2));
        assert_eq!(labels_of(&mut source, 2), vec![0, 1]);
        assert!(matches!(
            source.next_sample(),
            Err(EvalError::Exhausted { consumed: 2 })
        ));
    }

    #[test]
    fn test_prefetch_preserves_order() {
        let inner = VecSource::new((0..5).map(|i| constant_sample(2, 3, i)).collect());
        let mut source = PrefetchSource::spawn(inner);

        assert_eq!(source.len_hint(), Some(5));
        assert_eq!(labels_of(&mut source, 5), vec![0, 1, 2, 3, 4]);
        assert!(matches!(
            source.next_sample(),
            Err(EvalError::Exhausted { .. })
        ));
        // Asking again after the worker is gone still reports exhaustion.
        assert!(matches!(
            source.next_sample(),
            Err(EvalError::Exhausted { consumed: 5 })
        ));
    }

    /// Counts how often the wrapped source is asked for a sample.
    struct CountingSource {
        inner: VecSource,
        pulls: Arc<AtomicUsize>,
    }

    impl SampleSource for CountingSource {
        fn next_sample(&mut self) -> EvalResult<Sample> {
            self.pulls.fetch_add(1, Ordering::SeqCst);
            self.inner.next_sample()
        }
    }

    struct PanickingSource;

    impl SampleSource for PanickingSource {
        fn next_sample(&mut self) -> EvalResult<Sample> {
            panic!("corrupt image header");
        }
    }

    #[test]
    fn test_prefetch_stays_one_sample_ahead() {
        let pulls = Arc::new(AtomicUsize::new(0));
        let inner = CountingSource {
            inner: VecSource::new((0..5).map(|i| constant_sample(1, 1, i)).collect()),
            pulls: Arc::clone(&pulls),
        };
        let mut source = PrefetchSource::spawn(inner);

        thread::sleep(Duration::from_millis(200));
        assert!(pulls.load(Ordering::SeqCst) <= 1);

        assert_eq!(labels_of(&mut source, 1), vec![0]);
        thread::sleep(Duration::from_millis(200));
        assert!(pulls.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_prefetch_worker_panic_is_a_dataset_error() {
        let mut source = PrefetchSource::spawn(PanickingSource);

        match source.next_sample() {
            Err(EvalError::Dataset { message }) => {
                assert!(message.contains("corrupt image header"));
            }
            other => panic!("Expected Dataset error, got {:?}", other.map(|s| s.dims())),
        }
        assert!(matches!(
            source.next_sample(),
            Err(EvalError::Exhausted { consumed: 0 })
        ));
    }

    #[test]
    fn test_prefetch_drop_before_drain_does_not_hang() {
        let inner = VecSource::new((0..10).map(|i| constant_sample(1, 1, i)).collect());
        let mut source = PrefetchSource::spawn(inner);

        assert_eq!(labels_of(&mut source, 1), vec![0]);
        drop(source);
    }
}
