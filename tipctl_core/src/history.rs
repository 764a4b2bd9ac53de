//! Rolling window of temperature error samples.

/// Fixed-capacity ring of the last `N` error samples with a running sum.
///
/// `average()` divides by the capacity, not by the number of samples seen, so
/// a fresh history ramps up from zero over the first window.
#[derive(Debug, Clone)]
pub struct ErrorHistory {
    samples: Box<[i32]>,
    sum: i64,
    next: usize,
}

impl ErrorHistory {
    /// Create a zeroed history. A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0; capacity.max(1)].into_boxed_slice(),
            sum: 0,
            next: 0,
        }
    }

    /// Overwrite the oldest sample.
    pub fn update(&mut self, sample: i32) {
        if let Some(slot) = self.samples.get_mut(self.next) {
            self.sum -= i64::from(*slot);
            self.sum += i64::from(sample);
            *slot = sample;
        }
        self.next = (self.next + 1) % self.samples.len();
    }

    /// `sum / capacity`, truncated toward zero.
    pub fn average(&self) -> i32 {
        // the mean of i32 samples always fits in i32
        (self.sum / self.samples.len() as i64) as i32
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn sum(&self) -> i64 {
        self.sum
    }
}
