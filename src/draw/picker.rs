//! Source of randomness for the draw, kept behind a trait so tests can run
//! the engine deterministically.

use rand::prelude::*;

/// Uniform choice over a candidate pool.
pub trait DrawPicker: Send + Sync {
    /// Index into a pool of `len` candidates. Callers guarantee `len > 0`.
    fn pick(&self, len: usize) -> usize;
}

/// Production picker: a fresh OS-entropy generator per draw.
pub struct EntropyPicker;

impl DrawPicker for EntropyPicker {
    fn pick(&self, len: usize) -> usize {
        let mut rng = StdRng::from_entropy();
        rng.gen_range(0..len)
    }
}

#[cfg(test)]
pub struct SeededPicker(std::sync::Mutex<StdRng>);

#[cfg(test)]
impl SeededPicker {
    pub fn new(seed: u64) -> Self {
        SeededPicker(std::sync::Mutex::new(StdRng::seed_from_u64(seed)))
    }
}

#[cfg(test)]
impl DrawPicker for SeededPicker {
    fn pick(&self, len: usize) -> usize {
        self.0.lock().unwrap().gen_range(0..len)
    }
}
