//! Shared node parameters.
//!
//! A [`Param`] is a clonable handle to a cache-line aligned atomic `f64`.
//! Nodes read it once per block on the render thread; callbacks and control
//! threads may write it at any time.

use atomic_float::AtomicF64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[derive(Debug)]
#[repr(align(64))]
struct Cell {
    value: AtomicF64,
}

/// Handle to a lock-free parameter value.
#[derive(Debug, Clone)]
pub struct Param {
    cell: Arc<Cell>,
}

impl Param {
    pub fn new(value: f64) -> Self {
        Self {
            cell: Arc::new(Cell {
                value: AtomicF64::new(value),
            }),
        }
    }

    #[inline]
    pub fn get(&self) -> f64 {
        self.cell.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: f64) {
        self.cell.value.store(value, Ordering::Release);
    }

    #[inline]
    pub fn swap(&self, value: f64) -> f64 {
        self.cell.value.swap(value, Ordering::AcqRel)
    }

    /// Apply `f` atomically and return the new value.
    pub fn update(&self, mut f: impl FnMut(f64) -> f64) -> f64 {
        let mut current = self.get();
        loop {
            let next = f(current);
            match self.cell.value.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    /// True when both handles point at the same cell.
    pub fn shares(&self, other: &Param) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl Default for Param {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_value() {
        let a = Param::new(1.0);
        let b = a.clone();
        b.set(2.5);
        assert_eq!(a.get(), 2.5);
        assert!(a.shares(&b));
        assert!(!a.shares(&Param::new(2.5)));
    }

    #[test]
    fn test_update() {
        let p = Param::new(3.0);
        assert_eq!(p.update(|v| v * 2.0), 6.0);
        assert_eq!(p.swap(1.0), 6.0);
        assert_eq!(p.get(), 1.0);
    }

    #[test]
    fn test_cross_thread_write() {
        let p = Param::new(0.0);
        let writer = p.clone();
        std::thread::spawn(move || writer.set(440.0))
            .join()
            .unwrap();
        assert_eq!(p.get(), 440.0);
    }
}
