//! Page window for listings

use serde::{Deserialize, Serialize};

/// `[offset, offset + limit)` window over an ordered listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

impl PageRequest {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Zero-based page number with a fixed page size
    pub fn page(number: usize, size: usize) -> Self {
        Self {
            offset: number.saturating_mul(size),
            limit: size,
        }
    }

    /// Exclusive end of the window, clamped to `total`
    pub fn end(&self, total: usize) -> usize {
        self.offset.saturating_add(self.limit).min(total)
    }
}
