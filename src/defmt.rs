//! Defmt implementations for the stacks and pools

use defmt::Formatter;

#[cfg(has_dwcas)]
use crate::{SharedPool, SharedStack};
use crate::{LocalPool, LocalStack};

impl<T> defmt::Format for LocalStack<T> {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(
            fmt,
            "LocalStack {{ len: {=usize}, pool: {} }}",
            self.len(),
            self.pool()
        )
    }
}

impl<T> defmt::Format for LocalPool<T> {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(
            fmt,
            "LocalPool {{ capacity: {=usize}, config: {} }}",
            self.capacity(),
            self.config()
        )
    }
}

#[cfg(has_dwcas)]
impl<T> defmt::Format for SharedStack<T> {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(
            fmt,
            "SharedStack {{ len: {=usize}, version: {=usize}, pool: {} }}",
            self.len(),
            self.version(),
            self.pool()
        )
    }
}

#[cfg(has_dwcas)]
impl<T> defmt::Format for SharedPool<T> {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(
            fmt,
            "SharedPool {{ capacity: {=usize}, config: {} }}",
            self.capacity(),
            self.config()
        )
    }
}
