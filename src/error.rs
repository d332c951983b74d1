use core::{error::Error, fmt};

/// The global allocator could not provide storage for a chunk of pool nodes.
///
/// Returned by the constructors that allocate eagerly, e.g. [`LocalStack::try_new`] and
/// [`SharedPool::with_config`]. Running out of nodes while pushing is not an error of this kind;
/// `push` hands the value back instead.
///
/// [`LocalStack::try_new`]: crate::LocalStack::try_new
/// [`SharedPool::with_config`]: crate::pool::SharedPool::with_config
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AllocError {
    /// Number of nodes that were requested
    pub nodes: usize,
}

impl Error for AllocError {}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to allocate storage for {} pool nodes", self.nodes)
    }
}

#[cfg(test)]
mod tests {
    use std::string::ToString;

    use super::AllocError;

    #[test]
    fn display() {
        assert_eq!(
            AllocError { nodes: 64 }.to_string(),
            "failed to allocate storage for 64 pool nodes"
        );
    }
}
