use crate::allocator::AllocationError;

/// Boxed error returned by surface generators
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure while materializing a surface in [`SurfaceCache::get`](crate::SurfaceCache::get)
///
/// Both variants carry the collaborator's error unchanged.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Generator(BoxError),
}

impl SurfaceError {
    /// Whether the allocator refused the request
    pub fn is_allocation(&self) -> bool {
        matches!(self, SurfaceError::Allocation(_))
    }

    /// The generator's error, if the generator failed
    pub fn generator_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            SurfaceError::Generator(err) => Some(err.as_ref()),
            SurfaceError::Allocation(_) => None,
        }
    }
}
