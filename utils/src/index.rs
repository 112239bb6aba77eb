/// A possibly invalid unsigned index.
///
/// The maximum `usize` integer represents an invalid index, which makes this type as compact as a
/// plain `usize` in storage. It is used for mappings where some entries have no image, such as
/// the map from all degrees of freedom to the free ones.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Index(usize);

impl Index {
    /// Invalid index instance.
    pub const INVALID: Index = Index(usize::MAX);

    /// Create a valid index. The bounds check is done in debug builds only.
    #[inline]
    pub fn new(i: usize) -> Index {
        debug_assert_ne!(i, usize::MAX);
        Index(i)
    }

    /// Return true if stored index is valid and false otherwise.
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    /// Convert this `Index` into `Option<usize>`.
    #[inline]
    pub fn into_option(self) -> Option<usize> {
        if self.is_valid() {
            Some(self.0)
        } else {
            None
        }
    }
}
