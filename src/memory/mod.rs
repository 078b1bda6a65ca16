//! Arena storage for tree nodes.
//!
//! Nodes are stored densely and addressed by small copyable indices, in the
//! spirit of the entity handling in Cranelift IR.
pub mod slab;

pub use slab::Slab;

/// Key type of an arena slot.
pub trait EntityIndex: Copy + Eq + Default {
    fn new(index: usize) -> Self {
        Self::try_new(index).expect("entity index exceeds its backing type")
    }

    fn try_new(index: usize) -> Option<Self>;
    fn index(self) -> usize;
}

/// Implements [`EntityIndex`] for a newtype around an unsigned integer.
///
/// Based on [`cranelift_entity`'s `entity_impl!`](https://docs.rs/cranelift-entity/0.89.2/cranelift_entity/macro.entity_impl.html)
#[macro_export]
macro_rules! entity_impl {
    ($entity:ident, $backing:ty) => {
        impl $crate::memory::EntityIndex for $entity {
            #[inline(always)]
            fn try_new(ix: usize) -> Option<Self> {
                if ix <= (<$backing>::MAX as usize) || (<$backing>::BITS) > usize::BITS {
                    Some($entity(ix as $backing))
                } else {
                    None
                }
            }

            #[inline(always)]
            fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}
