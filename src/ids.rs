//! Arena index types.
//!
//! The DTS graph is cyclic by nature (concepts are shared across schemas,
//! linkbases, and derived presentation/dimension structures). Rather than
//! modeling that with `Rc`/`RefCell` back-references, every entity lives in
//! a `Vec` owned by its arena and is referenced elsewhere by a small `Copy`
//! index. See DESIGN.md for the rationale.

use std::fmt;

macro_rules! arena_id {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<usize> for $name {
            fn from(v: usize) -> Self {
                $name(v as u32)
            }
        }
    };
}

arena_id!(SchemaId);
arena_id!(ConceptId);
arena_id!(ElementId);
arena_id!(ArcId);
