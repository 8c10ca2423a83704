//! External ordering hook.
//!
//! A script is an optional user-supplied object that can take over
//! inode ordering entirely. The engine asks `has_order` before
//! delegating; a script without ordering support makes the script
//! policy a user error.

use crate::inode::InodeRef;

/// User-supplied ordering hook.
pub trait OrderScript {
    /// Whether this script implements an ordering.
    fn has_order(&self) -> bool;

    /// Permute `inodes` in place into the desired emission order.
    ///
    /// Only called when [`has_order`](Self::has_order) returned true.
    fn order(&self, inodes: &mut Vec<InodeRef>);
}
