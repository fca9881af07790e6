// ABOUTME: Sealed supertrait for the runtime capability traits.
// ABOUTME: Only runtimes defined in this crate may implement them.

/// Implemented by the crate's own runtimes only, so capability traits can
/// grow methods without breaking downstream code.
pub trait Sealed {}
