//! Property test generators for container workloads.
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use teardown::testing::generators::arb_container_ops;
//!
//! proptest! {
//!     #[test]
//!     fn never_panics(ops in arb_container_ops(8, 64)) {
//!         // replay `ops` against a container
//!     }
//! }
//! ```

use proptest::prelude::*;

/// One call against a container, naming resources by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerOp {
    /// `add` the resource with this id
    Add(usize),
    /// `remove` the resource with this id
    Remove(usize),
    /// `contains` for the resource with this id
    Contains(usize),
    /// `clear`
    Clear,
    /// `release_all`
    ReleaseAll,
}

/// Generates a single operation over ids `0..max_id`.
///
/// Adds are weighted higher so generated containers actually fill up.
/// `max_id` must be non-zero.
pub fn arb_container_op(max_id: usize) -> impl Strategy<Value = ContainerOp> {
    prop_oneof![
        4 => (0..max_id).prop_map(ContainerOp::Add),
        2 => (0..max_id).prop_map(ContainerOp::Remove),
        2 => (0..max_id).prop_map(ContainerOp::Contains),
        1 => Just(ContainerOp::Clear),
        1 => Just(ContainerOp::ReleaseAll),
    ]
}

/// Generates up to `max_len` operations over ids `0..max_id`.
pub fn arb_container_ops(max_id: usize, max_len: usize) -> impl Strategy<Value = Vec<ContainerOp>> {
    prop::collection::vec(arb_container_op(max_id), 0..=max_len)
}

/// Generates up to `max_len` operations that never release, so they can be
/// replayed before a single final `release_all`.
pub fn arb_live_ops(max_id: usize, max_len: usize) -> impl Strategy<Value = Vec<ContainerOp>> {
    arb_container_ops(max_id, max_len).prop_map(|ops| {
        ops.into_iter()
            .filter(|op| *op != ContainerOp::ReleaseAll)
            .collect()
    })
}

/// Generates up to `max_len` distinct ids in arbitrary order.
pub fn arb_distinct_ids(max_len: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::hash_set(0..100_000usize, 0..=max_len)
        .prop_map(|ids| ids.into_iter().collect())
}
