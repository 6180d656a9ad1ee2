//! Benchmarks for `teardown`.
//!
//! The benchmarks live in `benches/`; this crate only exists to host them.
