//! Integration tests for `teardown`
//!
//! This crate contains tests that drive containers and components from many
//! threads at once and check the release-once contract end to end, using the
//! fixtures from `teardown::testing`.

// This is a test-only crate
#![cfg(test)]
