//! Integration test suite for taskweave.
//!
//! These tests exercise the path from a goal to a finished run: tree
//! decomposition, phase planning and phased execution across workers.
//!
//! # Test Categories
//!
//! - `scheduling`: Phase layering, sibling ordering and cycle detection
//! - `execution`: Failure isolation, timeouts, concurrency and cancellation
//! - `pipeline_e2e`: Decompose, plan and execute a goal end to end
//!
//! # CI Compatibility
//!
//! Workers and generators are scripted in-process and time-dependent tests
//! run on a paused clock, so no test touches the network.

mod fixtures;

mod pipeline_e2e;
mod scheduling;
