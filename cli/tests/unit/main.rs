//! Unit tests for vch-debug
//!
//! These tests use mocked ports and run fast without external I/O.

mod debug_workflow;
mod govc_platform;
mod helpers;
