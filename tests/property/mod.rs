// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Command sequences are generated, run against a fresh harness with
//! `tokio_test::block_on`, and the resulting log is checked.

mod removal;
mod replay;
