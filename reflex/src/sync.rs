//! Synchronization primitives for in-process communication.
//!
//! This module provides the queue that carries round outcomes from the
//! round thread to an observer thread.

pub mod event_channel;
