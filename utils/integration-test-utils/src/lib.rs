/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Shared test support for gateway integration tests: an in-memory recording
//! transport, collecting handlers and fixture builders.

pub mod fixtures;
mod recording_handlers;
mod recording_transport;

pub use recording_handlers::{RecordingHandler, RecordingListener};
pub use recording_transport::{RecordedSend, RecordingTransport};

use std::sync::Once;

static TRACING: Once = Once::new();

/// Installs a `fmt` subscriber once per test binary, filtered by `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
