/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
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

//! Notification correlation engine.
//!
//! [`CorrelationTable`] is a generic keyed rendezvous: whichever of producer
//! and waiter arrives first creates the carrier, the other completes it. The
//! map lock is never held while a waiter is suspended, so waits on different
//! keys are independent. Unclaimed values are discarded by a periodic sweep
//! once they outlive the table TTL.
//!
//! [`NotificationCorrelator`] specializes the table for one notification kind
//! and adds the push consumption model. The gateway runs one correlator per
//! kind, each with its own sweep thread.
//!
//! ```
//! use gateway_core::correlation::{CorrelationTable, DeliveryOutcome};
//! use std::time::Duration;
//!
//! let table: CorrelationTable<String, u32> =
//!     CorrelationTable::new("example", Duration::from_secs(300));
//! assert_eq!(table.deliver("m1".to_string(), 7), DeliveryOutcome::Stored);
//! assert!(table.is_filled(&"m1".to_string()));
//! ```

pub(crate) mod notification_correlator;
pub(crate) mod sweeper;
pub(crate) mod table;

pub use notification_correlator::{NotificationCorrelator, NotificationListener};
pub use table::{AwaitError, CorrelationTable, DeliveryOutcome, ExpiryCheck};
