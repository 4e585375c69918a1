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

//! Value objects exchanged between the gateway and its callers.
//!
//! ```
//! use gateway_core::{Message, Payload};
//!
//! let message = Message::new()
//!     .with_payload(Payload::new("application/xml", b"<Request/>".to_vec()).unwrap())
//!     .with_payload(Payload::new("application/pdf", vec![0x25, 0x50]).unwrap());
//!
//! assert_eq!(message.head().unwrap().mime_type(), "application/xml");
//! ```

mod delivery;
mod message;
mod notification;
mod payload;

pub use delivery::{BusinessDocument, DocumentClass, InboundDelivery};
pub use message::Message;
pub use notification::{Notification, NotificationKind, NotificationResult, NOTIFICATION_TTL};
pub use payload::{generate_payload_id, is_generated_payload_id, Payload};
