//! API facade layer.
//!
//! Holds the contract every pluggable transport implements and the context a
//! transport uses to hand inbound traffic back to the gateway. The outward
//! [`crate::Gateway`] facade is built on top of it.

pub mod transport;
