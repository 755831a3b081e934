//! The room hub: membership and message fan-out.
//!
//! A single [`Room`] task owns the membership set and processes admit,
//! depart, and broadcast events strictly one at a time, in the order they
//! were submitted. Everything else talks to it through a cloneable
//! [`Hub`] handle. No lock guards the membership set because no other task
//! can reach it.

pub mod hub;
pub mod member;

pub use hub::{DEFAULT_INTAKE_CAPACITY, Hub, Room};
pub use member::{DEFAULT_OUTBOUND_CAPACITY, Delivery, Member, Outbound};
