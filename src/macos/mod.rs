//! macOS-specific implementations.
//!
//! This module provides the concrete [`System`](crate::traits::System)
//! backend used by the lifecycle flows: privilege checks, SIP and boot
//! argument inspection, and copying the bundle into place.
//!
//! Nothing outside this module should shell out to macOS tools directly.

pub mod system;
