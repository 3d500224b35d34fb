//! # Equipment Interface
//!
//! This module defines the interface structures exchanged with the vehicle's equipment.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod cam;
pub mod motor;
pub mod ultra;
