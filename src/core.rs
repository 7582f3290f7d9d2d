//! Core translator logic, independent of any terminal or window surface.

pub mod clipboard;
pub mod session;
pub mod translator;
