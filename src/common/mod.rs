//! Common utilities and types for the Talos robot

pub mod geometry;
