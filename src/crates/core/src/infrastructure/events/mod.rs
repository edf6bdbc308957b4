//! Observable state shared between the core and front ends

pub mod observable;

pub use observable::Observable;
