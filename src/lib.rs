#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]
#![deny(unused_must_use)]

pub mod registry;
pub mod store;

pub use registry::MulticastDelegate;
pub use store::{DelegateStore, Retention, Strategy};
