//! Canvas LMS access.
//!
//! [`CanvasClient`] speaks HTTP and returns raw JSON; [`RemoteApi`] turns that
//! into typed [`Container`] / [`SubContainer`] / [`Item`] records;
//! [`Remote`] absorbs failures into events; [`HierarchyLoader`] walks the
//! three levels for one run.

pub mod api;
pub mod client;
pub mod error;
pub mod loader;
pub mod remote;
#[cfg(test)]
pub mod testing;
pub mod types;

pub use api::RemoteApi;
pub use client::{CanvasClient, ClientConfig};
pub use loader::HierarchyLoader;
pub use remote::Remote;
pub use types::{Container, Item, SubContainer};
