#![deny(clippy::await_holding_refcell_ref)]

pub mod commands;
pub mod common;
pub mod event;
pub mod gateway;
pub mod provision;
pub mod service;
pub mod workflow;

#[cfg(test)]
pub(crate) mod tests;

pub type Error = crate::common::error::SqError;
pub type Result<T> = std::result::Result<T, Error>;

pub use shadowsim;
