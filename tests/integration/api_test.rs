//! API endpoint integration tests
//!
//! Drives the composed application router end to end: admin boundary,
//! role management, first-admin bootstrap, subscriptions, plans, user
//! management and the technique catalog.

#![allow(dead_code)]

mod access;
mod catalog;
mod common;
mod plans;
mod roles;
mod setup;
mod subscription;
mod users;
