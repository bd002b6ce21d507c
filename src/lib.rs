pub mod aggregate;
pub mod calendar;
pub mod config;
pub mod debounce;
pub mod edit;
pub mod journal;
pub mod policy;
pub mod rest;
pub mod session;
pub mod store;
