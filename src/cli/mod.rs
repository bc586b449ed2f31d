//! Terminal commands and their rendering

pub mod compare;
pub mod setup;
pub mod ui;
