// src/lib.rs

//! sugang: SNU course search and seat monitor library

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
