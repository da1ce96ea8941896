#![allow(dead_code)]

mod fixture;
mod harness;

pub use fixture::*;
pub use harness::*;
