#![no_std]

//! ESP32-S3 adapters behind the `meteoclock-core` traits.

pub mod input;
pub mod network;
pub mod platform;
pub mod rtc;
