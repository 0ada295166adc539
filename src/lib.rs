//! deCONZ bridge library.
//!
//! Maps the devices of a deCONZ Zigbee gateway to smart-home accessories and
//! keeps their exposed values in sync with the gateway's live event stream.

pub mod accessory;
pub mod config;
pub mod error;
pub mod gateway;
pub mod storage;
