#![no_std]

pub mod esp;
pub mod ip;
