#![allow(dead_code)]

pub mod cli;
