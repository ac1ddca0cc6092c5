#![allow(async_fn_in_trait)]

pub mod commands;
pub mod context;
pub mod osu;
pub mod rework;
pub mod time;
