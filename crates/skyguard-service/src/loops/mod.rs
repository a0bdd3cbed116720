//! Background loops.

pub mod pipeline_loop;
