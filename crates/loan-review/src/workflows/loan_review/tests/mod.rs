mod common;
mod narrative;
