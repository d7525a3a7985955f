use crate::part::Module;
use lazy_static::lazy_static;

pub mod annotation;
pub mod batch;
pub mod builder;
pub mod construct;
pub mod error;
pub mod filler;
pub mod gc_contents;
pub mod manifest;
pub mod nucleotide;
pub mod part;
pub mod recipe;

lazy_static! {
    // High-affinity CTCF consensus, forward strand. Structural-variant
    // recipes place this raw motif at loop anchor positions.
    pub static ref CTCF_ANCHOR: Module = Module::new("CTCF_anchor", "CCGCGTGGTGGCAGGAGC");
}
