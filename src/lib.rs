pub mod assemble;
pub mod cohort;
pub mod config;
pub mod deseq;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod gdc;
pub mod gene_map;
pub mod layout;
pub mod manifest;
pub mod matrix;
pub mod output;
pub mod pipeline;
