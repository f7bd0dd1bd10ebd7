pub mod assembly;
pub mod config;
pub mod domain;
pub mod entrez;
pub mod error;
pub mod fasta;
pub mod filter;
pub mod http;
pub mod mirror;
pub mod ncbi;
pub mod output;
pub mod report;
pub mod summary;
