pub mod cli;
pub mod provenance;
pub mod repository;
