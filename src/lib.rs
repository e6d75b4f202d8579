//! Retrieves CBS renewable electricity statistics (dataset 82610ENG),
//! reshapes production and capacity per energy source into yearly series,
//! exports them to an XLSX workbook and verifies them against published
//! reference figures.
//!
//! Pipeline: fetch → classify → aggregate → export → verify (see `pipeline`).

pub mod analysis;
pub mod categories;
pub mod config;
pub mod export;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod reference;
pub mod verify;
