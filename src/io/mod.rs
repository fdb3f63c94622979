// Moving reference data and estimates in and out of the store: JSON
// reference files on the way in, CSV and JSON snapshots on the way out.

pub mod export;
pub mod import;

pub use export::*;
pub use import::*;
