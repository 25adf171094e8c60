//! Flat-file inputs and outputs: ratings and schedule CSVs in, CSV out.

pub mod export;
pub mod loaders;

pub use export::{write_csv, write_csv_file};
pub use loaders::{load_ratings, load_schedule, read_ratings, read_schedule};
