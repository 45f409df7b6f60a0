//! Reading scalar summaries out of `events.out.tfevents*` files and turning a
//! results tree into an observation table.

pub mod proto;
pub mod record;
pub mod scan;

pub use record::{read_scalars, write_scalar_file, EventFileError, RecordError, ScalarPoint};
pub use scan::{load_dataset, scan_split, ScanMode, ScanStats};
