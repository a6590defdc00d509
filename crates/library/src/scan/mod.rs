pub(crate) mod error;
mod file;
mod stream;

pub use self::file::{Scan, ScanEffort, scan_file};
pub use self::stream::{ScanEvent, scan};
