pub mod candle;
pub mod indicators;
pub mod mtf;
pub mod patterns;
pub mod resample;
pub mod zone_scan;

pub use candle::{Candle, Direction, Zone};
pub use mtf::{scan_mtf, MtfSignal, SignalStatus};
pub use zone_scan::{scan, ScanParameters, ScanResult};
