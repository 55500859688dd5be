pub mod sample;
pub mod table;

pub use sample::{to_business_local, Reading, Sample, SampleRow, BUSINESS_OFFSET};
pub use table::{TableIdent, TableIdentError};
