mod batch;
mod bitmap;
mod column;
mod record;

pub use batch::{ActiveRows, ColumnBatch, ColumnIo, RowSelection, Selection};
pub use bitmap::NullBitmap;
pub use column::{A64, ColumnVector, VectorData};
pub use record::Record;

/// Default number of row slots in a batch.
pub const DEFAULT_BATCH_CAPACITY: usize = 1024;
