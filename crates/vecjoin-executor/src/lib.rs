pub mod blob_store;
pub mod bucket;
pub mod config;
pub mod hashtable;
pub mod join;
pub mod loader;
pub mod metrics;
pub mod plan;
pub mod publisher;
pub mod vector_expr;

pub use blob_store::{BlobStore, InMemoryBlobStore, LocalFsBlobStore, hashtable_path};
pub use bucket::{BucketMapJoinContext, BucketPruner, bucket_file_name};
pub use config::{ExecutionConfig, HashTableConfig};
pub use hashtable::{
    CollectingSink, HashTableBuilder, HashTableContainer, HashTableSerDe, JoinKey,
};
pub use join::MapJoinProbe;
pub use loader::{HashTableLoader, MapJoinTables};
pub use metrics::LoaderMetrics;
pub use plan::{
    BatchSink, BatchesProducer, BuildSideProducer, JoinInputDesc, LocalWork, MapJoinDesc,
    TaskContext,
};
pub use publisher::HashTablePublisher;
pub use vector_expr::{
    ArithmeticOp, CompareOp, Descriptor, ExprArg, ExprKind, ExpressionCatalog, Mode,
    VectorExpression,
};
pub use vecjoin_common::{Error, Result};
