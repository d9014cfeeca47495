mod builder;
mod codec;
mod container;
mod key;
mod sink;

pub use builder::HashTableBuilder;
pub use codec::{FORMAT_VERSION, HashTableSerDe, MAGIC};
pub use container::HashTableContainer;
pub use key::JoinKey;
pub use sink::{CollectingSink, PositionSink};
