mod map;

pub use map::{PacketMap, PacketMapBuilder};
