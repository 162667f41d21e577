//! On-disk format of the platform configuration: property text and the
//! indexed site codec layered on top of it.

pub mod codec;
pub mod properties;

pub use codec::{
    chunk_list, decode_sites, encode_configuration, is_complete, join_list_segments,
    write_configuration, LIST_CHUNK_LEN,
};
pub use properties::PropertySet;
