pub mod codec;
pub mod domain_type;
pub mod storage;

pub use codec::{ContentCodec, Decoded, DomainObject, NoteCodec};
pub use domain_type::DomainType;
