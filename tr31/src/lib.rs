//! TR-31 (ANSI X9.143) key blocks: wrapping keys together with their usage metadata under a key
//! block protection key.


pub mod crypt;
pub mod error;
pub mod header;
pub mod kbpk;
pub mod kdf;
pub mod key_block;
pub mod version;


pub use crate::error::{HeaderError, KbpkError, KeyBlockError};
pub use crate::header::{Blocks, Header};
pub use crate::kbpk::{generate_kbpk, validate_kbpk};
pub use crate::key_block::{KeyBlock, UnwrappedKey};
pub use crate::version::Version;
