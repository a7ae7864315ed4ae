//! Column-group encoders.
//!
//! | Encoding | Stored | Chosen when |
//! |----------|--------|-------------|
//! | `Empty` | nothing | every value is `+0.0` |
//! | `Const` | one tuple | every row holds the same tuple |
//! | `Ddc` | dictionary + row codes | dictionary coding is smaller than raw |
//! | `Uncompressed` | raw values | dictionary coding does not pay off |

mod dictionary;
mod groups;
mod mapping;

pub use dictionary::TupleDictionary;
pub use groups::{ConstGroup, DdcGroup, EmptyGroup, UncompressedGroup};
pub use mapping::CodeMap;
