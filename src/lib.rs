//! An arena-backed doubly linked list with cursors and bound searches, and a
//! flat-file record table built on it.

pub mod encoding;
pub mod error;
pub mod fs;
pub mod list;
pub mod shop;
pub mod table;

pub use encoding::{Decode, Encode, FixedStr, Record};
pub use error::{Bound, Error};
pub use list::{Cursor, CursorMut, OrderedList, Position};
pub use table::{RecordTable, TableOptions};
