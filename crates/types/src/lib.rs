//! Value model shared by the objpath crates: the graph a pointer addresses.

pub mod bean;
pub mod locale;
pub mod name;
pub mod value;

pub use bean::{Bean, BeanError, Record, RecordBuilder};
pub use locale::Locale;
pub use name::QName;
pub use value::{Cell, Foreign, List, Map, Value};
