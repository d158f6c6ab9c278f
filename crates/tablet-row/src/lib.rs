//! A packed binary row codec: a self-describing row with a nullability
//! bitmap, fixed-width scalar fields, and an indirect varchar heap
//! addressed through a multi-width offset table.

mod builder;
mod composite;
mod error;
mod layout;
mod schema;
mod view;

pub use builder::RowBuilder;
pub use composite::CompositeRow;
pub use error::RowCodecError;
pub use layout::addr_len_for;
pub use schema::{ColumnDef, ColumnType, Schema, SchemaError, FVERSION, HEADER_LENGTH, SVERSION, VERSION_LENGTH};
pub use view::RowView;
