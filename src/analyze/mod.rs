//! Static analysis of squashed migrations

mod call_args;
mod rename_drop;

pub use call_args::{bind, literal_value, parse_arguments, Argument};
pub use rename_drop::{
    drop_events, find_hazards, has_hazard, rename_events, DropEvent, EntityKind, Hazard,
    RenameEvent,
};
