//! Shared-resource tables referenced by index from cells

mod intern;
pub mod number_format;
mod shared_strings;
mod styles;

pub use intern::InternTable;
pub use number_format::{is_date_format, NumberFormat};
pub use shared_strings::SharedStringTable;
pub use styles::{
    Alignment, ApplyFlags, Border, BorderSide, CellFormat, Color, ColorKind, Fill, Font,
    FontElement, Format, GradientFill, GradientStop, PatternFill, Protection, Stylesheet,
};
