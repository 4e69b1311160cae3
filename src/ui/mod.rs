pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{banner, class_row, header, section, status, success, timing, warn};
pub use progress::Spinner;
pub use table::{render_table, stats_table, TableBuilder};
pub use theme::{theme, Theme};
