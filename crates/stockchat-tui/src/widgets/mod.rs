// TUI widget modules, one per screen region.

pub mod building;
pub mod entry;
pub mod input_box;
pub mod sidebar;
pub mod status_bar;
pub mod transcript;
