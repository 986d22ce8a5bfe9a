pub mod command_bar;
pub mod dialogs;
pub mod theme;
pub mod timeline_canvas;
pub mod timeline_panel;
