mod gauge;
mod layout;

pub use layout::draw_ui;
