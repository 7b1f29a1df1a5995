mod settings;

pub use settings::draw_settings;
