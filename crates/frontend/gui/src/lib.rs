//! emu-av GUI library
//!
//! Host-side adapters for the windowed front-end: a rodio output device and a
//! minifb window, plus the settings file they are configured from.

pub mod audio_out;
pub mod settings;
pub mod window;
