//! Debug module for inspecting scene state
//!
//! Text dumps of the resource tables and a small registry of console
//! commands that produce them.

pub mod scene_info;

pub use scene_info::{light_info, primitive_info, texture_info, ConsoleCommands, SceneCommand};
