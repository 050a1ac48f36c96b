#![forbid(unsafe_code)]

//! Numbered-key menus driven by hookline delegates.
//!
//! A [`Menu`] tracks which option keys each client may press, pushes the
//! menu body through a host [`MenuTransport`] in bounded chunks, and turns a
//! `menuselect N` client command into a call to its [`MenuHandler`] plus a
//! notification on its [`Menu::selections`] observable.
//!
//! The host glue (message registration, command hooks, per-player game
//! state) stays outside: the host forwards events into the `on_*` and
//! `handle_client_command` methods and implements the transport.

pub mod chunk;
pub mod config;
pub mod menu;

pub use chunk::{Chunks, MenuChunk, chunk_text, truncate_utf8};
pub use config::MenuConfig;
pub use menu::{
    ClientIndex, Menu, MenuError, MenuHandler, MenuKeys, MenuTransport, PlayerMenuProps,
};
