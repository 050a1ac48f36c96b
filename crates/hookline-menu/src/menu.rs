//! Per-client menu state and selection dispatch.
//!
//! # Invariants
//!
//! 1. A client's key mask is non-empty only between a successful `show` and
//!    the first of: a matching selection, a foreign menu, a pre-think check
//!    that finds the slot claimed, a disconnect, or a close.
//! 2. A selection is dispatched at most once per `show`: the key mask is
//!    cleared before the handler runs.
//! 3. The handler runs before `selections()` subscribers.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Client index 0 or above `max_clients` | Host bug | `MenuError::ClientOutOfRange` from `show`; ignored by event hooks |
//! | Transport refuses a chunk | Host messaging failure | `show` returns the error, keys stay unchanged |
//! | Key not offered | Stale or forged `menuselect` | Ignored, menu stays open |
//! | No handler and no subscribers | Menu shown without listeners | First `menuselect` closes it silently |

use std::fmt;

use bitflags::bitflags;
use hookline_core::{Delegate, Emitter, Observable};
use tracing::{debug, warn};

use crate::chunk::{MenuChunk, chunk_text, truncate_utf8};
use crate::config::MenuConfig;

/// 1-based player slot as numbered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientIndex(pub u16);

impl fmt::Display for ClientIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags! {
    /// Option keys a client may press. Bit `n` is key `n + 1`; the tenth
    /// key is labelled 0.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MenuKeys: u16 {
        const KEY_1 = 1 << 0;
        const KEY_2 = 1 << 1;
        const KEY_3 = 1 << 2;
        const KEY_4 = 1 << 3;
        const KEY_5 = 1 << 4;
        const KEY_6 = 1 << 5;
        const KEY_7 = 1 << 6;
        const KEY_8 = 1 << 7;
        const KEY_9 = 1 << 8;
        const KEY_0 = 1 << 9;
    }
}

impl MenuKeys {
    /// The key for a 1-based position (10 is key 0).
    #[must_use]
    pub const fn for_position(position: u8) -> Option<Self> {
        if position >= 1 && position <= 10 {
            Some(Self::from_bits_retain(1 << (position - 1)))
        } else {
            None
        }
    }
}

/// Errors from menu operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuError {
    /// The configuration cannot be used.
    InvalidConfig(&'static str),
    /// The client index is 0 or above the configured maximum.
    ClientOutOfRange { client: ClientIndex, max_clients: usize },
    /// The host transport failed to deliver a chunk.
    Transport(String),
}

impl fmt::Display for MenuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(reason) => write!(f, "invalid menu config: {reason}"),
            Self::ClientOutOfRange {
                client,
                max_clients,
            } => write!(f, "client {client} out of range 1..={max_clients}"),
            Self::Transport(msg) => write!(f, "menu transport error: {msg}"),
        }
    }
}

impl std::error::Error for MenuError {}

/// Host-side delivery of menu bodies.
pub trait MenuTransport {
    /// Ask the host to hand the client's menu slot over to us. Returning
    /// `false` aborts the show (e.g. the client is mid team selection).
    fn release_menu(&mut self, _client: ClientIndex) -> bool {
        true
    }

    /// Deliver one chunk. `time` is the display time in seconds, -1 for none.
    fn send_chunk(
        &mut self,
        client: ClientIndex,
        keys: MenuKeys,
        time: i32,
        chunk: MenuChunk<'_>,
    ) -> Result<(), MenuError>;
}

/// Game-side state sampled each frame before the player thinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerMenuProps {
    /// Bot or other fake client.
    pub fake_client: bool,
    /// Spectator proxy.
    pub proxy: bool,
    /// Old-style menu id the game believes is open (0 = none).
    pub menu: i32,
    /// New-style menu id the game believes is open (-1 = none).
    pub new_menu: i32,
}

impl Default for PlayerMenuProps {
    fn default() -> Self {
        Self {
            fake_client: false,
            proxy: false,
            menu: 0,
            new_menu: -1,
        }
    }
}

impl PlayerMenuProps {
    fn claims_menu(&self) -> bool {
        self.fake_client || self.proxy || self.menu != 0 || self.new_menu != -1
    }
}

/// Receives `(client, item)` for a dispatched selection; item 0 is the tenth key.
pub type MenuHandler<'a> = Delegate<'a, (ClientIndex, u8)>;

/// Numbered-key menu with one key mask per client.
pub struct Menu<'a> {
    config: MenuConfig,
    /// Indexed by client; slot 0 is unused.
    keys: Vec<MenuKeys>,
    handler: MenuHandler<'a>,
    selections: Emitter<'a, (ClientIndex, u8)>,
}

impl fmt::Debug for Menu<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = self.keys.iter().filter(|k| !k.is_empty()).count();
        f.debug_struct("Menu")
            .field("config", &self.config)
            .field("open", &open)
            .field("handler_bound", &self.handler.is_bound())
            .field("selections", self.selections.observable())
            .finish()
    }
}

impl<'a> Menu<'a> {
    /// Create a menu with every client closed and no handler.
    pub fn new(config: MenuConfig) -> Result<Self, MenuError> {
        config.validate().map_err(MenuError::InvalidConfig)?;
        let keys = vec![MenuKeys::empty(); config.max_clients + 1];
        Ok(Self {
            config,
            keys,
            handler: MenuHandler::new(),
            selections: Emitter::with_label("menu.selections"),
        })
    }

    /// Builder form of [`Menu::set_handler`].
    #[must_use]
    pub fn with_handler(mut self, handler: MenuHandler<'a>) -> Self {
        self.handler = handler;
        self
    }

    #[must_use]
    pub fn config(&self) -> &MenuConfig {
        &self.config
    }

    pub fn set_handler(&mut self, handler: MenuHandler<'a>) {
        self.handler = handler;
    }

    #[must_use]
    pub fn handler(&self) -> MenuHandler<'a> {
        self.handler
    }

    /// Run the handler directly, if one is bound.
    pub fn invoke_handler(&self, client: ClientIndex, item: u8) {
        if self.handler.is_bound() {
            self.handler.invoke((client, item));
        }
    }

    /// Subscribers notified after the handler for every dispatched selection.
    #[must_use]
    pub fn selections(&self) -> &Observable<'a, (ClientIndex, u8)> {
        self.selections.observable()
    }

    /// Keys the client may currently press.
    #[must_use]
    pub fn keys(&self, client: ClientIndex) -> MenuKeys {
        self.slot(client)
            .map_or(MenuKeys::empty(), |slot| self.keys[slot])
    }

    #[must_use]
    pub fn is_open(&self, client: ClientIndex) -> bool {
        !self.keys(client).is_empty()
    }

    /// Show a menu to one client.
    ///
    /// Returns `Ok(false)` when the transport refuses to release the client's
    /// menu slot. `time` falls back to the configured display time.
    pub fn show<T>(
        &mut self,
        transport: &mut T,
        client: ClientIndex,
        keys: MenuKeys,
        text: &str,
        time: Option<i32>,
    ) -> Result<bool, MenuError>
    where
        T: MenuTransport + ?Sized,
    {
        let slot = self.slot(client)?;
        let text = truncate_utf8(text, self.config.max_text_bytes);
        let time = time.unwrap_or(self.config.display_time);
        self.show_prepared(transport, slot, client, keys, text, time)
    }

    /// Show the same menu to several clients; failures are logged and
    /// skipped. Returns whether any client got the menu.
    pub fn show_all<T, I>(
        &mut self,
        transport: &mut T,
        clients: I,
        keys: MenuKeys,
        text: &str,
        time: Option<i32>,
    ) -> bool
    where
        T: MenuTransport + ?Sized,
        I: IntoIterator<Item = ClientIndex>,
    {
        let text = truncate_utf8(text, self.config.max_text_bytes);
        let time = time.unwrap_or(self.config.display_time);
        let mut shown = false;
        for client in clients {
            let result = self
                .slot(client)
                .and_then(|slot| self.show_prepared(transport, slot, client, keys, text, time));
            match result {
                Ok(ok) => shown |= ok,
                Err(err) => warn!(%client, %err, "menu not shown"),
            }
        }
        shown
    }

    /// Replace an open menu with an empty one, closing it on the client.
    pub fn close<T>(&mut self, transport: &mut T, client: ClientIndex) -> Result<(), MenuError>
    where
        T: MenuTransport + ?Sized,
    {
        if self.is_open(client) {
            self.show(transport, client, MenuKeys::empty(), " ", None)?;
        }
        Ok(())
    }

    /// Close every open menu; failures are logged and skipped.
    pub fn close_all<T>(&mut self, transport: &mut T)
    where
        T: MenuTransport + ?Sized,
    {
        for slot in 1..self.keys.len() {
            if self.keys[slot].is_empty() {
                continue;
            }
            let client = ClientIndex(slot as u16);
            if let Err(err) = self.close(transport, client) {
                warn!(%client, %err, "menu not closed");
            }
        }
    }

    /// Handle a client console command. Returns the dispatched item when the
    /// command was a valid `menuselect` for an offered key.
    ///
    /// The client's keys are cleared before the handler and subscribers run.
    /// They cannot reach this `Menu` while it is borrowed here, so a
    /// follow-up menu is shown by the caller once `Some(item)` comes back.
    pub fn handle_client_command(
        &mut self,
        client: ClientIndex,
        command: &str,
        argument: Option<&str>,
    ) -> Option<u8> {
        let slot = self.slot(client).ok()?;
        let offered = self.keys[slot];
        if offered.is_empty() || command != "menuselect" {
            return None;
        }
        let argument = argument.filter(|a| !a.trim().is_empty())?;

        if !self.handler.is_bound() && self.selections.observable().is_empty() {
            self.keys[slot] = MenuKeys::empty();
            debug!(%client, "menu closed: no selection listeners");
            return None;
        }

        let pressed = parse_leading_int(argument).filter(|&n| n != 0)?;
        let position = pressed.clamp(1, 10) as u8;
        let key = MenuKeys::for_position(position)?;
        if !offered.contains(key) {
            return None;
        }

        self.keys[slot] = MenuKeys::empty();
        let item = if position == 10 { 0 } else { position };
        debug!(%client, item, "menu selection");
        self.invoke_handler(client, item);
        self.selections.notify((client, item));
        Some(item)
    }

    /// Another plugin or the game showed a menu to `client`.
    pub fn on_foreign_menu(&mut self, client: ClientIndex) {
        self.forget(client, "foreign menu shown");
    }

    pub fn on_disconnect(&mut self, client: ClientIndex) {
        self.forget(client, "client disconnected");
    }

    /// Per-frame check: drop the menu if the slot is claimed elsewhere.
    pub fn on_pre_think(&mut self, client: ClientIndex, props: PlayerMenuProps) {
        if self.is_open(client) && props.claims_menu() {
            self.forget(client, "menu slot claimed");
        }
    }

    /// New map or player count: resize and close everything.
    pub fn on_server_activate(&mut self, max_clients: usize) -> Result<(), MenuError> {
        let config = self.config.clone().with_max_clients(max_clients);
        config.validate().map_err(MenuError::InvalidConfig)?;
        self.keys = vec![MenuKeys::empty(); config.max_clients + 1];
        self.config = config;
        debug!(max_clients, "menu state reset");
        Ok(())
    }

    fn forget(&mut self, client: ClientIndex, reason: &'static str) {
        if let Ok(slot) = self.slot(client)
            && !self.keys[slot].is_empty()
        {
            self.keys[slot] = MenuKeys::empty();
            debug!(%client, reason, "menu forgotten");
        }
    }

    fn slot(&self, client: ClientIndex) -> Result<usize, MenuError> {
        let slot = usize::from(client.0);
        if slot == 0 || slot > self.config.max_clients {
            return Err(MenuError::ClientOutOfRange {
                client,
                max_clients: self.config.max_clients,
            });
        }
        Ok(slot)
    }

    fn show_prepared<T>(
        &mut self,
        transport: &mut T,
        slot: usize,
        client: ClientIndex,
        keys: MenuKeys,
        text: &str,
        time: i32,
    ) -> Result<bool, MenuError>
    where
        T: MenuTransport + ?Sized,
    {
        if !transport.release_menu(client) {
            debug!(%client, "menu slot not released");
            return Ok(false);
        }
        for chunk in chunk_text(text, self.config.chunk_size) {
            transport.send_chunk(client, keys, time, chunk)?;
        }
        self.keys[slot] = keys;
        debug!(%client, keys = keys.bits(), "menu shown");
        Ok(true)
    }
}

/// Leading decimal integer, `strtol` style: optional whitespace and sign,
/// then digits up to the first non-digit. `None` without digits or on
/// overflow.
fn parse_leading_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let end = rest
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    let magnitude: i64 = rest[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
