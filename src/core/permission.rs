// src/core/permission.rs

//! The permission model: a small typed bitset over three identity classes
//! (root, user, guest), each carrying read/write/execute bits laid out like
//! file-mode triplets.
//!
//! The same type describes what a connection currently is and what a command
//! requires. Access is granted when the two share at least one bit.

use bitflags::bitflags;
use std::fmt;
use std::sync::atomic::{AtomicU16, Ordering};

const EXEC: u16 = 1 << 0;
const WRITE: u16 = 1 << 1;
const READ: u16 = 1 << 2;
const RWX: u16 = READ | WRITE | EXEC;

const ROOT_SHIFT: u16 = 0;
const USER_SHIFT: u16 = 3;
const GUEST_SHIFT: u16 = 6;

bitflags! {
    /// `[GUEST:rwx][USER:rwx][ROOT:rwx]`, lowest triplet is root.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Mode: u16 {
        const ROOT_EXEC   = EXEC << ROOT_SHIFT;
        const ROOT_WRITE  = WRITE << ROOT_SHIFT;
        const ROOT_READ   = READ << ROOT_SHIFT;
        const USER_EXEC   = EXEC << USER_SHIFT;
        const USER_WRITE  = WRITE << USER_SHIFT;
        const USER_READ   = READ << USER_SHIFT;
        const GUEST_EXEC  = EXEC << GUEST_SHIFT;
        const GUEST_WRITE = WRITE << GUEST_SHIFT;
        const GUEST_READ  = READ << GUEST_SHIFT;

        /// Every action of the administrator class.
        const ROOT  = RWX << ROOT_SHIFT;
        /// Every action of the signed-in user class.
        const USER  = RWX << USER_SHIFT;
        /// Every action of the anonymous class.
        const GUEST = RWX << GUEST_SHIFT;

        /// Any identity who registered: user or root.
        const REGISTERED = Self::ROOT.bits() | Self::USER.bits();
        /// Every class, every action.
        const ALL = Self::REGISTERED.bits() | Self::GUEST.bits();
    }
}

impl Mode {
    /// The mode that nothing satisfies.
    pub const BAN: Mode = Mode::empty();

    /// True when `self` satisfies the `required` mode.
    pub fn grants(self, required: Mode) -> bool {
        self.intersects(required)
    }

    /// The identity class this mode names, for display.
    pub fn identity(self) -> &'static str {
        if self == Mode::ROOT {
            "root"
        } else if self == Mode::USER {
            "user"
        } else if self == Mode::GUEST {
            "guest"
        } else if self.is_empty() {
            "banned"
        } else {
            "mixed"
        }
    }
}

/// Renders the mode the way file permissions are usually printed: five octal digits.
impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:05o}", self.bits())
    }
}

/// Shared storage for one connection's current mode.
///
/// Lives inside the registry's shared `Connection`. Only the owning session
/// writes it; administrative listings read it through the registry.
#[derive(Debug)]
pub struct ModeCell(AtomicU16);

impl ModeCell {
    pub fn new(mode: Mode) -> Self {
        Self(AtomicU16::new(mode.bits()))
    }

    pub fn get(&self) -> Mode {
        Mode::from_bits_truncate(self.0.load(Ordering::Acquire))
    }

    /// Grants the connection a new identity.
    pub fn elevate(&self, mode: Mode) {
        self.0.store(mode.bits(), Ordering::Release);
    }

    /// Drops the connection back to the anonymous identity.
    pub fn revoke(&self) {
        self.elevate(Mode::GUEST);
    }
}

impl Default for ModeCell {
    fn default() -> Self {
        Self::new(Mode::GUEST)
    }
}
