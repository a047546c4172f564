//! # Action Language
//!
//! Menus react to players through lines of the form `[tag] argument`, with
//! optional `<delay=N>` (ticks) and `<chance=P>` (percent) modifiers anywhere
//! in the argument:
//!
//! ```text
//! [message] §aWelcome, %player_name%!
//! [console] give %player_name% diamond 1 <delay=40>
//! [sound] random.levelup 1 1.2 <chance=25>
//! ```
//!
//! [`parser`] turns a line into an [`ActionLine`]; [`executor`] runs lines
//! against a [`crate::menu::MenuEngine`].

pub mod executor;
pub mod parser;

pub use executor::MAX_ACTION_DEPTH;
pub use parser::{ActionLine, ActionTag, ExpAmount, SoundArgs};
