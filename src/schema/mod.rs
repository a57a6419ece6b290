//! Wire and record types shared by every stage.
//!
//! Field names are camelCase on the wire; providers are asked to reply in
//! exactly these shapes and stored artifacts use them too.

mod docast;
mod finding;
mod job;
mod rounds;
mod validate;

pub use docast::*;
pub use finding::*;
pub use job::*;
pub use rounds::*;
pub use validate::*;
