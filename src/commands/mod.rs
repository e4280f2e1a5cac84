mod expect;
mod send_input;
mod show;
mod type_text;
mod wait;

pub use expect::{Expect, ExpectTarget};
pub use send_input::{SendInput, SendLine, SendSecret};
pub use show::Show;
pub use type_text::TypeText;
pub use wait::Wait;
