pub mod style;
pub mod table;
pub mod template;

pub use style::{OutputBuffer, Style};
pub use template::Templates;
