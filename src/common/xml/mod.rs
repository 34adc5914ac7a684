//! XML text helpers shared by the parser and the writer.

mod escape;

pub use escape::{escape_xml, first_illegal_char, is_xml_char, unescape_xml};
