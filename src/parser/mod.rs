//! Message parsing: charset resolution, header decoding, MIME tree
//! flattening, and HTML-to-text conversion.

pub mod charset;
pub mod flatten;
pub mod header;
pub mod html2txt;
