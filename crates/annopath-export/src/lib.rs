//! annopath-export: Annotation document serializers (sans-IO)
//!
//! Converts an [`AnnotationDocument`](annopath_pipeline::AnnotationDocument)
//! to and from the annotation path JSON format.

pub mod json;

pub use json::{CodecError, DecodeIssue, Decoded, decode_document, encode_document};
