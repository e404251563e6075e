//! Explicit XML mapping of the protocol documents.
//!
//! Element order is fixed by the remote schema, so documents are written and
//! read field by field instead of through serde annotations.

mod decode;
mod encode;
mod tree;

pub use decode::{
    check_fault, decode_authentication_data_request, decode_authentication_request,
    decode_signed_ticket, decode_signed_user_info, decode_ticket, decode_user_info,
};
pub use encode::{encode_authentication_data_request, encode_authentication_request};
