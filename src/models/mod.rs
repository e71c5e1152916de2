//! Domain model module declarations.

pub mod checkpoint;
pub mod conversation;
pub mod notification;
