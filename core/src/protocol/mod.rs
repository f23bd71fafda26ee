//! Wire protocol: packet framing and the clip payload schema

pub mod constants;
mod content;
pub mod group;
mod packet;

pub use content::ClipContent;
pub use packet::{decode, encode, Action, Packet, PacketError, SenderId};
