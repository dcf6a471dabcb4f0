//! Connected peer descriptions

use crate::PeerId;

/// One connected peer as shown to the user
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PeerInfo {
    pub id: PeerId,
    pub display_name: String,
}

impl PeerInfo {
    pub fn new(id: PeerId, display_name: impl Into<String>) -> Self {
        PeerInfo {
            id,
            display_name: display_name.into(),
        }
    }
}
