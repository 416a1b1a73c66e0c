pub mod registrar;
pub mod wg;

pub use registrar::{PeerRegistration, register_peer};
pub use wg::WgCli;
