/// Commands from the engine into the signaling network thread.
#[derive(Debug)]
pub enum SignalingCommand {
    /// One encoded text frame.
    Send(String),
    /// Optionally send a last frame, then close.
    Disconnect { farewell: Option<String> },
}
