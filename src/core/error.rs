use std::fmt;

/// Command-level failures.
///
/// `Display` is the wire-visible reason: an `ERR <reason>` line is built
/// directly from it, so keep the text short and stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// Command other than AUTH/QUIT issued before authentication.
    AuthRequired,
    /// AUTH presented a key the validator rejected.
    AuthFailed,
    /// Unknown subscription identifier.
    NotFound,
    /// DETACH issued by a session that does not own the subscription.
    NotOwner,
    /// ATTACH on a subscription that already has an owning session.
    AlreadyActive,
    /// Operation not permitted in the subscription's or session's
    /// current state; carries the wire reason.
    InvalidState(&'static str),
    /// PUBLISH declared a body larger than the broker accepts.
    PayloadTooLarge,
    /// Line or field that does not parse as a command.
    MalformedFrame,
    /// Peer went away mid-frame; never sent on the wire.
    TransportClosed,
}

impl std::error::Error for BrokerError {}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerError::AuthRequired => write!(f, "authentication required"),
            BrokerError::AuthFailed => write!(f, "invalid api key"),
            BrokerError::NotFound => write!(f, "subscription not found"),
            BrokerError::NotOwner => write!(f, "subscription owned by another session"),
            BrokerError::AlreadyActive => write!(f, "subscription already active"),
            BrokerError::InvalidState(reason) => write!(f, "{reason}"),
            BrokerError::PayloadTooLarge => write!(f, "payload too large"),
            BrokerError::MalformedFrame => write!(f, "malformed frame"),
            BrokerError::TransportClosed => write!(f, "transport closed"),
        }
    }
}
