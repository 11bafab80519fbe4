//! Message contexts for every operation.
//!
//! These values are protocol constants agreed with the broker; they are
//! pinned here and never negotiated per connection.

use std::fmt;

use crate::core::frame::{MessageContext, MessageFrame};

/// Command classifiers
pub mod command {
    pub const NULL: u8 = 0;
    pub const BASIC: u8 = 1;
    pub const MULTICAST: u8 = 2;
}

/// Operation qualifiers, scoped by command
pub mod qualifier {
    pub const IDENTIFY: u8 = 1;
    pub const AUTHENTICATE: u8 = 2;

    pub const REGISTER: u8 = 1;
    pub const GET_KEY: u8 = 2;
    pub const FIND_ROOT: u8 = 3;

    pub const PUBLISH: u8 = 1;
    pub const SUBSCRIBE: u8 = 2;
    pub const UNSUBSCRIBE: u8 = 3;
}

/// Status codes
pub mod status {
    pub const REQUEST: u8 = 0;
    pub const ACCEPTED: u8 = 1;
    pub const REJECTED: u8 = 127;
}

/// Every request/response pair the client speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Identify,
    Authenticate,
    Register,
    GetKey,
    FindRoot,
    Publish,
    Subscribe,
    Unsubscribe,
}

impl Operation {
    const fn classifier(self) -> (u8, u8) {
        match self {
            Operation::Identify => (command::NULL, qualifier::IDENTIFY),
            Operation::Authenticate => (command::NULL, qualifier::AUTHENTICATE),
            Operation::Register => (command::BASIC, qualifier::REGISTER),
            Operation::GetKey => (command::BASIC, qualifier::GET_KEY),
            Operation::FindRoot => (command::BASIC, qualifier::FIND_ROOT),
            Operation::Publish => (command::MULTICAST, qualifier::PUBLISH),
            Operation::Subscribe => (command::MULTICAST, qualifier::SUBSCRIBE),
            Operation::Unsubscribe => (command::MULTICAST, qualifier::UNSUBSCRIBE),
        }
    }

    /// Context stamped on outgoing requests
    pub const fn request(self) -> MessageContext {
        let (command, qualifier) = self.classifier();
        MessageContext::new(command, qualifier, status::REQUEST)
    }

    /// Context a successful response must carry
    pub const fn response(self) -> MessageContext {
        let (command, qualifier) = self.classifier();
        MessageContext::new(command, qualifier, status::ACCEPTED)
    }

    /// Context of a response that denies the request
    pub const fn rejection(self) -> MessageContext {
        let (command, qualifier) = self.classifier();
        MessageContext::new(command, qualifier, status::REJECTED)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Operation::Identify => "identify",
            Operation::Authenticate => "authenticate",
            Operation::Register => "register",
            Operation::GetKey => "get-key",
            Operation::FindRoot => "find-root",
            Operation::Publish => "publish",
            Operation::Subscribe => "subscribe",
            Operation::Unsubscribe => "unsubscribe",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The single matching rule used for every response: command, qualifier and
/// status must all equal the expected context.
pub fn check_context(frame: &MessageFrame, expected: MessageContext) -> bool {
    frame.command() == expected.command
        && frame.qualifier() == expected.qualifier
        && frame.status() == expected.status
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_and_response_differ_only_in_status() {
        for op in [
            Operation::Identify,
            Operation::Authenticate,
            Operation::Register,
            Operation::GetKey,
            Operation::FindRoot,
            Operation::Publish,
            Operation::Subscribe,
            Operation::Unsubscribe,
        ] {
            let request = op.request();
            let response = op.response();
            assert_eq!(request.command, response.command);
            assert_eq!(request.qualifier, response.qualifier);
            assert_eq!(request.status, status::REQUEST);
            assert_eq!(response.status, status::ACCEPTED);
            assert_eq!(op.rejection().status, status::REJECTED);
        }
    }

    #[test]
    fn operations_have_distinct_classifiers() {
        let ops = [
            Operation::Identify,
            Operation::Authenticate,
            Operation::Register,
            Operation::GetKey,
            Operation::FindRoot,
            Operation::Publish,
            Operation::Subscribe,
            Operation::Unsubscribe,
        ];
        let mut seen = std::collections::HashSet::new();
        for op in ops {
            assert!(seen.insert(op.request()), "duplicate context for {op}");
        }
    }
}
