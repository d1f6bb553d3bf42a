//! Per-call descriptors handed to interceptors and behaviors

use parking_lot::Mutex;
use tonic::{metadata::MetadataMap, Code};

/// Routing information for an incoming call, supplied once per call.
#[derive(Debug, Clone, Default)]
pub struct HandlerCallDetails {
    /// Full method path, e.g. `/helloworld.Greeter/SayHello`
    pub method: String,
    pub invocation_metadata: MetadataMap,
}

impl HandlerCallDetails {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            invocation_metadata: MetadataMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: MetadataMap) -> Self {
        self.invocation_metadata = metadata;
        self
    }
}

/// Call context shared with the behavior for the duration of one call.
///
/// The behavior may set an outcome code while still returning normally;
/// interceptors read it back through [`ServicerContext::code`].
#[derive(Debug, Default)]
pub struct ServicerContext {
    method: String,
    code: Mutex<Option<Code>>,
    details: Mutex<Option<String>>,
}

impl ServicerContext {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Default::default()
        }
    }

    /// The method path this context was created for
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Outcome code recorded for this call, `None` when never set
    pub fn code(&self) -> Option<Code> {
        *self.code.lock()
    }

    pub fn set_code(&self, code: Code) {
        *self.code.lock() = Some(code);
    }

    pub fn details(&self) -> Option<String> {
        self.details.lock().clone()
    }

    pub fn set_details(&self, details: impl Into<String>) {
        *self.details.lock() = Some(details.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_unset_by_default() {
        let context = ServicerContext::new("/pkg.Svc/Method");
        assert_eq!(context.method(), "/pkg.Svc/Method");
        assert_eq!(context.code(), None);
        assert_eq!(context.details(), None);
    }

    #[test]
    fn test_set_code_and_details() {
        let context = ServicerContext::new("/pkg.Svc/Method");
        context.set_code(Code::NotFound);
        context.set_details("no such user");

        assert_eq!(context.code(), Some(Code::NotFound));
        assert_eq!(context.details().as_deref(), Some("no such user"));
    }
}
