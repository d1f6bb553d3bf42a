//! Behavior substitution for method handlers

use crate::handler::{Behavior, BehaviorFn, CallShape, RpcMethodHandler};

/// Produces a replacement for a handler's behavior.
///
/// The replacement must keep the calling convention of the original: it is
/// handed the same input, the same context, and its result goes back to the
/// framework as is.
pub trait BehaviorWrapper {
    fn wrap<I, O>(&self, behavior: BehaviorFn<I, O>, shape: CallShape) -> BehaviorFn<I, O>
    where
        I: Send + 'static,
        O: Send + 'static;
}

/// Rebuild `handler` around the behavior produced by `wrapper`.
///
/// The new handler has the same shape and the very same request
/// deserializer and response serializer. An absent handler stays absent.
pub fn wrap_rpc_behavior<Req, Resp, W>(
    handler: Option<RpcMethodHandler<Req, Resp>>,
    wrapper: &W,
) -> Option<RpcMethodHandler<Req, Resp>>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    W: BehaviorWrapper + ?Sized,
{
    let handler = handler?;
    let shape = handler.shape();
    let (behavior, request_deserializer, response_serializer) = handler.into_parts();

    let handler = match behavior {
        Behavior::UnaryUnary(f) => RpcMethodHandler::unary_unary(
            wrapper.wrap(f, shape),
            request_deserializer,
            response_serializer,
        ),
        Behavior::UnaryStream(f) => RpcMethodHandler::unary_stream(
            wrapper.wrap(f, shape),
            request_deserializer,
            response_serializer,
        ),
        Behavior::StreamUnary(f) => RpcMethodHandler::stream_unary(
            wrapper.wrap(f, shape),
            request_deserializer,
            response_serializer,
        ),
        Behavior::StreamStream(f) => RpcMethodHandler::stream_stream(
            wrapper.wrap(f, shape),
            request_deserializer,
            response_serializer,
        ),
    };

    Some(handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ServicerContext;
    use crate::handler::{behavior_fn, request_deserializer, response_serializer};
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Records the shapes it was asked to wrap and tags unary responses
    #[derive(Default)]
    struct ShapeRecorder {
        shapes: Mutex<Vec<CallShape>>,
    }

    impl BehaviorWrapper for ShapeRecorder {
        fn wrap<I, O>(&self, behavior: BehaviorFn<I, O>, shape: CallShape) -> BehaviorFn<I, O>
        where
            I: Send + 'static,
            O: Send + 'static,
        {
            self.shapes.lock().push(shape);
            behavior_fn(move |input: I, context: &ServicerContext| {
                context.set_details("wrapped");
                behavior(input, context)
            })
        }
    }

    fn handler_of_shape(shape: CallShape) -> RpcMethodHandler<String, String> {
        let deserializer = request_deserializer(|bytes: &[u8]| {
            Ok(String::from_utf8_lossy(bytes).into_owned())
        });
        let serializer = response_serializer(|resp: &String| Ok(Bytes::from(resp.clone())));

        match shape {
            CallShape::UnaryUnary => RpcMethodHandler::unary_unary(
                behavior_fn(|req, _| Ok(req)),
                Some(deserializer),
                Some(serializer),
            ),
            CallShape::UnaryStream => RpcMethodHandler::unary_stream(
                behavior_fn(|req: String, _| {
                    Ok(Box::new(std::iter::once(req)) as Box<dyn Iterator<Item = String> + Send>)
                }),
                Some(deserializer),
                Some(serializer),
            ),
            CallShape::StreamUnary => RpcMethodHandler::stream_unary(
                behavior_fn(|reqs: Box<dyn Iterator<Item = String> + Send>, _| {
                    Ok(reqs.collect::<Vec<_>>().join(","))
                }),
                Some(deserializer),
                Some(serializer),
            ),
            CallShape::StreamStream => RpcMethodHandler::stream_stream(
                behavior_fn(|reqs, _| Ok(reqs)),
                Some(deserializer),
                Some(serializer),
            ),
        }
    }

    #[test]
    fn test_absent_handler_stays_absent() {
        let recorder = ShapeRecorder::default();
        let wrapped = wrap_rpc_behavior::<String, String, _>(None, &recorder);
        assert!(wrapped.is_none());
        assert!(recorder.shapes.lock().is_empty());
    }

    #[test]
    fn test_every_shape_keeps_shape_and_serializers() {
        for shape in [
            CallShape::UnaryUnary,
            CallShape::UnaryStream,
            CallShape::StreamUnary,
            CallShape::StreamStream,
        ] {
            let recorder = ShapeRecorder::default();
            let original = handler_of_shape(shape);
            let deserializer = Arc::clone(original.request_deserializer().unwrap());
            let serializer = Arc::clone(original.response_serializer().unwrap());

            let wrapped = wrap_rpc_behavior(Some(original), &recorder).unwrap();

            assert_eq!(wrapped.shape(), shape);
            assert_eq!(*recorder.shapes.lock(), vec![shape]);
            assert!(Arc::ptr_eq(wrapped.request_deserializer().unwrap(), &deserializer));
            assert!(Arc::ptr_eq(wrapped.response_serializer().unwrap(), &serializer));
        }
    }

    #[test]
    fn test_wrapping_does_not_invoke_behavior() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let handler: RpcMethodHandler<String, String> = RpcMethodHandler::unary_unary(
            behavior_fn(move |req, _| {
                *counter.lock() += 1;
                Ok(req)
            }),
            None,
            None,
        );

        let wrapped = wrap_rpc_behavior(Some(handler), &ShapeRecorder::default()).unwrap();
        assert_eq!(*calls.lock(), 0);

        let context = ServicerContext::new("/pkg.Svc/Echo");
        match wrapped.behavior() {
            Behavior::UnaryUnary(f) => {
                assert_eq!(f("hi".to_string(), &context).unwrap(), "hi");
            }
            _ => panic!("expected a unary-unary behavior"),
        }
        assert_eq!(*calls.lock(), 1);
        assert_eq!(context.details().as_deref(), Some("wrapped"));
    }
}
