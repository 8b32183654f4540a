//! Bindings for the external scaler wire protocol.
//!
//! Maintained by hand against `proto/externalscaler.proto`, so that building
//! does not require `protoc`: message types are `prost` derives, and the
//! server glue follows the shape of `tonic`-generated code, trimmed to the
//! four operations the orchestrator calls.

use prost::Message;

/// Reference to the scaled object an orchestrator request is about.
///
/// The scaler serves a single Topic and Consumer Group, so this is not used
/// for dispatch; it is echoed in logs.
#[derive(Clone, PartialEq, Message)]
pub struct ScaledObjectRef {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub namespace: String,
    #[prost(map = "string, string", tag = "3")]
    pub scaler_metadata: std::collections::HashMap<String, String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct IsActiveResponse {
    #[prost(bool, tag = "1")]
    pub result: bool,
}

#[derive(Clone, PartialEq, Message)]
pub struct GetMetricSpecResponse {
    #[prost(message, repeated, tag = "1")]
    pub metric_specs: Vec<MetricSpec>,
}

#[derive(Clone, PartialEq, Message)]
pub struct MetricSpec {
    #[prost(string, tag = "1")]
    pub metric_name: String,
    #[prost(int64, tag = "2")]
    pub target_size: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct GetMetricsRequest {
    #[prost(message, optional, tag = "1")]
    pub scaled_object_ref: Option<ScaledObjectRef>,
    #[prost(string, tag = "2")]
    pub metric_name: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct GetMetricsResponse {
    #[prost(message, repeated, tag = "1")]
    pub metric_values: Vec<MetricValue>,
}

#[derive(Clone, PartialEq, Message)]
pub struct MetricValue {
    #[prost(string, tag = "1")]
    pub metric_name: String,
    #[prost(int64, tag = "2")]
    pub metric_value: i64,
}

/// Server implementation of the `externalscaler.ExternalScaler` service.
pub mod external_scaler_server {
    use const_format::concatcp;
    use tonic::codegen::*;

    use super::*;

    /// Full gRPC service name, as the orchestrator dials it.
    pub const SERVICE_NAME: &str = "externalscaler.ExternalScaler";

    const IS_ACTIVE_PATH: &str = concatcp!("/", SERVICE_NAME, "/IsActive");
    const STREAM_IS_ACTIVE_PATH: &str = concatcp!("/", SERVICE_NAME, "/StreamIsActive");
    const GET_METRIC_SPEC_PATH: &str = concatcp!("/", SERVICE_NAME, "/GetMetricSpec");
    const GET_METRICS_PATH: &str = concatcp!("/", SERVICE_NAME, "/GetMetrics");

    /// The four operations an orchestrator expects an external scaler to serve.
    #[async_trait]
    pub trait ExternalScaler: Send + Sync + 'static {
        async fn is_active(
            &self,
            request: tonic::Request<ScaledObjectRef>,
        ) -> Result<tonic::Response<IsActiveResponse>, tonic::Status>;

        /// Server streaming response type for the `StreamIsActive` method.
        type StreamIsActiveStream: tokio_stream::Stream<Item = Result<IsActiveResponse, tonic::Status>>
            + Send
            + 'static;

        async fn stream_is_active(
            &self,
            request: tonic::Request<ScaledObjectRef>,
        ) -> Result<tonic::Response<Self::StreamIsActiveStream>, tonic::Status>;

        async fn get_metric_spec(
            &self,
            request: tonic::Request<ScaledObjectRef>,
        ) -> Result<tonic::Response<GetMetricSpecResponse>, tonic::Status>;

        async fn get_metrics(
            &self,
            request: tonic::Request<GetMetricsRequest>,
        ) -> Result<tonic::Response<GetMetricsResponse>, tonic::Status>;
    }

    #[derive(Debug)]
    pub struct ExternalScalerServer<T: ExternalScaler> {
        inner: Arc<T>,
    }

    impl<T: ExternalScaler> ExternalScalerServer<T> {
        pub fn new(inner: T) -> Self {
            Self::from_arc(Arc::new(inner))
        }

        pub fn from_arc(inner: Arc<T>) -> Self {
            Self { inner }
        }
    }

    impl<T: ExternalScaler> Clone for ExternalScalerServer<T> {
        fn clone(&self) -> Self {
            Self {
                inner: Arc::clone(&self.inner),
            }
        }
    }

    impl<T, B> Service<http::Request<B>> for ExternalScalerServer<T>
    where
        T: ExternalScaler,
        B: Body + Send + 'static,
        B::Error: Into<StdError> + Send + 'static,
    {
        type Response = http::Response<tonic::body::BoxBody>;
        type Error = std::convert::Infallible;
        type Future = BoxFuture<Self::Response, Self::Error>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: http::Request<B>) -> Self::Future {
            match req.uri().path() {
                IS_ACTIVE_PATH => {
                    struct IsActiveSvc<T: ExternalScaler>(Arc<T>);
                    impl<T: ExternalScaler> tonic::server::UnaryService<ScaledObjectRef> for IsActiveSvc<T> {
                        type Response = IsActiveResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;

                        fn call(&mut self, request: tonic::Request<ScaledObjectRef>) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            Box::pin(async move { inner.is_active(request).await })
                        }
                    }

                    let inner = Arc::clone(&self.inner);
                    Box::pin(async move {
                        let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                        Ok(grpc.unary(IsActiveSvc(inner), req).await)
                    })
                },
                STREAM_IS_ACTIVE_PATH => {
                    struct StreamIsActiveSvc<T: ExternalScaler>(Arc<T>);
                    impl<T: ExternalScaler> tonic::server::ServerStreamingService<ScaledObjectRef>
                        for StreamIsActiveSvc<T>
                    {
                        type Response = IsActiveResponse;
                        type ResponseStream = T::StreamIsActiveStream;
                        type Future = BoxFuture<tonic::Response<Self::ResponseStream>, tonic::Status>;

                        fn call(&mut self, request: tonic::Request<ScaledObjectRef>) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            Box::pin(async move { inner.stream_is_active(request).await })
                        }
                    }

                    let inner = Arc::clone(&self.inner);
                    Box::pin(async move {
                        let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                        Ok(grpc.server_streaming(StreamIsActiveSvc(inner), req).await)
                    })
                },
                GET_METRIC_SPEC_PATH => {
                    struct GetMetricSpecSvc<T: ExternalScaler>(Arc<T>);
                    impl<T: ExternalScaler> tonic::server::UnaryService<ScaledObjectRef> for GetMetricSpecSvc<T> {
                        type Response = GetMetricSpecResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;

                        fn call(&mut self, request: tonic::Request<ScaledObjectRef>) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            Box::pin(async move { inner.get_metric_spec(request).await })
                        }
                    }

                    let inner = Arc::clone(&self.inner);
                    Box::pin(async move {
                        let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                        Ok(grpc.unary(GetMetricSpecSvc(inner), req).await)
                    })
                },
                GET_METRICS_PATH => {
                    struct GetMetricsSvc<T: ExternalScaler>(Arc<T>);
                    impl<T: ExternalScaler> tonic::server::UnaryService<GetMetricsRequest> for GetMetricsSvc<T> {
                        type Response = GetMetricsResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;

                        fn call(&mut self, request: tonic::Request<GetMetricsRequest>) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            Box::pin(async move { inner.get_metrics(request).await })
                        }
                    }

                    let inner = Arc::clone(&self.inner);
                    Box::pin(async move {
                        let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                        Ok(grpc.unary(GetMetricsSvc(inner), req).await)
                    })
                },
                _ => Box::pin(async move {
                    Ok(http::Response::builder()
                        .status(200)
                        .header("grpc-status", "12")
                        .header("content-type", "application/grpc")
                        .body(empty_body())
                        .unwrap())
                }),
            }
        }
    }

    impl<T: ExternalScaler> tonic::server::NamedService for ExternalScalerServer<T> {
        const NAME: &'static str = SERVICE_NAME;
    }
}
