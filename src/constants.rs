/// Name of the (single) metric this scaler reports to the autoscaling
/// orchestrator, both in `GetMetricSpec` and `GetMetrics` responses.
pub(crate) const PERSISTENT_LAG_METRIC: &str = "persistent_kafka_lag";

/// The default port to listen on when launching the gRPC server.
pub(crate) const DEFAULT_GRPC_PORT: &str = "50051"; //< `u16` after parsing

/// The default Kafka bootstrap brokers to connect to.
pub(crate) const DEFAULT_BOOTSTRAP_SERVERS: &str = "localhost:9092";

/// The default lag threshold (in offsets) at or above which a Partition
/// counts towards persistence.
pub(crate) const DEFAULT_LAG_THRESHOLD: i64 = 500;

/// The default duration (in seconds) the lag must be sustained for, before
/// it is reported as persistent.
pub(crate) const DEFAULT_SUSTAIN_SECONDS: i64 = 120;

/// The default interval (in seconds) between two lag samplings of the Cluster.
pub(crate) const DEFAULT_SAMPLING_INTERVAL_SECONDS: i64 = 10;

/// The default size of the sliding window, expressed as a multiple of the
/// sampling interval.
pub(crate) const DEFAULT_WINDOW_SIZE: i64 = 30;
