use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use thiserror::Error;

/// Possible errors from the [`super::fetcher`] module.
///
/// Any of these fails the whole fetch: no partial batch is ever returned.
#[derive(Error, Debug)]
pub enum LagFetchError {
    /// The configured Topic is not present in the Cluster metadata.
    #[error("Topic '{0}' not found")]
    TopicNotFound(String),

    /// The Cluster metadata carries an error for the configured Topic.
    #[error("Metadata of Topic '{0}' reports an error: {1}")]
    TopicMetadata(String, RDKafkaErrorCode),

    /// The Cluster metadata carries an error for a Partition of the configured Topic.
    #[error("Metadata of Partition '{0}:{1}' reports an error: {2}")]
    PartitionMetadata(String, i32, RDKafkaErrorCode),

    /// Fetching the watermark offsets of a Partition failed.
    #[error("Failed to fetch watermark offsets of Partition '{0}:{1}': {2}")]
    PartitionWatermarks(String, i32, KafkaError),

    /// Fetching the offsets committed by the Consumer Group failed.
    #[error("Failed to fetch offsets committed by Group '{0}': {1}")]
    CommittedOffsets(String, KafkaError),

    /// The committed offset of a Partition carries an error.
    #[error("Committed offset of Partition '{0}:{1}' reports an error: {2}")]
    PartitionCommittedOffset(String, i32, KafkaError),

    /// Any other failure of the underlying Kafka client.
    #[error(transparent)]
    Kafka(#[from] KafkaError),
}

pub type LagFetchResult<T> = Result<T, LagFetchError>;
