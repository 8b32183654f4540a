use std::collections::HashMap;

use chrono::Utc;
use rdkafka::{
    consumer::{BaseConsumer, Consumer},
    error::{KafkaResult, RDKafkaErrorCode},
    ClientConfig, Offset, TopicPartitionList,
};
use tokio::time::Duration;

use super::errors::{LagFetchError, LagFetchResult};
use super::sample::LagSample;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Stateless query of the Cluster for the current lag of a Consumer Group.
///
/// Each call to [`Self::fetch_lag`] is one synchronous round-trip:
/// Partition discovery, high watermark (end) offsets, committed offsets,
/// and the per-partition lag derived from the last two.
pub struct LagFetcher {
    consumer: BaseConsumer,
    topic: String,
    consumer_group: String,
}

impl LagFetcher {
    /// Create a new [`LagFetcher`].
    ///
    /// # Arguments
    ///
    /// * `client_config` - Kafka client configuration, used to query the Cluster;
    ///   its `group.id` must be set to the observed Consumer Group
    /// * `topic` - Topic to observe
    /// * `consumer_group` - Consumer Group whose committed offsets define the lag
    pub fn new(
        client_config: ClientConfig,
        topic: String,
        consumer_group: String,
    ) -> KafkaResult<Self> {
        Ok(Self {
            consumer: client_config.create()?,
            topic,
            consumer_group,
        })
    }

    /// Fetch the current lag of the Consumer Group: one [`LagSample`] per Partition.
    ///
    /// All returned samples carry the same `read_datetime`, taken once at the
    /// start of the call. Any failure fails the whole call.
    pub fn fetch_lag(&self) -> LagFetchResult<Vec<LagSample>> {
        let read_datetime = Utc::now();

        // Discover the Partitions of the Topic
        let metadata = self.consumer.fetch_metadata(Some(&self.topic), FETCH_TIMEOUT)?;
        let topic_metadata = metadata
            .topics()
            .iter()
            .find(|t| t.name() == self.topic)
            .ok_or_else(|| LagFetchError::TopicNotFound(self.topic.clone()))?;
        if let Some(e) = topic_metadata.error() {
            return Err(LagFetchError::TopicMetadata(
                self.topic.clone(),
                RDKafkaErrorCode::from(e),
            ));
        }

        let mut partitions = Vec::with_capacity(topic_metadata.partitions().len());
        for p in topic_metadata.partitions() {
            if let Some(e) = p.error() {
                return Err(LagFetchError::PartitionMetadata(
                    self.topic.clone(),
                    p.id(),
                    RDKafkaErrorCode::from(e),
                ));
            }
            partitions.push(p.id());
        }

        // Latest available (end) offset of every Partition
        let mut end_offsets: HashMap<i32, i64> = HashMap::with_capacity(partitions.len());
        for partition in &partitions {
            let (_, end_offset) = self
                .consumer
                .fetch_watermarks(&self.topic, *partition, FETCH_TIMEOUT)
                .map_err(|e| {
                    LagFetchError::PartitionWatermarks(self.topic.clone(), *partition, e)
                })?;
            end_offsets.insert(*partition, end_offset);
        }

        // Offsets committed by the Consumer Group for every Partition.
        // Locating the Group Coordinator to answer this is down to librdkafka.
        let mut tpl = TopicPartitionList::with_capacity(partitions.len());
        for partition in &partitions {
            tpl.add_partition(&self.topic, *partition);
        }
        let committed = self
            .consumer
            .committed_offsets(tpl, FETCH_TIMEOUT)
            .map_err(|e| LagFetchError::CommittedOffsets(self.consumer_group.clone(), e))?;

        let mut committed_offsets: HashMap<i32, i64> = HashMap::with_capacity(committed.count());
        for elem in committed.elements() {
            if let Err(e) = elem.error() {
                return Err(LagFetchError::PartitionCommittedOffset(
                    self.topic.clone(),
                    elem.partition(),
                    e,
                ));
            }

            // A Group that never committed an offset for a Partition reports a
            // negative sentinel: its lag is then the whole Partition content
            let committed_offset = match elem.offset() {
                Offset::Offset(o) if o >= 0 => o,
                _ => 0,
            };
            committed_offsets.insert(elem.partition(), committed_offset);
        }

        // Derive the lag, one sample per Partition, in Partition metadata order
        let samples = partitions
            .into_iter()
            .map(|partition| {
                let committed_offset = committed_offsets.get(&partition).copied().unwrap_or(0);
                let end_offset = end_offsets.get(&partition).copied().unwrap_or(0);

                LagSample::new(
                    read_datetime,
                    self.topic.clone(),
                    partition,
                    committed_offset,
                    end_offset,
                )
            })
            .collect();

        Ok(samples)
    }
}
