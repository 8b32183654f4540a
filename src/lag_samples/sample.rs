use chrono::{DateTime, Utc};

/// A single observation of the lag of a Consumer Group on one Partition.
///
/// Immutable once created. All the samples produced by one fetch share the
/// same `read_datetime`, so _when_ the lag was observed is also known.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct LagSample {
    /// [`DateTime<Utc>`] when this observation was read from the Cluster
    pub read_datetime: DateTime<Utc>,
    /// Topic of the Partition
    pub topic: String,
    /// Partition
    pub partition: i32,
    /// Difference between `end_offset` and `committed_offset`, clamped at zero
    pub lag: i64,
    /// Offset committed by the Consumer Group for this Partition
    pub committed_offset: i64,
    /// Latest offset available in this Partition (high watermark)
    pub end_offset: i64,
}

impl LagSample {
    /// Create a new [`LagSample`], deriving the lag from the given offsets.
    pub fn new(
        read_datetime: DateTime<Utc>,
        topic: String,
        partition: i32,
        committed_offset: i64,
        end_offset: i64,
    ) -> Self {
        Self {
            read_datetime,
            topic,
            partition,
            lag: (end_offset - committed_offset).max(0),
            committed_offset,
            end_offset,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lag_is_derived_from_offsets() {
        let s = LagSample::new(Utc::now(), "orders".to_string(), 0, 1200, 2000);
        assert_eq!(s.lag, 800);
    }

    #[test]
    fn lag_is_clamped_at_zero() {
        // A committed offset ahead of the end offset can transiently be
        // observed, as the two are read at slightly different times
        let s = LagSample::new(Utc::now(), "orders".to_string(), 3, 2010, 2000);
        assert_eq!(s.lag, 0);
    }
}
