use common::{BucketId, FanOut, NumericRecord};

pub trait Partitioner: Sync + Send {
    fn fan_out(&self) -> FanOut;

    /// Pick the bucket for one record. Safe to call from many workers at once.
    fn assign(&self, record: &NumericRecord) -> BucketId;

    /// Assign a bucket to each record. Results will be written into `output`,
    /// which must be at least as large as `records`.
    fn assign_vec(&self, records: &[NumericRecord], output: &mut [BucketId]) {
        for (record, out) in records.iter().zip(output.iter_mut()) {
            *out = self.assign(record);
        }
    }
}
