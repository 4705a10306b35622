use common::{EmptyDatasetError, FinalResult, PartialAggregate};

/// Folds every bucket's partial into the global average.
///
/// Order of `partials` does not matter beyond floating-point rounding. With
/// no partials at all there is nothing to divide, which is reported instead
/// of returning `NaN`.
pub fn merge<'a, I>(partials: I) -> Result<FinalResult, EmptyDatasetError>
where
    I: IntoIterator<Item = &'a PartialAggregate>,
{
    let (sum, count) = partials
        .into_iter()
        .fold((0f64, 0u64), |(sum, count), p| (sum + p.sum(), count + p.count()));

    if count == 0 {
        return Err(EmptyDatasetError);
    }
    Ok(FinalResult::new(sum / count as f64))
}
