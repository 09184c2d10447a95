use dmt_abstraction::{DataAugmenter, LabeledExample};
use dmt_data::Fold;

/// Turns the train fold into labeled examples, in fold order.
///
/// When an augmenter is given, its synthetic examples are appended right
/// after the example they were derived from.
#[must_use]
pub fn prepare_batch(train: &Fold, augmenter: Option<&dyn DataAugmenter>) -> Vec<LabeledExample> {
    let mut batch = Vec::with_capacity(train.len());
    for example in train.examples() {
        let extra = augmenter.map(|a| a.augment(&example));
        batch.push(example);
        if let Some(extra) = extra {
            batch.extend(extra);
        }
    }
    batch
}
